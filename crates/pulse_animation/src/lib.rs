//! Pulse Animation Driver
//!
//! Signal-shaped, frame-locked property animation.
//!
//! # Features
//!
//! - **Signals**: immutable sampled envelopes, resampled with linear
//!   interpolation so playback stays smooth at any frame rate
//! - **Frame-locked playback**: animations advance only when the host
//!   presents a frame through the [`FrameClock`]
//! - **Independent playback loops**: every animation runs on its own tokio
//!   task; starting one never blocks the caller
//! - **Cancellation**: fire-and-forget, idempotent, observed before the next
//!   tick
//! - **Explicit targets**: [`Property`] cells and [`Tween`]s describe exactly
//!   which values an animation writes
//! - **AnimationContext**: registry, clock and shared signals with a clear
//!   teardown boundary

pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod frame;
pub mod property;
pub mod registry;
pub mod signal;
pub mod values;

pub use config::DriverConfig;
pub use context::AnimationContext;
pub use driver::{
    AnimationSpec, Animator, InterpCallback, OnceCallback, PlaybackHandle, PlaybackId,
    PlaybackOutcome,
};
pub use error::{AnimationError, Result};
pub use frame::{Frame, FrameClock, FramePacer, FrameReceiver};
pub use property::{Property, Tween, TweenMode};
pub use registry::{AnimationId, AnimationRegistry};
pub use signal::{Signal, SignalBuilder};
pub use values::{Color, Interpolate, Vec2};
