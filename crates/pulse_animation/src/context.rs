//! Application-level animation context
//!
//! [`AnimationContext`] bundles everything an application needs to run
//! animations: the frame clock the host ticks, the animator that starts
//! playback loops, the registry of in-flight handles, and a table of named
//! signals shared by every animation. It has an explicit lifetime: build it
//! when the host surface becomes visible, call
//! [`shutdown`](AnimationContext::shutdown) (or drop it) when the surface
//! goes away.
//!
//! ```ignore
//! let mut ctx = AnimationContext::new_current(DriverConfig::default())?;
//! ctx.register_signal("ease", Signal::exp(256));
//!
//! // Touch handler
//! ctx.animate(AnimationSpec::new(ctx.signal("ease").unwrap(), ms(200)).tween(tween))?;
//!
//! // Size event: widgets are about to move
//! ctx.layout_changed();
//!
//! // Paint event
//! ctx.present_frame();
//! ```

use crate::config::DriverConfig;
use crate::driver::{AnimationSpec, Animator};
use crate::error::{AnimationError, Result};
use crate::frame::{Frame, FrameClock, FramePacer};
use crate::registry::{AnimationId, AnimationRegistry};
use crate::signal::Signal;
use rustc_hash::FxHashMap;
use std::time::Duration;
use tokio::runtime::Handle;

/// Owns the animation state of one application surface
pub struct AnimationContext {
    config: DriverConfig,
    clock: FrameClock,
    animator: Animator,
    registry: AnimationRegistry,
    signals: FxHashMap<String, Signal>,
    pacer: Option<FramePacer>,
    shut_down: bool,
}

impl AnimationContext {
    pub fn new(config: DriverConfig, runtime: Handle) -> Self {
        let clock = FrameClock::with_config(&config);
        let animator = Animator::new(clock.clone(), runtime);
        Self {
            config,
            clock,
            animator,
            registry: AnimationRegistry::new(),
            signals: FxHashMap::default(),
            pacer: None,
            shut_down: false,
        }
    }

    /// Create a context on the runtime the caller is running in
    pub fn new_current(config: DriverConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| AnimationError::NoRuntime)?;
        Ok(Self::new(config, runtime))
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn registry(&self) -> &AnimationRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AnimationRegistry {
        &mut self.registry
    }

    // =========================================================================
    // Signals
    // =========================================================================

    /// Store a signal under `name`, returning the one it replaced
    pub fn register_signal(&mut self, name: impl Into<String>, signal: Signal) -> Option<Signal> {
        self.signals.insert(name.into(), signal)
    }

    /// Shared copy of a named signal
    pub fn signal(&self, name: &str) -> Option<Signal> {
        self.signals.get(name).cloned()
    }

    // =========================================================================
    // Animations
    // =========================================================================

    /// Start an animation and track its handle
    ///
    /// # Errors
    ///
    /// [`AnimationError::ShutDown`] once [`shutdown`](Self::shutdown) has
    /// run; no playback task is spawned and no callback fires.
    pub fn animate(&mut self, spec: AnimationSpec) -> Result<AnimationId> {
        if self.shut_down {
            return Err(AnimationError::ShutDown);
        }
        let handle = self.animator.start(spec)?;
        Ok(self.registry.insert(handle))
    }

    /// Cancel a tracked animation
    pub fn cancel(&mut self, id: AnimationId) -> bool {
        self.registry.cancel(id)
    }

    /// Cancel every in-flight animation
    ///
    /// Call at the start of every layout pass so that no animation keeps
    /// writing to a widget layout is about to reposition.
    pub fn layout_changed(&mut self) -> usize {
        self.registry.cancel_all()
    }

    /// Number of animations still playing
    pub fn active_animations(&self) -> usize {
        self.registry.active_count()
    }

    // =========================================================================
    // Frames
    // =========================================================================

    /// Present a frame stamped with the clock's own time
    pub fn present_frame(&self) -> Frame {
        self.clock.tick()
    }

    /// Present a frame with the host's presentation timestamp
    pub fn present_frame_at(&self, time: Duration) -> Frame {
        self.clock.tick_at(time)
    }

    /// Tick the clock from a background pacer at the configured frame rate
    ///
    /// For hosts that have no presentation callback to drive
    /// [`present_frame`](Self::present_frame) from.
    pub fn start_pacer(&mut self, runtime: &Handle) {
        if self.pacer.is_some() {
            return;
        }
        self.pacer = Some(FramePacer::start(self.clock.clone(), &self.config, runtime));
    }

    pub fn stop_pacer(&mut self) {
        if let Some(pacer) = self.pacer.take() {
            pacer.stop();
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Cancel all animations and stop the frame clock
    ///
    /// Safe to call more than once; also runs on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        let cancelled = self.registry.cancel_all();
        self.stop_pacer();
        self.clock.shutdown();
        tracing::debug!(
            "AnimationContext: shut down ({} animations cancelled)",
            cancelled
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Drop for AnimationContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{Property, Tween};

    #[tokio::test]
    async fn test_named_signals_are_shared() {
        let mut ctx = AnimationContext::new_current(DriverConfig::default()).unwrap();
        assert!(ctx.register_signal("ease", Signal::exp(16)).is_none());
        assert!(ctx.register_signal("ease", Signal::exp(32)).is_some());

        let a = ctx.signal("ease").unwrap();
        let b = ctx.signal("ease").unwrap();
        assert_eq!(a.len(), 32);
        assert!(std::ptr::eq(a.as_slice(), b.as_slice()));
        assert!(ctx.signal("missing").is_none());
    }

    #[tokio::test]
    async fn test_layout_changed_cancels_everything() {
        let mut ctx = AnimationContext::new_current(DriverConfig::default()).unwrap();
        let y = Property::new(0.0_f32);

        for target in [10.0, 20.0, 30.0] {
            ctx.animate(
                AnimationSpec::new(Signal::linear(4), Duration::from_millis(100))
                    .tween(Tween::approach(y.clone(), target)),
            )
            .unwrap();
        }

        assert_eq!(ctx.layout_changed(), 3);
        assert!(ctx.registry().is_empty());

        ctx.present_frame_at(Duration::ZERO);
        ctx.present_frame_at(Duration::from_millis(100));
        tokio::task::yield_now().await;

        // Cancelled before any frame: nothing was written
        assert_eq!(y.get(), 0.0);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let mut ctx = AnimationContext::new_current(DriverConfig::default()).unwrap();
        ctx.animate(
            AnimationSpec::new(Signal::linear(4), Duration::from_millis(100)).looping(true),
        )
        .unwrap();

        ctx.shutdown();
        assert!(ctx.is_shut_down());
        assert!(ctx.clock().is_shut_down());
        assert!(ctx.registry().is_empty());

        ctx.shutdown();
    }

    #[tokio::test]
    async fn test_animate_after_shutdown_is_rejected() {
        let mut ctx = AnimationContext::new_current(DriverConfig::default()).unwrap();
        ctx.shutdown();

        let started = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = started.clone();
        let result = ctx.animate(
            AnimationSpec::new(Signal::linear(4), Duration::from_millis(100))
                .on_start(move || flag.store(true, std::sync::atomic::Ordering::SeqCst)),
        );

        assert_eq!(result, Err(AnimationError::ShutDown));
        tokio::task::yield_now().await;
        assert!(!started.load(std::sync::atomic::Ordering::SeqCst));
        assert!(ctx.registry().is_empty());
    }

    #[test]
    fn test_new_current_outside_runtime() {
        assert!(matches!(
            AnimationContext::new_current(DriverConfig::default()),
            Err(AnimationError::NoRuntime)
        ));
    }
}
