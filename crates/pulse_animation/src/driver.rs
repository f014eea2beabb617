//! Animation driver
//!
//! [`Animator::start`] turns an [`AnimationSpec`] into a playback loop: an
//! independent tokio task that advances once per presented frame, resamples
//! the spec's [`Signal`] at the current progress and hands the shaped value
//! to the spec's interpolation callback.
//!
//! # Playback
//!
//! 1. `on_start` runs once, on the playback task.
//! 2. Each frame computes `progress = elapsed / duration` (clamped to 0..=1),
//!    where elapsed is measured from the first frame the loop observed.
//! 3. `on_interp` receives `signal.sample(progress)`.
//! 4. When progress reaches 1 a one-shot animation runs `on_end` and exits;
//!    a looping animation restarts its cycle from the current frame.
//!
//! Cancellation through the returned [`PlaybackHandle`] is checked before
//! every tick. A cancelled animation never runs `on_end` and leaves its
//! properties wherever the last tick put them.
//!
//! # Example
//!
//! ```ignore
//! use pulse_animation::{AnimationSpec, Animator, FrameClock, Signal};
//! use std::time::Duration;
//!
//! let clock = FrameClock::new();
//! let animator = Animator::current(clock.clone())?;
//!
//! let handle = animator.start(
//!     AnimationSpec::new(Signal::exp(256), Duration::from_millis(300))
//!         .on_start(|| tracing::info!("fade in"))
//!         .on_interp(move |dt| opacity.set(dt)),
//! )?;
//!
//! // Host render loop
//! clock.tick();
//!
//! // Layout changed; stop touching the widget
//! handle.cancel();
//! ```

use crate::error::{AnimationError, Result};
use crate::frame::{FrameClock, FrameReceiver};
use crate::property::Tween;
use crate::signal::Signal;
use crate::values::Interpolate;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Callback run at most once (`on_start`, `on_end`)
pub type OnceCallback = Box<dyn FnOnce() + Send + 'static>;

/// Callback run once per tick with the shaped value
pub type InterpCallback = Box<dyn FnMut(f32) + Send + 'static>;

/// Description of one animation
///
/// Consumed by [`Animator::start`]; the callbacks move into the playback
/// loop and are dropped when it exits.
pub struct AnimationSpec {
    signal: Signal,
    duration: Duration,
    looping: bool,
    on_start: Option<OnceCallback>,
    on_interp: Option<InterpCallback>,
    on_end: Option<OnceCallback>,
}

impl AnimationSpec {
    /// A one-shot animation shaped by `signal` over `duration`
    pub fn new(signal: Signal, duration: Duration) -> Self {
        Self {
            signal,
            duration,
            looping: false,
            on_start: None,
            on_interp: None,
            on_end: None,
        }
    }

    /// Restart indefinitely instead of ending
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Run once on the playback task before the first tick
    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Run every tick with the shaped value
    ///
    /// Replaces any interpolation callback installed earlier, including
    /// ones installed by [`tween`](Self::tween).
    pub fn on_interp<F>(mut self, f: F) -> Self
    where
        F: FnMut(f32) + Send + 'static,
    {
        self.on_interp = Some(Box::new(f));
        self
    }

    /// Run once when a one-shot animation completes naturally
    ///
    /// Replaces any end callback installed earlier, including ones
    /// installed by [`tween`](Self::tween).
    pub fn on_end<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_end = Some(Box::new(f));
        self
    }

    /// Drive a property with this animation
    ///
    /// Each tick applies the tween after any interpolation callback already
    /// installed; natural completion snaps the property to the tween's
    /// target. Several tweens can be chained to animate several properties
    /// in lockstep.
    pub fn tween<T>(mut self, tween: Tween<T>) -> Self
    where
        T: Interpolate + Send + 'static,
    {
        let finisher = tween.clone();

        let mut previous_interp = self.on_interp.take();
        self.on_interp = Some(Box::new(move |dt| {
            if let Some(previous) = previous_interp.as_mut() {
                previous(dt);
            }
            tween.apply(dt);
        }));

        let previous_end = self.on_end.take();
        self.on_end = Some(Box::new(move || {
            if let Some(previous) = previous_end {
                previous();
            }
            finisher.finish();
        }));

        self
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    fn validate(&self) -> Result<()> {
        if self.duration.is_zero() {
            return Err(AnimationError::InvalidSpec(
                "duration must be positive".to_string(),
            ));
        }
        if self.signal.is_empty() {
            return Err(AnimationError::InvalidSpec(
                "signal must contain at least one sample".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for AnimationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationSpec")
            .field("samples", &self.signal.len())
            .field("duration", &self.duration)
            .field("looping", &self.looping)
            .field("on_start", &self.on_start.is_some())
            .field("on_interp", &self.on_interp.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

/// Process-unique playback identifier, used for logging
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackId(u64);

impl PlaybackId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        PlaybackId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a playback loop exited
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Reached the end of a one-shot animation; `on_end` ran
    Completed,
    /// Stopped by cancellation or because the frame clock shut down
    Cancelled,
}

/// State shared between a handle and its playback loop
struct PlaybackShared {
    cancelled: AtomicBool,
    active: AtomicBool,
    panicked: AtomicBool,
    wake: Notify,
}

impl PlaybackShared {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            active: AtomicBool::new(true),
            panicked: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Marks the playback inactive however the loop exits, unwinding included
struct ActiveGuard(Arc<PlaybackShared>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.panicked.store(true, Ordering::Release);
        }
        self.0.active.store(false, Ordering::Release);
    }
}

/// Caller-held token for one playback loop
///
/// Dropping the handle does not stop the animation; call
/// [`cancel`](Self::cancel) for that.
pub struct PlaybackHandle {
    id: PlaybackId,
    shared: Arc<PlaybackShared>,
    task: Option<JoinHandle<PlaybackOutcome>>,
    outcome: Option<PlaybackOutcome>,
}

impl PlaybackHandle {
    pub fn id(&self) -> PlaybackId {
        self.id
    }

    /// Request that the playback loop stop before its next tick
    ///
    /// Never blocks and never fails. A tick already in progress may still
    /// complete, but no further ticks run and `on_end` is skipped. Calling
    /// this again, or after the animation has finished, does nothing.
    pub fn cancel(&self) {
        if self.shared.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.is_active() {
            tracing::debug!("Playback {}: cancel requested", self.id);
        }
        // Stores a permit if the loop is not waiting yet
        self.shared.wake.notify_one();
    }

    /// Whether [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Whether the playback loop is still running
    ///
    /// Becomes `false` once the loop has observed cancellation or completed.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Whether the playback loop exited because a callback panicked
    pub fn is_panicked(&self) -> bool {
        self.shared.panicked.load(Ordering::Acquire)
    }

    /// Wait for the playback loop to exit
    ///
    /// # Panics
    ///
    /// Re-raises a panic from one of the animation's callbacks.
    pub async fn finished(&mut self) -> PlaybackOutcome {
        if let Some(task) = self.task.take() {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                // Aborted by runtime shutdown
                Err(_) => PlaybackOutcome::Cancelled,
            };
            self.outcome = Some(outcome);
        }
        self.outcome.unwrap_or(PlaybackOutcome::Cancelled)
    }
}

impl fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Starts playback loops on a tokio runtime, paced by a [`FrameClock`]
#[derive(Clone)]
pub struct Animator {
    clock: FrameClock,
    runtime: Handle,
}

impl Animator {
    pub fn new(clock: FrameClock, runtime: Handle) -> Self {
        Self { clock, runtime }
    }

    /// Create an animator on the runtime the caller is running in
    pub fn current(clock: FrameClock) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| AnimationError::NoRuntime)?;
        Ok(Self::new(clock, runtime))
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Start playing `spec`
    ///
    /// Returns immediately; playback runs on its own task and observes every
    /// frame presented after this call returns.
    ///
    /// # Errors
    ///
    /// [`AnimationError::InvalidSpec`] if the duration is zero or the signal
    /// is empty. Nothing is spawned in that case.
    pub fn start(&self, spec: AnimationSpec) -> Result<PlaybackHandle> {
        spec.validate()?;

        let id = PlaybackId::next();
        let shared = Arc::new(PlaybackShared::new());
        let frames = self.clock.subscribe();

        tracing::debug!(
            "Playback {}: starting ({:?}, {} samples, looping={})",
            id,
            spec.duration,
            spec.signal.len(),
            spec.looping
        );

        let task = self
            .runtime
            .spawn(run_playback(id, spec, frames, Arc::clone(&shared)));

        Ok(PlaybackHandle {
            id,
            shared,
            task: Some(task),
            outcome: None,
        })
    }
}

impl fmt::Debug for Animator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animator")
            .field("subscribers", &self.clock.subscriber_count())
            .finish()
    }
}

enum Wake {
    Frame(Duration),
    Cancelled,
    ClockClosed,
}

async fn run_playback(
    id: PlaybackId,
    spec: AnimationSpec,
    mut frames: FrameReceiver,
    shared: Arc<PlaybackShared>,
) -> PlaybackOutcome {
    let _active = ActiveGuard(Arc::clone(&shared));

    let AnimationSpec {
        signal,
        duration,
        looping,
        on_start,
        mut on_interp,
        mut on_end,
    } = spec;

    if shared.is_cancelled() {
        tracing::debug!("Playback {}: cancelled before start", id);
        return PlaybackOutcome::Cancelled;
    }

    if let Some(on_start) = on_start {
        on_start();
    }

    let duration_nanos = duration.as_nanos() as f64;
    let mut origin: Option<Duration> = None;
    // Elapsed time never runs backwards within a cycle
    let mut last_elapsed = Duration::ZERO;
    let mut cycles: u64 = 0;

    loop {
        let wake = tokio::select! {
            biased;
            _ = shared.wake.notified() => Wake::Cancelled,
            frame = frames.next() => match frame {
                Some(frame) => Wake::Frame(frame.time),
                None => Wake::ClockClosed,
            },
        };

        let now = match wake {
            Wake::Frame(_) | Wake::Cancelled if shared.is_cancelled() => {
                tracing::debug!("Playback {}: cancelled after {} cycles", id, cycles);
                return PlaybackOutcome::Cancelled;
            }
            Wake::Frame(now) => now,
            // Spurious wake without a cancel request
            Wake::Cancelled => continue,
            Wake::ClockClosed => {
                tracing::debug!("Playback {}: frame clock shut down", id);
                return PlaybackOutcome::Cancelled;
            }
        };

        let start = *origin.get_or_insert(now);
        let elapsed = now.saturating_sub(start).max(last_elapsed);
        last_elapsed = elapsed;
        let progress = (elapsed.as_nanos() as f64 / duration_nanos).clamp(0.0, 1.0) as f32;

        let dt = signal.sample(progress);
        if let Some(on_interp) = on_interp.as_mut() {
            on_interp(dt);
        }

        if progress < 1.0 {
            continue;
        }

        if looping {
            cycles += 1;
            tracing::trace!("Playback {}: cycle {} complete", id, cycles);
            origin = Some(now);
            last_elapsed = Duration::ZERO;
            continue;
        }

        if let Some(on_end) = on_end.take() {
            on_end();
        }
        tracing::debug!("Playback {}: completed", id);
        return PlaybackOutcome::Completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_zero_duration() {
        let spec = AnimationSpec::new(Signal::linear(4), Duration::ZERO);
        assert!(matches!(
            spec.validate(),
            Err(AnimationError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_signal() {
        let spec = AnimationSpec::new(Signal::new(Vec::new()), Duration::from_millis(10));
        assert!(matches!(
            spec.validate(),
            Err(AnimationError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_single_sample_signal_is_valid() {
        let spec = AnimationSpec::new(Signal::new(vec![0.5]), Duration::from_millis(10));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_playback_ids_are_unique() {
        let a = PlaybackId::next();
        let b = PlaybackId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_spec_debug_lists_callbacks() {
        let spec = AnimationSpec::new(Signal::linear(2), Duration::from_millis(10))
            .looping(true)
            .on_interp(|_| {});
        let debug = format!("{:?}", spec);
        assert!(debug.contains("looping: true"));
        assert!(debug.contains("on_interp: true"));
        assert!(debug.contains("on_end: false"));
    }

    #[test]
    fn test_start_outside_runtime_is_an_error() {
        assert_eq!(
            Animator::current(FrameClock::new()).unwrap_err(),
            AnimationError::NoRuntime
        );
    }

    #[tokio::test]
    async fn test_invalid_spec_spawns_nothing() {
        let clock = FrameClock::new();
        let animator = Animator::current(clock.clone()).unwrap();

        let err = animator
            .start(AnimationSpec::new(Signal::linear(3), Duration::ZERO))
            .unwrap_err();

        assert!(matches!(err, AnimationError::InvalidSpec(_)));
        assert_eq!(clock.subscriber_count(), 0);
    }
}
