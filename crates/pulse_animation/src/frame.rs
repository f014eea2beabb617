//! Frame clock
//!
//! The host presents frames; playback loops advance only when a frame is
//! presented. [`FrameClock`] is the seam between the two: the host calls
//! [`FrameClock::tick`] (or [`FrameClock::tick_at`] with its own presentation
//! timestamp) once per frame, and every subscribed playback loop receives the
//! [`Frame`] through a broadcast channel.
//!
//! Hosts without a presentation callback can run a [`FramePacer`], which
//! ticks the clock at a fixed rate on a background task.

use crate::config::DriverConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A presented frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Monotonic frame counter, starting at 0
    pub index: u64,
    /// Presentation time relative to the clock's origin
    pub time: Duration,
}

struct ClockInner {
    /// `None` once the clock has been shut down
    sender: Mutex<Option<broadcast::Sender<Frame>>>,
    origin: Instant,
    next_index: AtomicU64,
    capacity: usize,
}

/// Broadcasts presented frames to playback loops
///
/// Cloning yields another handle to the same clock.
#[derive(Clone)]
pub struct FrameClock {
    inner: Arc<ClockInner>,
}

impl FrameClock {
    /// Create a clock with the default frame buffer
    pub fn new() -> Self {
        Self::with_config(&DriverConfig::default())
    }

    pub fn with_config(config: &DriverConfig) -> Self {
        let capacity = config.frame_buffer.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(ClockInner {
                sender: Mutex::new(Some(sender)),
                origin: Instant::now(),
                next_index: AtomicU64::new(0),
                capacity,
            }),
        }
    }

    /// Present a frame stamped with the time elapsed since the clock was
    /// created
    pub fn tick(&self) -> Frame {
        self.tick_at(self.inner.origin.elapsed())
    }

    /// Present a frame with an explicit presentation time
    ///
    /// Times are relative to the clock's origin. Hosts that receive
    /// presentation timestamps from the display pipeline should pass them
    /// through here.
    pub fn tick_at(&self, time: Duration) -> Frame {
        let frame = Frame {
            index: self.inner.next_index.fetch_add(1, Ordering::Relaxed),
            time,
        };

        let sender = self.inner.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = sender.as_ref() {
            // An error only means nobody is listening right now
            let receivers = sender.send(frame).unwrap_or(0);
            tracing::trace!(
                "FrameClock: frame {} at {:?} -> {} receivers",
                frame.index,
                frame.time,
                receivers
            );
        }
        frame
    }

    /// Subscribe to frames presented from now on
    ///
    /// After [`shutdown`](Self::shutdown) the returned receiver is already
    /// closed.
    pub fn subscribe(&self) -> FrameReceiver {
        let sender = self.inner.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let receiver = match sender.as_ref() {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        };
        FrameReceiver { receiver }
    }

    /// Number of live frame receivers
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Frames buffered per receiver
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Stop presenting frames
    ///
    /// Every receiver observes the end of the stream once it has drained the
    /// frames already buffered. Further ticks are dropped.
    pub fn shutdown(&self) {
        let sender = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            tracing::debug!("FrameClock: shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of a [`FrameClock`] subscription
pub struct FrameReceiver {
    receiver: broadcast::Receiver<Frame>,
}

impl FrameReceiver {
    /// Wait for the next frame
    ///
    /// Returns `None` once the clock has shut down and the buffered frames
    /// are drained. If the receiver fell behind and frames were overwritten,
    /// delivery resumes from the oldest frame still buffered.
    pub async fn next(&mut self) -> Option<Frame> {
        loop {
            match self.receiver.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("FrameReceiver: lagged, skipped {} frames", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Ticks a [`FrameClock`] at a fixed rate on a background task
///
/// The pacer stops when [`stop`](Self::stop) is called or it is dropped.
pub struct FramePacer {
    task: JoinHandle<()>,
}

impl FramePacer {
    /// Start pacing `clock` at `config.target_fps` on `runtime`
    pub fn start(clock: FrameClock, config: &DriverConfig, runtime: &Handle) -> Self {
        let interval = config.frame_interval();
        tracing::debug!("FramePacer: starting at {:?} per frame", interval);

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            while !clock.is_shut_down() {
                ticker.tick().await;
                clock.tick();
            }
        });

        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop ticking
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for FramePacer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_frames_in_order() {
        let clock = FrameClock::new();
        let mut rx = clock.subscribe();

        clock.tick_at(Duration::from_millis(0));
        clock.tick_at(Duration::from_millis(16));

        let first = rx.next().await.unwrap();
        let second = rx.next().await.unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        assert_eq!(second.time, Duration::from_millis(16));
    }

    #[tokio::test]
    async fn test_frames_before_subscribe_are_not_seen() {
        let clock = FrameClock::new();
        clock.tick_at(Duration::from_millis(0));

        let mut rx = clock.subscribe();
        clock.tick_at(Duration::from_millis(16));

        assert_eq!(rx.next().await.unwrap().index, 1);
    }

    #[tokio::test]
    async fn test_lagged_receiver_resumes() {
        let clock = FrameClock::with_config(&DriverConfig::default().with_frame_buffer(2));
        let mut rx = clock.subscribe();

        for i in 0..5 {
            clock.tick_at(Duration::from_millis(i * 16));
        }

        // Frames 0..3 were overwritten; the oldest retained frame is 3
        assert_eq!(rx.next().await.unwrap().index, 3);
        assert_eq!(rx.next().await.unwrap().index, 4);
    }

    #[tokio::test]
    async fn test_shutdown_closes_receivers() {
        let clock = FrameClock::new();
        let mut rx = clock.subscribe();
        assert_eq!(clock.subscriber_count(), 1);

        clock.tick_at(Duration::ZERO);
        clock.shutdown();

        assert!(clock.is_shut_down());
        assert!(rx.next().await.is_some());
        assert!(rx.next().await.is_none());
        assert!(clock.subscribe().next().await.is_none());
        assert_eq!(clock.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_pacer_ticks_clock() {
        let clock = FrameClock::new();
        let mut rx = clock.subscribe();
        let config = DriverConfig::default().with_target_fps(240);

        let pacer = FramePacer::start(clock.clone(), &config, &Handle::current());
        assert!(rx.next().await.is_some());
        assert!(rx.next().await.is_some());

        pacer.stop();
    }

    #[tokio::test]
    async fn test_pacer_survives_extreme_frame_rate() {
        let clock = FrameClock::new();
        let mut rx = clock.subscribe();
        let config = DriverConfig::default().with_target_fps(2_000_000);

        let pacer = FramePacer::start(clock.clone(), &config, &Handle::current());
        let frame = tokio::time::timeout(Duration::from_secs(1), rx.next()).await;
        assert!(matches!(frame, Ok(Some(_))));
        assert!(pacer.is_running());

        pacer.stop();
    }
}
