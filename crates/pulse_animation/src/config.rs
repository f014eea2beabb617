//! Driver configuration

use std::time::Duration;

/// Configuration for the frame clock and pacer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverConfig {
    /// Frames buffered per playback loop before a slow loop starts
    /// skipping frames
    pub frame_buffer: usize,
    /// Frame rate used by [`FramePacer`](crate::frame::FramePacer) when the
    /// host has no presentation callback of its own
    pub target_fps: u32,
}

impl DriverConfig {
    /// Create a new driver configuration
    pub fn new(frame_buffer: usize, target_fps: u32) -> Self {
        Self {
            frame_buffer,
            target_fps,
        }
    }

    /// High refresh rate displays
    pub fn smooth() -> Self {
        Self {
            frame_buffer: 128,
            target_fps: 120,
        }
    }

    /// Reduced frame rate for low-power hosts
    pub fn battery() -> Self {
        Self {
            frame_buffer: 32,
            target_fps: 30,
        }
    }

    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps;
        self
    }

    pub fn with_frame_buffer(mut self, frames: usize) -> Self {
        self.frame_buffer = frames;
        self
    }

    /// Time between frames at the target frame rate
    ///
    /// Never shorter than one microsecond.
    pub fn frame_interval(&self) -> Duration {
        let micros = 1_000_000 / u64::from(self.target_fps.max(1));
        Duration::from_micros(micros.max(1))
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frame_buffer: 64,
            target_fps: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval() {
        assert_eq!(
            DriverConfig::smooth().frame_interval(),
            Duration::from_micros(8_333)
        );
        assert_eq!(
            DriverConfig::default().with_target_fps(0).frame_interval(),
            Duration::from_secs(1)
        );
        assert_eq!(
            DriverConfig::default()
                .with_target_fps(2_000_000)
                .frame_interval(),
            Duration::from_micros(1)
        );
    }
}
