//! Error types for pulse_animation

use thiserror::Error;

/// Errors that can occur when starting an animation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    /// The animation spec violates a start constraint
    /// (zero duration or an empty signal)
    #[error("Invalid animation spec: {0}")]
    InvalidSpec(String),

    /// No tokio runtime is available to spawn playback loops on
    #[error("No tokio runtime available to drive animations")]
    NoRuntime,

    /// The animation context has been shut down
    #[error("Animation context has been shut down")]
    ShutDown,
}

/// Result type for pulse_animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
