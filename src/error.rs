//! Error types for the gesture control library.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[cfg(feature = "camera")]
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[cfg(feature = "camera")]
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model loading or inference error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Roll filter construction error
    #[error("Filter error: {0}")]
    FilterError(String),

    /// Pose provider could not be acquired or failed to deliver a frame
    #[error("Pose provider error: {0}")]
    PoseProvider(String),

    /// Presentation target could not be acquired or rejected a command
    #[error("Presentation control error: {0}")]
    PresentationControl(String),

    /// The presentation target reports no running slide show
    #[error("No active presentation session")]
    NoActiveSession,

    /// Replay script could not be read or parsed
    #[error("Replay error: {0}")]
    Replay(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The bounded session wrapper gave up on the capture loop
    #[error("Session exceeded its time limit of {0:?}")]
    SessionTimeout(Duration),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
