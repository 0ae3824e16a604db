//! Error types for capture, detection and alert playback

use std::path::PathBuf;
use std::time::Duration;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised while acquiring or analyzing a frame
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The camera device could not be opened
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    /// The camera opened but no frame could be read
    #[error("Frame capture failed: {0}")]
    CaptureFailed(String),

    /// The pose model returned no landmark sets
    #[error("No person detected")]
    NoPersonDetected,

    /// A model failed to run or returned an unexpected tensor
    #[error("Inference error: {0}")]
    Inference(String),

    /// Another task held the pipeline for longer than allowed
    #[error("Pipeline busy for more than {}ms", .0.as_millis())]
    Busy(Duration),

    /// The snapshot could not be written
    #[error("Failed to save snapshot to {path}: {message}")]
    Snapshot { path: PathBuf, message: String },

    #[error("Background task failed: {0}")]
    Task(String),
}

impl PipelineError {
    /// Camera and capture problems are transient and retried on the next cycle
    pub fn is_camera_error(&self) -> bool {
        matches!(
            self,
            PipelineError::CameraUnavailable(_)
                | PipelineError::CaptureFailed(_)
                | PipelineError::Busy(_)
        )
    }
}

/// Errors raised while playing the audible alert
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("Alert sound not found: {0}")]
    SoundMissing(PathBuf),

    #[error("Failed to start sound player: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Sound player exited with {0}")]
    Player(String),
}
