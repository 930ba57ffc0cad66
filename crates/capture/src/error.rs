use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CaptureError>;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid job name: {0:?}")]
    InvalidJobName(String),

    #[error("Invalid conclusion {0:?} (expected success, failure, cancelled or skipped)")]
    InvalidConclusion(String),

    #[error("Capture for job '{job_name}' was never initialized (no bundle at {})", dir.display())]
    NotInitialized { job_name: String, dir: PathBuf },

    #[error("Capture for job '{0}' is already finalized")]
    AlreadyFinalized(String),

    #[error("Malformed metadata at {}: {reason}", path.display())]
    MalformedMetadata { path: PathBuf, reason: String },
}
