use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiffError>;

/// Sampling itself never fails on malformed diffs; these cover the inputs
/// around it (config and commit lists).
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid sampling config: {0}")]
    InvalidConfig(String),
}
