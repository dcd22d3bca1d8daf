//! Engine error types.

use std::path::PathBuf;

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("audio file not found: {}", .0.display())]
    AudioNotFound(PathBuf),

    #[error("transcription command not found: {0}")]
    CommandNotFound(String),

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::TranscriptionFailed(msg.into())
    }
}
