//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Store error: {0}")]
    Store(#[from] crewdesk_store::StoreError),

    #[error("Media error: {0}")]
    Media(#[from] crewdesk_media::MediaError),

    #[error("Engine error: {0}")]
    Engine(#[from] crewdesk_engine::EngineError),

    #[error("Task extraction failed: {0}")]
    Extraction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }
}
