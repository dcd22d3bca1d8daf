//! Transcription engine boundary.
//!
//! The pipeline sees one synchronous call: `transcribe(path) -> text`. The
//! shipped implementation shells out to an external speech-to-text command
//! (typically a Whisper CLI pinned to the GPU); anything it raises is caught
//! by the worker and converted into a failure resolution. The engine is
//! single-flight system-wide — the worker's advisory lock guarantees only one
//! process calls it at a time.

pub mod command;
pub mod error;

pub use command::CommandEngine;
pub use error::{EngineError, EngineResult};

use std::path::Path;

/// Opaque speech-to-text engine.
pub trait TranscriptionEngine: Send + Sync {
    /// Transcribe one audio file, returning the trimmed text.
    fn transcribe(&self, audio: &Path) -> EngineResult<String>;
}
