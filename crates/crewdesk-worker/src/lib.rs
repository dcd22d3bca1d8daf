//! Background transcription worker.
//!
//! This crate provides:
//! - The polling worker loop, one per hosting process
//! - Cross-process serialization via a filesystem advisory lock
//! - Per-kind processing pipelines (receipt, estimate, estimate-append)
//! - Best-effort task extraction from estimate transcriptions
//! - A supervisor with a liveness check so restart logic never double-spawns
//!
//! Every process on the host may run this loop; the advisory lock keeps the
//! GPU-bound transcription step single-flight system-wide, and the database
//! claim guard keeps each job owned by exactly one pass.

pub mod config;
pub mod error;
pub mod extractor;
pub mod layout;
pub mod lock;
pub mod processor;
pub mod supervisor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use extractor::{OllamaExtractor, TaskExtractor};
pub use layout::ArtifactLayout;
pub use lock::{LockGuard, WorkerLock};
pub use processor::Processor;
pub use supervisor::{run_pass, WorkerSupervisor, PASS_ORDER};
