//! Shared domain types for the crewdesk processing pipeline.
//!
//! This crate provides:
//! - Job kinds and lifecycle states
//! - The persisted job record
//! - Output payloads written back on resolution

pub mod job;
pub mod status;

pub use job::{Job, JobKind, JobOutputs};
pub use status::JobStatus;
