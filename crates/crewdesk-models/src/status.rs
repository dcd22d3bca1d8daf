//! Job lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a queued job.
///
/// Receipt and estimate jobs move `Pending -> InProgress -> {Complete, Error}`.
/// The append kind moves `Appending -> AppendingInProgress -> Complete` and has
/// no error terminal. Transitions are monotonic; a row never moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in queue for a claimer
    #[default]
    Pending,
    /// Claimed by exactly one worker pass
    InProgress,
    /// Finished successfully (also the append kind's only terminal)
    Complete,
    /// Failed; the transcription field carries the error message
    Error,
    /// Waiting for an additional audio clip to be transcribed
    Appending,
    /// Append claim held by exactly one worker pass
    AppendingInProgress,
}

impl JobStatus {
    /// Get string representation of the status (the persisted form).
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
            JobStatus::Appending => "appending",
            JobStatus::AppendingInProgress => "appending_in_progress",
        }
    }

    /// Parse the persisted form back into a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "in_progress" => Some(JobStatus::InProgress),
            "complete" => Some(JobStatus::Complete),
            "error" => Some(JobStatus::Error),
            "appending" => Some(JobStatus::Appending),
            "appending_in_progress" => Some(JobStatus::AppendingInProgress),
            _ => None,
        }
    }

    /// Check if this is a terminal state (no further automatic transition).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    /// Check if a worker currently holds this job.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, JobStatus::InProgress | JobStatus::AppendingInProgress)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
