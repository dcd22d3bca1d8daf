//! Job definitions for queue processing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::status::JobStatus;

/// Kind of queued work.
///
/// One shared claim/resolve contract covers all three kinds; the worker
/// dispatches on the kind at a single point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Receipt photo + voice note: transcription, thumbnail and report
    Receipt,
    /// Estimate voice note: transcription plus best-effort task extraction
    Estimate,
    /// Additional audio clip appended onto an existing estimate transcription
    EstimateAppend,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Receipt => "receipt",
            JobKind::Estimate => "estimate",
            JobKind::EstimateAppend => "estimate_append",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "receipt" => Some(JobKind::Receipt),
            "estimate" => Some(JobKind::Estimate),
            "estimate_append" => Some(JobKind::EstimateAppend),
            _ => None,
        }
    }

    /// Persisted record kind this work addresses. The append kind re-enters
    /// the completed estimate row it extends rather than creating a new row.
    pub fn record_kind(&self) -> &'static str {
        match self {
            JobKind::Receipt => "receipt",
            JobKind::Estimate | JobKind::EstimateAppend => "estimate",
        }
    }

    /// State a job of this kind sits in while waiting to be claimed.
    pub fn queue_status(&self) -> JobStatus {
        match self {
            JobKind::Receipt | JobKind::Estimate => JobStatus::Pending,
            JobKind::EstimateAppend => JobStatus::Appending,
        }
    }

    /// State a job of this kind holds while exactly one worker owns it.
    pub fn claimed_status(&self) -> JobStatus {
        match self {
            JobKind::Receipt | JobKind::Estimate => JobStatus::InProgress,
            JobKind::EstimateAppend => JobStatus::AppendingInProgress,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted unit of queued work.
///
/// Filename fields are relative to the owning tenant's artifact directory;
/// the store never learns the artifact root itself. Empty string means
/// "not set", matching the persisted defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Row id; claims within a kind are strictly oldest-id-first
    pub id: i64,

    /// Owning tenant key
    pub tenant: String,

    /// Display name embedded in generated reports
    pub company_name: String,

    pub kind: JobKind,

    /// Month subfolder receipts are filed under (`YYYY-MM`)
    #[serde(default)]
    pub month_folder: String,

    /// Source image filename (receipts)
    #[serde(default)]
    pub image_file: String,

    /// Source audio filename
    #[serde(default)]
    pub audio_file: String,

    /// Extra clip awaiting append transcription
    #[serde(default)]
    pub append_audio_file: String,

    /// Result text; doubles as the error payload for `Error` rows
    #[serde(default)]
    pub transcription: String,

    /// Derived report artifact filename
    #[serde(default)]
    pub report_file: String,

    /// Project embedded in the receipt report header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_1_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_2_id: Option<i64>,

    pub status: JobStatus,

    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn has_audio(&self) -> bool {
        !self.audio_file.is_empty()
    }

    pub fn has_image(&self) -> bool {
        !self.image_file.is_empty()
    }
}

/// Outputs written back when a claimed job resolves successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOutputs {
    pub transcription: String,
    /// Report artifact filename, when the kind produces one
    pub report_file: Option<String>,
}

impl JobOutputs {
    pub fn text(transcription: impl Into<String>) -> Self {
        Self {
            transcription: transcription.into(),
            report_file: None,
        }
    }

    pub fn with_report(transcription: impl Into<String>, report_file: impl Into<String>) -> Self {
        Self {
            transcription: transcription.into(),
            report_file: Some(report_file.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_persisted_form() {
        for kind in [JobKind::Receipt, JobKind::Estimate, JobKind::EstimateAppend] {
            assert_eq!(JobKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(JobKind::parse("invoice"), None);
    }

    #[test]
    fn test_kind_state_machine_endpoints() {
        assert_eq!(JobKind::Receipt.queue_status(), JobStatus::Pending);
        assert_eq!(JobKind::Receipt.claimed_status(), JobStatus::InProgress);
        assert_eq!(JobKind::EstimateAppend.queue_status(), JobStatus::Appending);
        assert_eq!(
            JobKind::EstimateAppend.claimed_status(),
            JobStatus::AppendingInProgress
        );
    }
}
