//! Job store: producer inserts, atomic claims, guarded resolutions.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crewdesk_models::{Job, JobKind, JobOutputs, JobStatus};

use crate::error::{StoreError, StoreResult};
use crate::schema;

/// Parameters for a new receipt job.
#[derive(Debug, Clone, Default)]
pub struct NewReceiptJob {
    pub tenant: String,
    pub company_name: String,
    pub month_folder: String,
    pub image_file: String,
    pub audio_file: String,
    pub project_id: Option<i64>,
    pub category_1_id: Option<i64>,
    pub category_2_id: Option<i64>,
}

/// Parameters for a new estimate job. Audio is optional; estimates created
/// without audio never enter the queue.
#[derive(Debug, Clone, Default)]
pub struct NewEstimateJob {
    pub tenant: String,
    pub company_name: String,
    pub audio_file: String,
    pub project_id: Option<i64>,
}

/// Handle on the shared job database.
///
/// Each process (and each simulated claimer in tests) opens its own handle on
/// the same path; cross-process safety comes from SQLite WAL plus the
/// conditional updates below, never from in-memory locking.
pub struct JobStore {
    conn: Connection,
}

impl JobStore {
    /// Open (creating if needed) the job database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        schema::init(&conn)?;
        Ok(Self { conn })
    }

    // ------------------------------------------------------------------
    // Producer surface (called by the request-handling layer)
    // ------------------------------------------------------------------

    /// Insert a receipt job. Enters the queue in `Pending`, or directly in
    /// `Complete` when there is no audio to transcribe.
    pub fn create_receipt_job(&self, new: NewReceiptJob) -> StoreResult<Job> {
        let status = if new.audio_file.is_empty() {
            JobStatus::Complete
        } else {
            JobStatus::Pending
        };
        self.conn.execute(
            "INSERT INTO jobs (tenant, company_name, kind, month_folder, image_file,
                               audio_file, project_id, category_1_id, category_2_id,
                               status, created_at)
             VALUES (?1, ?2, 'receipt', ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                new.tenant,
                new.company_name,
                new.month_folder,
                new.image_file,
                new.audio_file,
                new.project_id,
                new.category_1_id,
                new.category_2_id,
                status.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        self.job(self.conn.last_insert_rowid())
    }

    /// Insert an estimate job. Enters the queue in `Pending`, or directly in
    /// `Complete` when created without audio.
    pub fn create_estimate_job(&self, new: NewEstimateJob) -> StoreResult<Job> {
        let status = if new.audio_file.is_empty() {
            JobStatus::Complete
        } else {
            JobStatus::Pending
        };
        self.conn.execute(
            "INSERT INTO jobs (tenant, company_name, kind, audio_file, project_id,
                               status, created_at)
             VALUES (?1, ?2, 'estimate', ?3, ?4, ?5, ?6)",
            params![
                new.tenant,
                new.company_name,
                new.audio_file,
                new.project_id,
                status.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        self.job(self.conn.last_insert_rowid())
    }

    /// Queue an additional audio clip onto a completed estimate. The row
    /// re-enters the queue as an append unit (`Appending`). Returns false when
    /// the row is not a completed estimate.
    pub fn request_append(&self, job_id: i64, audio_file: &str) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE jobs SET append_audio_file = ?1, status = ?2
             WHERE id = ?3 AND kind = 'estimate' AND status = ?4",
            params![
                audio_file,
                JobStatus::Appending.as_str(),
                job_id,
                JobStatus::Complete.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    // ------------------------------------------------------------------
    // Claimer
    // ------------------------------------------------------------------

    /// Atomically claim the oldest queued job of `kind`.
    ///
    /// Selects the lowest-id row in the kind's queue state, then promotes it
    /// with a single update guarded by "status unchanged". Zero affected rows
    /// means another claimer won the race (or nothing was queued) and is a
    /// benign `None`, not an error.
    pub fn claim_next_pending(&self, kind: JobKind) -> StoreResult<Option<Job>> {
        let queue = kind.queue_status();
        let claimed = kind.claimed_status();

        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM jobs WHERE kind = ?1 AND status = ?2
                 ORDER BY id ASC LIMIT 1",
                params![kind.record_kind(), queue.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(id) = id else {
            return Ok(None);
        };

        let changed = self.conn.execute(
            "UPDATE jobs SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![claimed.as_str(), id, queue.as_str()],
        )?;
        if changed == 0 {
            debug!(job_id = id, kind = %kind, "lost claim race");
            return Ok(None);
        }

        self.job(id).map(Some)
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Write outputs and move the row to `Complete`.
    ///
    /// Valid only from an in-progress state; once the row has left it, the
    /// call is a silent no-op (returns false).
    pub fn resolve_success(&self, job_id: i64, outputs: &JobOutputs) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE jobs SET transcription = ?1, report_file = ?2, status = ?3
             WHERE id = ?4 AND status IN (?5, ?6)",
            params![
                outputs.transcription,
                outputs.report_file.as_deref().unwrap_or_default(),
                JobStatus::Complete.as_str(),
                job_id,
                JobStatus::InProgress.as_str(),
                JobStatus::AppendingInProgress.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    /// Record a failure message and move the row to `Error`.
    ///
    /// The message lands in the transcription field so failures surface
    /// through the same read path as results. Same idempotence guard as
    /// [`resolve_success`](Self::resolve_success). The append kind never uses
    /// this; see [`abandon_append`](Self::abandon_append).
    pub fn resolve_failure(&self, job_id: i64, message: &str) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE jobs SET transcription = ?1, status = ?2
             WHERE id = ?3 AND status IN (?4, ?5)",
            params![
                message,
                JobStatus::Error.as_str(),
                job_id,
                JobStatus::InProgress.as_str(),
                JobStatus::AppendingInProgress.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    /// Concatenate `text` onto the existing transcription with a blank-line
    /// separator, clear the pending clip and complete the append unit.
    pub fn append_transcription(&self, job_id: i64, text: &str) -> StoreResult<bool> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT transcription FROM jobs WHERE id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;
        let old = existing.unwrap_or_default().trim().to_string();
        let combined = if old.is_empty() {
            text.trim().to_string()
        } else {
            format!("{}\n\n{}", old, text.trim())
        };

        let changed = self.conn.execute(
            "UPDATE jobs SET transcription = ?1, status = ?2, append_audio_file = ''
             WHERE id = ?3 AND status = ?4",
            params![
                combined,
                JobStatus::Complete.as_str(),
                job_id,
                JobStatus::AppendingInProgress.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    /// Abandon a claimed append unit: clear the pending clip and complete the
    /// row without touching the transcription. This is the append kind's
    /// failure resolution; it deliberately never reaches `Error` so the
    /// estimate is not stranded mid-flow.
    pub fn abandon_append(&self, job_id: i64) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE jobs SET status = ?1, append_audio_file = ''
             WHERE id = ?2 AND status = ?3",
            params![
                JobStatus::Complete.as_str(),
                job_id,
                JobStatus::AppendingInProgress.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    // ------------------------------------------------------------------
    // Reads & lookups
    // ------------------------------------------------------------------

    /// Fetch a job row, erroring when it does not exist.
    pub fn job(&self, job_id: i64) -> StoreResult<Job> {
        self.find_job(job_id)?
            .ok_or(StoreError::JobNotFound(job_id))
    }

    /// Fetch a job row if it exists.
    pub fn find_job(&self, job_id: i64) -> StoreResult<Option<Job>> {
        let job = self
            .conn
            .query_row(
                "SELECT id, tenant, company_name, kind, month_folder, image_file,
                        audio_file, append_audio_file, transcription, report_file,
                        project_id, category_1_id, category_2_id, status, created_at
                 FROM jobs WHERE id = ?1",
                params![job_id],
                job_from_row,
            )
            .optional()?;
        Ok(job)
    }

    pub fn add_project(&self, tenant: &str, name: &str) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO projects (tenant, name, created_at) VALUES (?1, ?2, ?3)",
            params![tenant, name, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn project_name(&self, project_id: i64) -> StoreResult<Option<String>> {
        let name = self
            .conn
            .query_row(
                "SELECT name FROM projects WHERE id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    pub fn add_category(&self, tenant: &str, name: &str) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO categories (tenant, name, created_at) VALUES (?1, ?2, ?3)",
            params![tenant, name, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn category_name(&self, category_id: i64) -> StoreResult<Option<String>> {
        let name = self
            .conn
            .query_row(
                "SELECT name FROM categories WHERE id = ?1",
                params![category_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    /// Store extractor output for a job, replacing any previous extraction.
    pub fn save_tasks(&self, job_id: i64, tasks: &[String]) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM job_tasks WHERE job_id = ?1", params![job_id])?;
        let now = Utc::now().to_rfc3339();
        for task in tasks {
            self.conn.execute(
                "INSERT INTO job_tasks (job_id, task, created_at) VALUES (?1, ?2, ?3)",
                params![job_id, task, now],
            )?;
        }
        Ok(())
    }

    pub fn tasks(&self, job_id: i64) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT task FROM job_tasks WHERE job_id = ?1 ORDER BY id ASC")?;
        let rows = stmt.query_map(params![job_id], |row| row.get(0))?;
        let mut tasks = Vec::new();
        for task in rows {
            tasks.push(task?);
        }
        Ok(tasks)
    }
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    let id: i64 = row.get(0)?;
    let kind_tag: String = row.get(3)?;
    let kind = JobKind::parse(&kind_tag).ok_or_else(|| conversion_error(3, &kind_tag))?;
    let status_tag: String = row.get(13)?;
    let status =
        JobStatus::parse(&status_tag).ok_or_else(|| conversion_error(13, &status_tag))?;
    let created_raw: String = row.get(14)?;
    let created_at = DateTime::parse_from_rfc3339(&created_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| conversion_error(14, &created_raw))?;

    Ok(Job {
        id,
        tenant: row.get(1)?,
        company_name: row.get(2)?,
        kind,
        month_folder: row.get(4)?,
        image_file: row.get(5)?,
        audio_file: row.get(6)?,
        append_audio_file: row.get(7)?,
        transcription: row.get(8)?,
        report_file: row.get(9)?,
        project_id: row.get(10)?,
        category_1_id: row.get(11)?,
        category_2_id: row.get(12)?,
        status,
        created_at,
    })
}

fn conversion_error(index: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        format!("unrecognized value: {value}").into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn temp_store() -> (tempfile::TempDir, JobStore, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");
        let store = JobStore::open(&path).unwrap();
        (dir, store, path)
    }

    fn pending_estimate(store: &JobStore, audio: &str) -> Job {
        store
            .create_estimate_job(NewEstimateJob {
                tenant: "acme".into(),
                company_name: "Acme Paving".into(),
                audio_file: audio.into(),
                project_id: None,
            })
            .unwrap()
    }

    #[test]
    fn test_create_receipt_enters_queue_pending() {
        let (_dir, store, _) = temp_store();
        let job = store
            .create_receipt_job(NewReceiptJob {
                tenant: "acme".into(),
                company_name: "Acme Paving".into(),
                month_folder: "2026-08".into(),
                image_file: "r1.jpg".into(),
                audio_file: "r1.webm".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(job.kind, JobKind::Receipt);
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.has_audio());
    }

    #[test]
    fn test_estimate_without_audio_never_enters_queue() {
        let (_dir, store, _) = temp_store();
        let job = pending_estimate(&store, "");
        assert_eq!(job.status, JobStatus::Complete);
        assert!(store
            .claim_next_pending(JobKind::Estimate)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_claims_are_oldest_id_first() {
        let (_dir, store, _) = temp_store();
        let first = pending_estimate(&store, "a.webm");
        let second = pending_estimate(&store, "b.webm");
        assert!(second.id > first.id);

        let claimed = store.claim_next_pending(JobKind::Estimate).unwrap().unwrap();
        assert_eq!(claimed.id, first.id);
        assert_eq!(claimed.status, JobStatus::InProgress);

        let claimed = store.claim_next_pending(JobKind::Estimate).unwrap().unwrap();
        assert_eq!(claimed.id, second.id);

        assert!(store
            .claim_next_pending(JobKind::Estimate)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_concurrent_claimers_receive_disjoint_jobs() {
        let (_dir, store, path) = temp_store();
        const JOBS: usize = 24;
        for _ in 0..JOBS {
            pending_estimate(&store, "clip.webm");
        }

        let seen: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let path = path.clone();
            let seen = Arc::clone(&seen);
            handles.push(std::thread::spawn(move || {
                // each claimer opens its own handle, as separate processes would
                let store = JobStore::open(&path).unwrap();
                loop {
                    match store.claim_next_pending(JobKind::Estimate) {
                        Ok(Some(job)) => seen.lock().unwrap().push(job.id),
                        Ok(None) => break,
                        Err(e) => panic!("claim failed: {e}"),
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let ids = seen.lock().unwrap();
        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(ids.len(), JOBS, "every job claimed exactly once");
        assert_eq!(unique.len(), JOBS, "no job handed to two claimers");
    }

    #[test]
    fn test_resolve_success_writes_outputs_once() {
        let (_dir, store, _) = temp_store();
        let job = pending_estimate(&store, "clip.webm");
        let claimed = store.claim_next_pending(JobKind::Estimate).unwrap().unwrap();
        assert_eq!(claimed.id, job.id);

        let outputs = JobOutputs::text("three yards of gravel");
        assert!(store.resolve_success(job.id, &outputs).unwrap());

        let row = store.job(job.id).unwrap();
        assert_eq!(row.status, JobStatus::Complete);
        assert_eq!(row.transcription, "three yards of gravel");

        // second resolution is a silent no-op
        assert!(!store
            .resolve_success(job.id, &JobOutputs::text("overwrite"))
            .unwrap());
        assert!(!store.resolve_failure(job.id, "late failure").unwrap());
        let row = store.job(job.id).unwrap();
        assert_eq!(row.transcription, "three yards of gravel");
        assert_eq!(row.status, JobStatus::Complete);
    }

    #[test]
    fn test_resolve_failure_surfaces_message_in_text_field() {
        let (_dir, store, _) = temp_store();
        let job = pending_estimate(&store, "clip.webm");
        store.claim_next_pending(JobKind::Estimate).unwrap().unwrap();

        assert!(store.resolve_failure(job.id, "Error: no such file").unwrap());
        let row = store.job(job.id).unwrap();
        assert_eq!(row.status, JobStatus::Error);
        assert_eq!(row.transcription, "Error: no such file");
    }

    #[test]
    fn test_resolve_requires_a_claim() {
        let (_dir, store, _) = temp_store();
        let job = pending_estimate(&store, "clip.webm");
        assert!(!store
            .resolve_success(job.id, &JobOutputs::text("unclaimed"))
            .unwrap());
        assert_eq!(store.job(job.id).unwrap().status, JobStatus::Pending);
    }

    #[test]
    fn test_receipt_resolution_records_report_artifact() {
        let (_dir, store, _) = temp_store();
        let job = store
            .create_receipt_job(NewReceiptJob {
                tenant: "acme".into(),
                company_name: "Acme Paving".into(),
                month_folder: "2026-08".into(),
                image_file: "r1.jpg".into(),
                audio_file: "r1.webm".into(),
                ..Default::default()
            })
            .unwrap();
        store.claim_next_pending(JobKind::Receipt).unwrap().unwrap();
        store
            .resolve_success(job.id, &JobOutputs::with_report("lumber, $84", "r1.html"))
            .unwrap();
        let row = store.job(job.id).unwrap();
        assert_eq!(row.report_file, "r1.html");
    }

    #[test]
    fn test_append_flow_concatenates_with_separator() {
        let (_dir, store, _) = temp_store();
        let job = pending_estimate(&store, "clip.webm");
        store.claim_next_pending(JobKind::Estimate).unwrap().unwrap();
        store
            .resolve_success(job.id, &JobOutputs::text("first visit notes"))
            .unwrap();

        assert!(store.request_append(job.id, "extra.webm").unwrap());
        let row = store.job(job.id).unwrap();
        assert_eq!(row.status, JobStatus::Appending);
        assert_eq!(row.append_audio_file, "extra.webm");

        let claimed = store
            .claim_next_pending(JobKind::EstimateAppend)
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.status, JobStatus::AppendingInProgress);

        assert!(store.append_transcription(job.id, " second visit notes ").unwrap());
        let row = store.job(job.id).unwrap();
        assert_eq!(row.status, JobStatus::Complete);
        assert_eq!(row.transcription, "first visit notes\n\nsecond visit notes");
        assert_eq!(row.append_audio_file, "");
    }

    #[test]
    fn test_append_onto_empty_transcription_has_no_separator() {
        let (_dir, store, _) = temp_store();
        let job = pending_estimate(&store, "clip.webm");
        store.claim_next_pending(JobKind::Estimate).unwrap().unwrap();
        store.resolve_success(job.id, &JobOutputs::text("")).unwrap();
        store.request_append(job.id, "extra.webm").unwrap();
        store
            .claim_next_pending(JobKind::EstimateAppend)
            .unwrap()
            .unwrap();
        store.append_transcription(job.id, "only notes").unwrap();
        assert_eq!(store.job(job.id).unwrap().transcription, "only notes");
    }

    #[test]
    fn test_abandon_append_completes_without_touching_text() {
        let (_dir, store, _) = temp_store();
        let job = pending_estimate(&store, "clip.webm");
        store.claim_next_pending(JobKind::Estimate).unwrap().unwrap();
        store
            .resolve_success(job.id, &JobOutputs::text("keep me"))
            .unwrap();
        store.request_append(job.id, "gone.webm").unwrap();
        store
            .claim_next_pending(JobKind::EstimateAppend)
            .unwrap()
            .unwrap();

        assert!(store.abandon_append(job.id).unwrap());
        let row = store.job(job.id).unwrap();
        assert_eq!(row.status, JobStatus::Complete);
        assert_eq!(row.transcription, "keep me");
        assert_eq!(row.append_audio_file, "");

        // second call is a no-op
        assert!(!store.abandon_append(job.id).unwrap());
    }

    #[test]
    fn test_request_append_rejects_non_complete_rows() {
        let (_dir, store, _) = temp_store();
        let job = pending_estimate(&store, "clip.webm");
        assert!(!store.request_append(job.id, "extra.webm").unwrap());
    }

    #[test]
    fn test_kinds_queue_independently() {
        let (_dir, store, _) = temp_store();
        pending_estimate(&store, "clip.webm");
        assert!(store
            .claim_next_pending(JobKind::Receipt)
            .unwrap()
            .is_none());
        assert!(store
            .claim_next_pending(JobKind::EstimateAppend)
            .unwrap()
            .is_none());
        assert!(store
            .claim_next_pending(JobKind::Estimate)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_descriptive_lookups() {
        let (_dir, store, _) = temp_store();
        let project = store.add_project("acme", "Maple St driveway").unwrap();
        let category = store.add_category("acme", "Materials").unwrap();
        assert_eq!(
            store.project_name(project).unwrap().as_deref(),
            Some("Maple St driveway")
        );
        assert_eq!(
            store.category_name(category).unwrap().as_deref(),
            Some("Materials")
        );
        assert!(store.project_name(999).unwrap().is_none());
    }

    #[test]
    fn test_save_tasks_replaces_previous_extraction() {
        let (_dir, store, _) = temp_store();
        let job = pending_estimate(&store, "clip.webm");
        store
            .save_tasks(job.id, &["demo old".to_string()])
            .unwrap();
        store
            .save_tasks(job.id, &["grade lot".to_string(), "pour slab".to_string()])
            .unwrap();
        assert_eq!(store.tasks(job.id).unwrap(), vec!["grade lot", "pour slab"]);
    }
}
