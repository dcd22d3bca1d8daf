//! Per-kind job processing pipelines.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use tracing::{error, info, warn};

use crewdesk_engine::TranscriptionEngine;
use crewdesk_media::photo::THUMBNAIL_MAX_WIDTH;
use crewdesk_media::{normalize_orientation, write_thumbnail, ReportContext, ReportRenderer};
use crewdesk_models::{Job, JobKind, JobOutputs};
use crewdesk_store::JobStore;

use crate::error::WorkerResult;
use crate::extractor::TaskExtractor;
use crate::layout::ArtifactLayout;

/// Claims and processes jobs, one at a time.
///
/// All three kinds share the claim/resolve contract; this is the single
/// dispatch point selecting the per-kind pipeline.
pub struct Processor {
    store: JobStore,
    engine: Box<dyn TranscriptionEngine>,
    renderer: Box<dyn ReportRenderer>,
    extractor: Option<Box<dyn TaskExtractor>>,
    layout: ArtifactLayout,
}

impl Processor {
    pub fn new(
        store: JobStore,
        engine: Box<dyn TranscriptionEngine>,
        renderer: Box<dyn ReportRenderer>,
        extractor: Option<Box<dyn TaskExtractor>>,
        layout: ArtifactLayout,
    ) -> Self {
        Self {
            store,
            engine,
            renderer,
            extractor,
            layout,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Claim and process one job of `kind`. Returns whether a job was found.
    ///
    /// A failing pipeline resolves the job to its kind's failure state and is
    /// not an error here; only store trouble during claim/resolution
    /// propagates, to be caught at the loop boundary.
    pub fn process_next(&self, kind: JobKind) -> WorkerResult<bool> {
        let Some(job) = self.store.claim_next_pending(kind)? else {
            return Ok(false);
        };
        info!(job_id = job.id, kind = %kind, tenant = %job.tenant, "processing job");

        // A panicking pipeline must mark its job failed, never kill the loop.
        let outcome = catch_unwind(AssertUnwindSafe(|| self.process_job(kind, &job)));
        match outcome {
            Ok(Ok(())) => {
                info!(job_id = job.id, kind = %kind, "job complete");
            }
            Ok(Err(e)) => self.fail_job(kind, &job, &e.to_string())?,
            Err(payload) => self.fail_job(kind, &job, &panic_message(payload.as_ref()))?,
        }
        Ok(true)
    }

    fn process_job(&self, kind: JobKind, job: &Job) -> WorkerResult<()> {
        match kind {
            JobKind::Receipt => self.process_receipt(job),
            JobKind::Estimate => self.process_estimate(job),
            JobKind::EstimateAppend => self.process_append(job),
        }
    }

    fn fail_job(&self, kind: JobKind, job: &Job, message: &str) -> WorkerResult<()> {
        error!(job_id = job.id, kind = %kind, "job failed: {message}");
        match kind {
            JobKind::Receipt | JobKind::Estimate => {
                self.store
                    .resolve_failure(job.id, &format!("Error: {message}"))?;
            }
            // no error terminal for the append kind; complete without text
            JobKind::EstimateAppend => {
                self.store.abandon_append(job.id)?;
            }
        }
        Ok(())
    }

    /// Receipt pipeline: normalize the photo, derive a thumbnail, transcribe
    /// the voice note, render the combined report.
    fn process_receipt(&self, job: &Job) -> WorkerResult<()> {
        let dir = self.layout.receipt_dir(&job.tenant, &job.month_folder);
        let audio_path = dir.join(&job.audio_file);

        let base = artifact_stem(job);
        let report_file = format!("{base}.html");

        if job.has_image() {
            let image_path = dir.join(&job.image_file);
            normalize_orientation(&image_path)?;
            let thumb_file = format!("{base}_thumb.jpg");
            write_thumbnail(&image_path, &dir.join(&thumb_file), THUMBNAIL_MAX_WIDTH)?;
        }

        let text = self.engine.transcribe(&audio_path)?;

        let project_name = match job.project_id {
            Some(id) => self.store.project_name(id)?,
            None => None,
        };
        let mut category_names = Vec::new();
        for id in [job.category_1_id, job.category_2_id].into_iter().flatten() {
            if let Some(name) = self.store.category_name(id)? {
                category_names.push(name);
            }
        }

        let ctx = ReportContext {
            company_name: job.company_name.clone(),
            tenant: job.tenant.clone(),
            timestamp: job.created_at.format("%Y-%m-%d %H:%M").to_string(),
            project_name,
            category_names,
            transcription: text.clone(),
            image_file: job.has_image().then(|| job.image_file.clone()),
        };
        self.renderer.render(&ctx, &dir.join(&report_file))?;

        self.store
            .resolve_success(job.id, &JobOutputs::with_report(text, report_file))?;
        Ok(())
    }

    /// Estimate pipeline: transcribe, resolve, then best-effort task
    /// extraction that never reverts the resolution.
    fn process_estimate(&self, job: &Job) -> WorkerResult<()> {
        let audio_path = self.layout.estimate_dir(&job.tenant).join(&job.audio_file);
        let text = self.engine.transcribe(&audio_path)?;
        self.store
            .resolve_success(job.id, &JobOutputs::text(text.clone()))?;

        if let Some(extractor) = &self.extractor {
            match extractor.extract(&text) {
                Ok(tasks) if !tasks.is_empty() => {
                    if let Err(e) = self.store.save_tasks(job.id, &tasks) {
                        warn!(job_id = job.id, "failed to store extracted tasks: {e}");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(job_id = job.id, "task extraction failed: {e}"),
            }
        }
        Ok(())
    }

    /// Append pipeline: transcribe the extra clip and concatenate it onto the
    /// existing transcription. A missing clip writes a placeholder and still
    /// completes; this kind never reaches `Error`.
    fn process_append(&self, job: &Job) -> WorkerResult<()> {
        if job.append_audio_file.is_empty() {
            self.store.abandon_append(job.id)?;
            return Ok(());
        }

        let audio_path = self
            .layout
            .estimate_dir(&job.tenant)
            .join(&job.append_audio_file);
        let text = if audio_path.is_file() {
            self.engine.transcribe(&audio_path)?
        } else {
            format!("(append audio file not found: {})", job.append_audio_file)
        };

        self.store.append_transcription(job.id, &text)?;
        Ok(())
    }
}

/// Artifact base name: the image stem when there is an image, otherwise the
/// audio stem.
fn artifact_stem(job: &Job) -> String {
    let source = if job.has_image() {
        &job.image_file
    } else {
        &job.audio_file
    };
    Path::new(source)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("job_{}", job.id))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "job processing panicked".to_string()
    }
}
