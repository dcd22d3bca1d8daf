//! Worker loop and its supervisor.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crewdesk_models::JobKind;

use crate::error::WorkerResult;
use crate::lock::WorkerLock;
use crate::processor::Processor;

/// Fixed priority order of kinds within one pass.
pub const PASS_ORDER: [JobKind; 3] = [
    JobKind::Receipt,
    JobKind::Estimate,
    JobKind::EstimateAppend,
];

/// One pass: claim and process at most one job of each kind, in order.
///
/// The caller holds the advisory lock for the duration of the pass.
pub fn run_pass(processor: &Processor) -> WorkerResult<()> {
    for kind in PASS_ORDER {
        processor.process_next(kind)?;
    }
    Ok(())
}

/// Poll forever: lock, pass, unlock, sleep.
///
/// The lock is held only for the pass, never across the sleep, so worst-case
/// queue latency grows by about one poll interval per competing process. Any
/// error escaping a pass is logged and the loop continues; nothing here is
/// allowed to terminate the thread.
pub fn run_loop(processor: Processor, lock: WorkerLock, poll_interval: Duration) {
    info!(
        lock = %lock.path().display(),
        interval_secs = poll_interval.as_secs_f64(),
        "worker loop started (database-polling mode)"
    );
    loop {
        match lock.acquire() {
            Ok(_guard) => {
                if let Err(e) = run_pass(&processor) {
                    error!("worker pass failed: {e}");
                }
                // guard drops here, before the sleep
            }
            Err(e) => error!("failed to acquire worker lock: {e}"),
        }
        thread::sleep(poll_interval);
    }
}

/// Owns the single per-process loop thread.
///
/// `start` is guarded by a liveness check, so application start-up and restart
/// hooks can call it unconditionally without ever spawning a second loop.
pub struct WorkerSupervisor {
    handle: Option<JoinHandle<()>>,
}

impl WorkerSupervisor {
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Whether this process's loop thread is currently running.
    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Spawn the loop thread unless one is already alive. Returns whether a
    /// new thread was spawned.
    pub fn start(
        &mut self,
        processor: Processor,
        lock: WorkerLock,
        poll_interval: Duration,
    ) -> WorkerResult<bool> {
        if self.is_alive() {
            debug!("worker loop already running; not spawning another");
            return Ok(false);
        }
        let handle = thread::Builder::new()
            .name("crewdesk-worker".to_string())
            .spawn(move || run_loop(processor, lock, poll_interval))?;
        self.handle = Some(handle);
        Ok(true)
    }

    /// Block on the loop thread. The loop runs forever, so this returns only
    /// if the thread dies — which the loop's error handling is built to
    /// prevent.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Default for WorkerSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crewdesk_engine::{EngineResult, TranscriptionEngine};
    use crewdesk_media::HtmlReportRenderer;
    use crewdesk_store::JobStore;

    use crate::layout::ArtifactLayout;

    struct SilentEngine;

    impl TranscriptionEngine for SilentEngine {
        fn transcribe(&self, _audio: &Path) -> EngineResult<String> {
            Ok(String::new())
        }
    }

    fn idle_processor(dir: &Path) -> Processor {
        let store = JobStore::open(dir.join("jobs.db")).unwrap();
        Processor::new(
            store,
            Box::new(SilentEngine),
            Box::new(HtmlReportRenderer),
            None,
            ArtifactLayout::new(dir.join("receipts")),
        )
    }

    #[test]
    fn test_start_is_guarded_by_liveness() {
        let dir = tempfile::tempdir().unwrap();
        let lock = WorkerLock::new(dir.path().join("worker.lock"));
        let mut supervisor = WorkerSupervisor::new();
        assert!(!supervisor.is_alive());

        let spawned = supervisor
            .start(
                idle_processor(dir.path()),
                lock.clone(),
                Duration::from_millis(10),
            )
            .unwrap();
        assert!(spawned);
        assert!(supervisor.is_alive());

        // re-initialization within the same process must not double-spawn
        let spawned = supervisor
            .start(idle_processor(dir.path()), lock, Duration::from_millis(10))
            .unwrap();
        assert!(!spawned);
    }

    #[test]
    fn test_empty_pass_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        run_pass(&idle_processor(dir.path())).unwrap();
    }
}
