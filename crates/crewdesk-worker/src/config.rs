//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Instance data directory (database, lock file)
    pub data_dir: PathBuf,
    /// Job database path
    pub database_path: PathBuf,
    /// Well-known advisory lock path shared by every process on the host
    pub lock_path: PathBuf,
    /// Root of per-tenant artifact directories
    pub receipts_dir: PathBuf,
    /// Sleep between polling passes
    pub poll_interval: Duration,
    /// Speech-to-text command (resolved on PATH at startup)
    pub transcribe_command: String,
    /// Extra arguments passed before the audio path
    pub transcribe_args: Vec<String>,
    /// Ollama endpoint for task extraction; None disables the extension
    pub ollama_url: Option<String>,
    /// Ollama model name
    pub ollama_model: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("instance");
        Self {
            database_path: data_dir.join("crewdesk.db"),
            lock_path: data_dir.join("gpu_worker.lock"),
            receipts_dir: data_dir.join("receipts"),
            data_dir,
            poll_interval: Duration::from_secs(2),
            transcribe_command: "whisper-cli".to_string(),
            transcribe_args: Vec::new(),
            ollama_url: None,
            ollama_model: "llama3".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let data_dir = PathBuf::from(
            std::env::var("CREWDESK_DATA_DIR").unwrap_or_else(|_| "instance".to_string()),
        );
        Self {
            database_path: std::env::var("CREWDESK_DATABASE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("crewdesk.db")),
            lock_path: std::env::var("CREWDESK_LOCK_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("gpu_worker.lock")),
            receipts_dir: std::env::var("CREWDESK_RECEIPTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("receipts")),
            data_dir,
            poll_interval: Duration::from_secs(
                std::env::var("CREWDESK_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            ),
            transcribe_command: std::env::var("CREWDESK_TRANSCRIBE_CMD")
                .unwrap_or_else(|_| "whisper-cli".to_string()),
            transcribe_args: std::env::var("CREWDESK_TRANSCRIBE_ARGS")
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            ollama_url: std::env::var("CREWDESK_OLLAMA_URL").ok().filter(|s| !s.is_empty()),
            ollama_model: std::env::var("CREWDESK_OLLAMA_MODEL")
                .unwrap_or_else(|_| "llama3".to_string()),
        }
    }
}
