//! Background transcription worker binary.

use std::fs;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crewdesk_engine::CommandEngine;
use crewdesk_media::HtmlReportRenderer;
use crewdesk_store::JobStore;
use crewdesk_worker::{
    ArtifactLayout, OllamaExtractor, Processor, TaskExtractor, WorkerConfig, WorkerLock,
    WorkerSupervisor,
};

fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crewdesk=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting crewdesk-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Err(e) = fs::create_dir_all(&config.data_dir) {
        error!("Failed to create data directory: {}", e);
        std::process::exit(1);
    }

    let store = match JobStore::open(&config.database_path) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open job store: {}", e);
            std::process::exit(1);
        }
    };

    let engine = match CommandEngine::new(&config.transcribe_command, config.transcribe_args.clone())
    {
        Ok(e) => e,
        Err(e) => {
            error!("Failed to set up transcription engine: {}", e);
            std::process::exit(1);
        }
    };

    let extractor: Option<Box<dyn TaskExtractor>> = match &config.ollama_url {
        Some(url) => match OllamaExtractor::new(url, config.ollama_model.clone()) {
            Ok(e) => Some(Box::new(e)),
            Err(e) => {
                error!("Failed to set up task extractor: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            info!("Task extraction disabled (CREWDESK_OLLAMA_URL not set)");
            None
        }
    };

    let processor = Processor::new(
        store,
        Box::new(engine),
        Box::new(HtmlReportRenderer),
        extractor,
        ArtifactLayout::new(config.receipts_dir.clone()),
    );

    let lock = WorkerLock::new(config.lock_path.clone());
    let mut supervisor = WorkerSupervisor::new();
    if let Err(e) = supervisor.start(processor, lock, config.poll_interval) {
        error!("Failed to start worker loop: {}", e);
        std::process::exit(1);
    }

    // The loop runs until the process is stopped.
    supervisor.join();
    error!("Worker loop exited unexpectedly");
    std::process::exit(1);
}
