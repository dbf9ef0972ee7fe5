//! Subtitle pipeline worker binary.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use subgen_coord::keys::{SEMAPHORE_AI, SEMAPHORE_GLOBAL};
use subgen_coord::{CoordStore, DistributedSemaphore, JobStateWriter};
use subgen_storage::BlobClient;
use subgen_transcribe::build_transcriber;
use subgen_worker::{JobPipeline, RetryController, Worker, WorkerConfig};

/// Emit JSON log lines when `LOG_FORMAT=json`, a compact human-readable
/// layer otherwise. `RUST_LOG` overrides the `info` default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() {
    // reqwest and the AWS SDK both want a process-level TLS provider.
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("install rustls crypto provider");

    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting subgen-worker");

    // Fail fast on incomplete configuration.
    let config = match WorkerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        provider = %config.provider,
        global_slots = config.max_global_concurrency,
        ai_slots = config.max_ai_concurrency,
        max_retries = config.max_retries,
        tmp_root = %config.tmp_root.display(),
        "Worker configured"
    );

    let store = match CoordStore::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create coordination store client: {}", e);
            std::process::exit(1);
        }
    };

    let blob = match BlobClient::from_env() {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to create blob store client: {}", e);
            std::process::exit(1);
        }
    };

    let transcriber = match build_transcriber(
        config.provider,
        blob.clone(),
        config.assemblyai_api_key.clone(),
    ) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to build transcription client: {}", e);
            std::process::exit(1);
        }
    };

    let global_semaphore = DistributedSemaphore::new(
        store.clone(),
        SEMAPHORE_GLOBAL,
        config.max_global_concurrency,
    );
    let ai_semaphore =
        DistributedSemaphore::new(store.clone(), SEMAPHORE_AI, config.max_ai_concurrency);

    // Replace the token lists wholesale. Workers booting at the same moment
    // race this refill; the first writer wins for all practical purposes.
    if let Err(e) = global_semaphore.init().await {
        error!("Failed to initialize global semaphore: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = ai_semaphore.init().await {
        error!("Failed to initialize AI semaphore: {}", e);
        std::process::exit(1);
    }

    let state = JobStateWriter::new(store.clone());
    let retry = RetryController::new(
        store.clone(),
        state.clone(),
        config.max_retries,
        config.initial_backoff,
    );
    let pipeline = Arc::new(JobPipeline::new(
        store.clone(),
        state,
        blob,
        transcriber,
        ai_semaphore,
        retry,
        config.tmp_root.clone(),
    ));

    // Periodic queue-depth log line for fleet observability.
    {
        let store = store.clone();
        let interval = config.snapshot_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match store.queue_depths().await {
                    Ok(depths) => info!(
                        high = depths.high,
                        low = depths.low,
                        dlq = depths.dlq,
                        processing = depths.processing,
                        "Queue depths"
                    ),
                    Err(e) => warn!(error = %e, "Failed to read queue depths"),
                }
            }
        });
    }

    let worker = Arc::new(Worker::new(
        store,
        global_semaphore,
        pipeline,
        config.store_error_backoff,
    ));

    // Setup signal handler
    {
        let worker = Arc::clone(&worker);
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            worker.shutdown();
        });
    }

    if let Err(e) = worker.run().await {
        error!("Worker error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
