//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use subgen_transcribe::ProviderKind;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum retry attempts before dead-lettering
    pub max_retries: u32,
    /// Base delay for retry backoff (doubles each retry)
    pub initial_backoff: Duration,
    /// Fleet-wide worker slot count
    pub max_global_concurrency: usize,
    /// Fleet-wide transcription slot count
    pub max_ai_concurrency: usize,
    /// Root directory for per-job scratch space
    pub tmp_root: PathBuf,
    /// Speech-to-text backend
    pub provider: ProviderKind,
    /// API key for the real provider
    pub assemblyai_api_key: Option<String>,
    /// Backoff after a coordination-store failure in the loop
    pub store_error_backoff: Duration,
    /// Interval between queue-depth snapshot log lines
    pub snapshot_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(2000),
            max_global_concurrency: 5,
            max_ai_concurrency: 2,
            tmp_root: PathBuf::from("/tmp/subgen"),
            provider: ProviderKind::Mock,
            assemblyai_api_key: None,
            store_error_backoff: Duration::from_secs(5),
            snapshot_interval: Duration::from_secs(2),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// `TRANSCRIPTION_PROVIDER` is required; `ASSEMBLYAI_API_KEY` is required
    /// when it selects the real provider. Tunables fall back to the design
    /// defaults.
    pub fn from_env() -> WorkerResult<Self> {
        let provider: ProviderKind = std::env::var("TRANSCRIPTION_PROVIDER")
            .map_err(|_| WorkerError::config_error("TRANSCRIPTION_PROVIDER not set"))?
            .parse()?;

        let assemblyai_api_key = std::env::var("ASSEMBLYAI_API_KEY").ok();
        if provider == ProviderKind::AssemblyAi && assemblyai_api_key.is_none() {
            return Err(WorkerError::config_error(
                "ASSEMBLYAI_API_KEY not set (required for the assemblyai provider)",
            ));
        }

        let defaults = Self::default();
        Ok(Self {
            max_retries: env_parsed("MAX_RETRIES").unwrap_or(defaults.max_retries),
            initial_backoff: env_parsed("INITIAL_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_backoff),
            max_global_concurrency: env_parsed("MAX_GLOBAL_CONCURRENCY")
                .unwrap_or(defaults.max_global_concurrency),
            max_ai_concurrency: env_parsed("MAX_AI_CONCURRENCY")
                .unwrap_or(defaults.max_ai_concurrency),
            tmp_root: std::env::var("TMP_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.tmp_root),
            provider,
            assemblyai_api_key,
            store_error_backoff: defaults.store_error_backoff,
            snapshot_interval: defaults.snapshot_interval,
        })
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
