//! Transcription provider selection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use subgen_storage::BlobClient;

use crate::assemblyai::AssemblyAiTranscriber;
use crate::error::{TranscribeError, TranscribeResult};
use crate::mock::MockTranscriber;
use crate::Transcriber;

/// Which speech-to-text backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    AssemblyAi,
    Mock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::AssemblyAi => "assemblyai",
            ProviderKind::Mock => "mock",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = TranscribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assemblyai" => Ok(ProviderKind::AssemblyAi),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(TranscribeError::UnknownProvider(other.to_string())),
        }
    }
}

/// Construct the configured transcriber.
///
/// The real provider needs an API key; the mock ignores one.
pub fn build_transcriber(
    kind: ProviderKind,
    blob: BlobClient,
    api_key: Option<String>,
) -> TranscribeResult<Arc<dyn Transcriber>> {
    match kind {
        ProviderKind::AssemblyAi => {
            let api_key = api_key.ok_or_else(|| {
                TranscribeError::config_error(
                    "ASSEMBLYAI_API_KEY required for the assemblyai provider",
                )
            })?;
            Ok(Arc::new(AssemblyAiTranscriber::new(api_key, blob)))
        }
        ProviderKind::Mock => Ok(Arc::new(MockTranscriber::new())),
    }
}
