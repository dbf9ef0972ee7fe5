//! Speech-to-text clients for the subtitle pipeline.
//!
//! This crate provides:
//! - The `Transcriber` capability interface
//! - The AssemblyAI-backed implementation (submit + poll)
//! - A scripted mock for tests and offline runs
//! - Provider selection from configuration

pub mod assemblyai;
pub mod error;
pub mod mock;
pub mod provider;

use async_trait::async_trait;
use subgen_models::Segment;

pub use assemblyai::AssemblyAiTranscriber;
pub use error::{TranscribeError, TranscribeResult};
pub use mock::MockTranscriber;
pub use provider::{build_transcriber, ProviderKind};

/// A speech-to-text backend.
///
/// Implementations take the blob key of an uploaded audio artifact and
/// return its transcript as ordered, timed segments. An empty segment list
/// is a valid return value; rejecting it is the pipeline's concern.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_key: &str) -> TranscribeResult<Vec<Segment>>;
}
