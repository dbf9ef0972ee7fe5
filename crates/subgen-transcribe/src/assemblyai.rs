//! AssemblyAI transcription client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use subgen_models::Segment;
use subgen_storage::BlobClient;
use tracing::{debug, info, warn};

use crate::error::{TranscribeError, TranscribeResult};
use crate::Transcriber;

const API_BASE: &str = "https://api.assemblyai.com/v2";

/// Interval between status polls.
const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Lifetime of the presigned audio URL handed to the provider.
const PRESIGN_EXPIRY: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    audio_url: &'a str,
}

/// Transcript resource as returned by both submit and poll.
#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptResource {
    pub id: String,
    pub status: String,
    pub text: Option<String>,
    pub error: Option<String>,
    /// Audio length in seconds.
    pub audio_duration: Option<f64>,
    pub utterances: Option<Vec<Utterance>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Utterance {
    pub text: String,
    /// Start offset in milliseconds.
    pub start: u64,
    /// End offset in milliseconds.
    pub end: u64,
}

/// Speech-to-text via the AssemblyAI REST API.
///
/// The audio blob is never shipped directly: the provider fetches it through
/// a short-lived presigned URL.
pub struct AssemblyAiTranscriber {
    http: Client,
    api_key: String,
    base_url: String,
    blob: BlobClient,
    poll_interval: Duration,
}

impl AssemblyAiTranscriber {
    pub fn new(api_key: impl Into<String>, blob: BlobClient) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: API_BASE.to_string(),
            blob,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Point the client at a different API endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn submit(&self, audio_url: &str) -> TranscribeResult<TranscriptResource> {
        let resource: TranscriptResource = self
            .http
            .post(format!("{}/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&SubmitRequest { audio_url })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resource)
    }

    async fn poll(&self, transcript_id: &str) -> TranscribeResult<TranscriptResource> {
        let resource: TranscriptResource = self
            .http
            .get(format!("{}/transcript/{}", self.base_url, transcript_id))
            .header("authorization", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resource)
    }
}

#[async_trait]
impl Transcriber for AssemblyAiTranscriber {
    async fn transcribe(&self, audio_key: &str) -> TranscribeResult<Vec<Segment>> {
        let audio_url = self.blob.presign_get(audio_key, PRESIGN_EXPIRY).await?;

        let submitted = self.submit(&audio_url).await?;
        info!(
            audio_key = %audio_key,
            transcript_id = %submitted.id,
            "Submitted transcription job"
        );

        loop {
            tokio::time::sleep(self.poll_interval).await;

            // A failed poll round-trip is not a verdict on the transcript;
            // keep polling and let the provider's status decide.
            let resource = match self.poll(&submitted.id).await {
                Ok(resource) => resource,
                Err(e) => {
                    warn!(transcript_id = %submitted.id, error = %e, "Transcript poll failed");
                    continue;
                }
            };

            match resource.status.as_str() {
                "completed" => {
                    let segments = segments_from_resource(resource);
                    info!(
                        transcript_id = %submitted.id,
                        segments = segments.len(),
                        "Transcription completed"
                    );
                    return Ok(segments);
                }
                "error" => {
                    let message = resource
                        .error
                        .unwrap_or_else(|| "transcription failed without detail".to_string());
                    return Err(TranscribeError::provider(message));
                }
                status => {
                    debug!(transcript_id = %submitted.id, status = %status, "Transcript pending");
                }
            }
        }
    }
}

/// Map a completed transcript resource onto segments.
///
/// Utterances map 1:1 when present; otherwise the whole text becomes one
/// segment spanning the audio duration.
pub(crate) fn segments_from_resource(resource: TranscriptResource) -> Vec<Segment> {
    if let Some(utterances) = resource.utterances.filter(|u| !u.is_empty()) {
        return utterances
            .into_iter()
            .map(|u| Segment::new(u.text, u.start, u.end))
            .collect();
    }

    let text = resource.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Vec::new();
    }

    let duration_ms = resource
        .audio_duration
        .map(|secs| (secs * 1000.0).round() as u64)
        .unwrap_or(0);
    vec![Segment::new(text, 0, duration_ms)]
}
