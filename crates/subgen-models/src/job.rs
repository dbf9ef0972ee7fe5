//! Job record types and the Redis hash field codec.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// Opaque job identifier.
///
/// Minted as a UUID by the submission boundary; workers treat it as an
/// arbitrary string popped off a queue.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Mint a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Submission priority. Immutable after job creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    High,
    #[default]
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Priority::High),
            "low" => Ok(Priority::Low),
            other => Err(ModelError::UnknownPriority(other.to_string())),
        }
    }
}

/// Job status as stored in the `status` field of the job hash.
///
/// Transitions are driven exclusively by workers: a job enters at `Queued`,
/// moves through the `Processing*` stages in order, and terminates at either
/// `Completed` or `FailedDlq`. Any processing stage may fall back to
/// `QueuedRetry`, from which the job re-enters the processing stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Queued,
    DownloadingVideo,
    ExtractingAudio,
    TranscribingAudio,
    Completed,
    QueuedRetry,
    FailedDlq,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::DownloadingVideo => "processing:downloading_video",
            JobStatus::ExtractingAudio => "processing:extracting_audio",
            JobStatus::TranscribingAudio => "processing:transcribing_audio",
            JobStatus::Completed => "completed",
            JobStatus::QueuedRetry => "queued:retry",
            JobStatus::FailedDlq => "failed:dlq",
        }
    }

    /// Terminal states are never left once entered.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::FailedDlq)
    }

    /// True for any of the in-flight processing stages.
    pub fn is_processing(&self) -> bool {
        matches!(
            self,
            JobStatus::DownloadingVideo | JobStatus::ExtractingAudio | JobStatus::TranscribingAudio
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing:downloading_video" => Ok(JobStatus::DownloadingVideo),
            "processing:extracting_audio" => Ok(JobStatus::ExtractingAudio),
            "processing:transcribing_audio" => Ok(JobStatus::TranscribingAudio),
            "completed" => Ok(JobStatus::Completed),
            "queued:retry" => Ok(JobStatus::QueuedRetry),
            "failed:dlq" => Ok(JobStatus::FailedDlq),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

/// One video-to-subtitle processing unit.
///
/// Stored as a flat string-to-string hash at `job:{id}`. Optional fields
/// (`audio_url`, `subtitle_url`, `error`) are absent from the hash until a
/// worker writes them.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub video_url: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub priority: Priority,
    pub audio_url: Option<String>,
    pub subtitle_url: Option<String>,
    pub retry_count: u32,
    pub error: Option<String>,
}

impl Job {
    /// Create a fresh job in the `Queued` state.
    pub fn new(video_url: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: JobId::new(),
            video_url: video_url.into(),
            status: JobStatus::Queued,
            created_at: Utc::now(),
            priority,
            audio_url: None,
            subtitle_url: None,
            retry_count: 0,
            error: None,
        }
    }

    /// Encode as hash field pairs. Absent optionals are omitted.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("id", self.id.to_string()),
            ("videoUrl", self.video_url.clone()),
            ("status", self.status.as_str().to_string()),
            ("createdAt", self.created_at.to_rfc3339()),
            ("priority", self.priority.as_str().to_string()),
            ("retryCount", self.retry_count.to_string()),
        ];
        if let Some(audio_url) = &self.audio_url {
            fields.push(("audioUrl", audio_url.clone()));
        }
        if let Some(subtitle_url) = &self.subtitle_url {
            fields.push(("subtitleUrl", subtitle_url.clone()));
        }
        if let Some(error) = &self.error {
            fields.push(("error", error.clone()));
        }
        fields
    }

    /// Decode from a full hash read.
    pub fn from_fields(fields: &HashMap<String, String>) -> ModelResult<Self> {
        let get = |name: &'static str| -> ModelResult<&String> {
            fields.get(name).ok_or(ModelError::MissingField(name))
        };

        let created_at = {
            let raw = get("createdAt")?;
            DateTime::parse_from_rfc3339(raw)
                .map_err(|_| ModelError::invalid_field("createdAt", raw.clone()))?
                .with_timezone(&Utc)
        };

        let retry_count = match fields.get("retryCount") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ModelError::invalid_field("retryCount", raw.clone()))?,
            None => 0,
        };

        Ok(Self {
            id: JobId::from(get("id")?.clone()),
            video_url: get("videoUrl")?.clone(),
            status: get("status")?.parse()?,
            created_at,
            priority: get("priority")?.parse()?,
            audio_url: fields.get("audioUrl").cloned(),
            subtitle_url: fields.get("subtitleUrl").cloned(),
            retry_count,
            error: fields.get("error").cloned(),
        })
    }
}
