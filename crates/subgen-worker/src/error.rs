//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Transcription service returned no segments.")]
    EmptyTranscript,

    #[error("Job record is missing field: {0}")]
    MissingJobField(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Coordination error: {0}")]
    Coord(#[from] subgen_coord::CoordError),

    #[error("Storage error: {0}")]
    Storage(#[from] subgen_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] subgen_media::MediaError),

    #[error("Transcription error: {0}")]
    Transcribe(#[from] subgen_transcribe::TranscribeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
