//! S3 blob storage client.
//!
//! This crate provides:
//! - Streaming download of large video blobs to local files
//! - Buffered upload of small artifacts (audio, subtitles)
//! - Presigned GET URL generation for the transcription provider

pub mod client;
pub mod error;

pub use client::{BlobClient, BlobConfig};
pub use error::{StorageError, StorageResult};
