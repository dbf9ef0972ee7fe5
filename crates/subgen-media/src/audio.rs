//! Audio track extraction.

use std::path::Path;

use tracing::info;

use crate::command::FfmpegCommand;
use crate::error::MediaResult;

/// Extract the audio track of a local video file as MP3.
///
/// Variable bitrate at quality level 2, video stream dropped. The extractor
/// holds no state between calls.
pub async fn extract_audio(video_path: &Path, audio_path: &Path) -> MediaResult<()> {
    info!(
        video = %video_path.display(),
        audio = %audio_path.display(),
        "Extracting audio track"
    );

    FfmpegCommand::new(video_path, audio_path)
        .no_video()
        .audio_codec("libmp3lame")
        .audio_quality(2)
        .run()
        .await
}
