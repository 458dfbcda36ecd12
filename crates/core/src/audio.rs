use std::path::{Path, PathBuf};

use tokio::{fs, process::Command};
use tracing::{debug, info};

use crate::{
    error::{Result, StageError},
    workdir::{WorkDir, discard_partial, incomplete_path},
};

/// Extract the audio track from a video using ffmpeg.
///
/// Writes to a `.incomplete` path and renames on success, so the final name
/// only ever refers to a fully written file.
pub async fn extract_audio(video: &Path, work: &WorkDir) -> Result<PathBuf> {
    let output_path = work.audio_path();
    if output_path.exists() {
        debug!(path = %output_path.display(), "audio already extracted, skipping");
        return Ok(output_path);
    }

    info!(video = %video.display(), "extracting audio");
    let tmp_path = incomplete_path(&output_path);

    // ffmpeg infers the container from the extension; the .incomplete name
    // needs it pinned explicitly.
    let result = run_ffmpeg(
        video,
        &[
            "-vn",
            "-codec:a",
            "libmp3lame",
            "-q:a",
            "4",
            "-f",
            "mp3",
        ],
        &tmp_path,
    )
    .await;

    if let Err(e) = result {
        discard_partial(&tmp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&tmp_path, &output_path).await {
        discard_partial(&tmp_path).await;
        return Err(e.into());
    }
    Ok(output_path)
}

/// Re-encode extracted audio at a low bitrate to shrink the transcription
/// upload.
pub async fn compress_audio(audio: &Path, work: &WorkDir) -> Result<PathBuf> {
    let output_path = work.compressed_audio_path();
    if output_path.exists() {
        debug!(path = %output_path.display(), "compressed audio already exists, skipping");
        return Ok(output_path);
    }

    info!(audio = %audio.display(), "compressing audio to 32kbps mono");
    let tmp_path = incomplete_path(&output_path);

    let result = run_ffmpeg(
        audio,
        &[
            "-codec:a",
            "libmp3lame",
            "-b:a",
            "32k",
            "-ac",
            "1",
            "-f",
            "mp3",
        ],
        &tmp_path,
    )
    .await;

    if let Err(e) = result {
        discard_partial(&tmp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&tmp_path, &output_path).await {
        discard_partial(&tmp_path).await;
        return Err(e.into());
    }
    Ok(output_path)
}

async fn run_ffmpeg(input: &Path, codec_args: &[&str], output: &Path) -> Result<()> {
    let result = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(codec_args)
        .arg(output)
        .output()
        .await?;

    if !result.status.success() {
        return Err(StageError::Tool {
            tool: "ffmpeg",
            path: input.to_path_buf(),
            reason: String::from_utf8_lossy(&result.stderr).to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn existing_audio_short_circuits_without_running_ffmpeg() {
        let tmp = tempfile::tempdir().unwrap();
        // The "video" is not a real video; a cache hit must not touch it.
        let video = tmp.path().join("clip.mp4");
        std::fs::write(&video, b"not a video").unwrap();
        let work = WorkDir::for_video(&video).unwrap();
        work.ensure_dir().await.unwrap();
        std::fs::write(work.audio_path(), b"cached").unwrap();

        let result = extract_audio(&video, &work).await.unwrap();
        assert_eq!(result, work.audio_path());
        assert_eq!(std::fs::read(result).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn failed_extraction_leaves_no_output_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let video = tmp.path().join("clip.mp4");
        std::fs::write(&video, b"not a video").unwrap();
        let work = WorkDir::for_video(&video).unwrap();
        work.ensure_dir().await.unwrap();

        // ffmpeg rejects the garbage input (or is absent entirely); either
        // way the stage must fail and clean up after itself.
        let result = extract_audio(&video, &work).await;
        assert!(result.is_err());
        assert!(!work.audio_path().exists());
        assert!(!incomplete_path(&work.audio_path()).exists());
    }

    #[tokio::test]
    async fn existing_compressed_audio_short_circuits() {
        let tmp = tempfile::tempdir().unwrap();
        let video = tmp.path().join("clip.mp4");
        std::fs::write(&video, b"").unwrap();
        let work = WorkDir::for_video(&video).unwrap();
        work.ensure_dir().await.unwrap();
        std::fs::write(work.compressed_audio_path(), b"cached").unwrap();

        let missing_input = work.audio_path();
        let result = compress_audio(&missing_input, &work).await.unwrap();
        assert_eq!(result, work.compressed_audio_path());
    }
}
