use std::path::{Path, PathBuf};

use reqwest::multipart;
use tokio::fs;
use tracing::{debug, info};

use crate::{
    config::{ApiConfig, TRANSCRIBE_MODEL, TRANSCRIBE_TIMEOUT},
    error::{Result, StageError},
    retry::with_retries,
    workdir::{WorkDir, discard_partial, incomplete_path},
};

/// Transcribe compressed audio through the hosted speech-to-text API.
///
/// Produces two artifacts: the full verbose API response as JSON and the
/// plain transcript text. The stage is only complete when both exist, so the
/// cache check requires both and a failure removes whichever was written.
pub async fn extract_transcript(audio: &Path, work: &WorkDir, api: &ApiConfig) -> Result<PathBuf> {
    let json_path = work.transcript_json_path();
    let txt_path = work.transcript_txt_path();

    if json_path.exists() && txt_path.exists() {
        debug!(path = %json_path.display(), "transcript files already exist, skipping");
        return Ok(json_path);
    }

    info!(audio = %audio.display(), "transcribing audio");

    let response = with_retries("transcription", || request_transcript(audio, api)).await?;

    let text = response["text"].as_str().ok_or_else(|| StageError::Schema {
        reason: "transcription response has no `text` field".into(),
    })?;

    if let Err(e) = write_transcript_files(&json_path, &txt_path, &response, text).await {
        for path in [&json_path, &txt_path] {
            discard_partial(&incomplete_path(path)).await;
            discard_partial(path).await;
        }
        return Err(e);
    }

    info!(json = %json_path.display(), txt = %txt_path.display(), "transcription saved");
    Ok(json_path)
}

async fn request_transcript(audio: &Path, api: &ApiConfig) -> Result<serde_json::Value> {
    let file_name = audio
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio.mp3".to_string());
    let bytes = fs::read(audio).await?;

    let part = multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("audio/mpeg")?;
    let form = multipart::Form::new()
        .text("model", TRANSCRIBE_MODEL)
        .text("response_format", "verbose_json")
        .part("file", part);

    let client = reqwest::Client::builder()
        .timeout(TRANSCRIBE_TIMEOUT)
        .build()?;
    let response = client
        .post(api.transcriptions_url())
        .bearer_auth(&api.api_key)
        .multipart(form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(StageError::ApiStatus {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    Ok(response.json().await?)
}

/// Write both transcript files via `.incomplete` temps, renaming only after
/// both writes succeed.
async fn write_transcript_files(
    json_path: &Path,
    txt_path: &Path,
    response: &serde_json::Value,
    text: &str,
) -> Result<()> {
    let json_tmp = incomplete_path(json_path);
    let txt_tmp = incomplete_path(txt_path);

    fs::write(&json_tmp, serde_json::to_string_pretty(response)?).await?;
    fs::write(&txt_tmp, text).await?;

    fs::rename(&json_tmp, json_path).await?;
    fs::rename(&txt_tmp, txt_path).await?;
    Ok(())
}
