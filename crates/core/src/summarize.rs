use std::path::{Path, PathBuf};

use serde_json::json;
use tokio::fs;
use tracing::{debug, info};

use crate::{
    config::{ApiConfig, SUMMARIZE_TIMEOUT, SummarizerConfig},
    error::{Result, StageError},
    retry::with_retries,
    types::{LlmDetails, SummaryDoc, SummaryFields, Transcript},
    workdir::{WorkDir, discard_partial, incomplete_path},
};

/// Summarize a transcript through the hosted language model.
///
/// The model is held to a strict output schema; a response that does not
/// parse into the six required fields is a schema failure, not a retryable
/// network failure. The written document carries an `llm_details` provenance
/// block recording the exact model call.
pub async fn summarize_transcript(
    transcript_json: &Path,
    work: &WorkDir,
    api: &ApiConfig,
    config: &SummarizerConfig,
) -> Result<PathBuf> {
    let output_path = work.summaries_path();
    if output_path.exists() {
        debug!(path = %output_path.display(), "summary already exists, skipping");
        return Ok(output_path);
    }

    info!(transcript = %transcript_json.display(), "summarizing transcript");

    let content = fs::read_to_string(transcript_json).await?;
    let transcript: Transcript = serde_json::from_str(&content)?;

    let (fields, model) = with_retries("summarization", || {
        request_summary(&transcript.text, api, config)
    })
    .await?;

    let doc = SummaryDoc {
        fields,
        llm_details: LlmDetails {
            model,
            temperature: config.temperature,
            system_prompt: config.system_prompt.clone(),
            output_json_schema: config.response_format.clone(),
            input_file: transcript_json.display().to_string(),
        },
    };

    let tmp_path = incomplete_path(&output_path);
    if let Err(e) = fs::write(&tmp_path, serde_json::to_string_pretty(&doc)?).await {
        discard_partial(&tmp_path).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp_path, &output_path).await {
        discard_partial(&tmp_path).await;
        return Err(e.into());
    }

    info!(path = %output_path.display(), "summary saved");
    Ok(output_path)
}

/// Returns the parsed summary fields and the model id the API reports
/// having used.
async fn request_summary(
    transcript_text: &str,
    api: &ApiConfig,
    config: &SummarizerConfig,
) -> Result<(SummaryFields, String)> {
    let client = reqwest::Client::builder()
        .timeout(SUMMARIZE_TIMEOUT)
        .build()?;
    let response = client
        .post(api.chat_completions_url())
        .bearer_auth(&api.api_key)
        .json(&json!({
            "model": config.model,
            "temperature": config.temperature,
            "messages": [
                { "role": "system", "content": config.system_prompt },
                { "role": "user", "content": format!("Transcript:\n\n{transcript_text}") },
            ],
            "response_format": config.response_format,
        }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(StageError::ApiStatus {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    let body: serde_json::Value = response.json().await?;
    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| StageError::Schema {
            reason: format!("chat completion has no message content: {body}"),
        })?;

    let fields: SummaryFields =
        serde_json::from_str(content).map_err(|e| StageError::Schema {
            reason: format!("summary content violates the output schema: {e}"),
        })?;

    let model = body["model"]
        .as_str()
        .unwrap_or(&config.model)
        .to_string();

    Ok((fields, model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn existing_summary_short_circuits_without_reading_transcript() {
        let tmp = tempfile::tempdir().unwrap();
        let video = tmp.path().join("clip.mp4");
        std::fs::write(&video, b"").unwrap();
        let work = WorkDir::for_video(&video).unwrap();
        work.ensure_dir().await.unwrap();
        std::fs::write(work.summaries_path(), b"{}").unwrap();

        let api = ApiConfig {
            base_url: "http://127.0.0.1:1/v1".to_string(),
            api_key: "test-key".to_string(),
        };
        let missing_transcript = work.transcript_json_path();
        let result = summarize_transcript(
            &missing_transcript,
            &work,
            &api,
            &SummarizerConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(result, work.summaries_path());
    }

    #[test]
    fn conforming_content_parses_into_summary_fields() {
        let content = serde_json::json!({
            "page_summary": "# Notes\n- point",
            "paragraph_summary": "A paragraph.",
            "sentence_summary": "A sentence.",
            "topics": ["a"],
            "keywords": ["b"],
            "pull_quotes": ["c"]
        })
        .to_string();
        assert!(serde_json::from_str::<SummaryFields>(&content).is_ok());
    }
}
