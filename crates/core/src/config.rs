use std::time::Duration;

use serde_json::json;

use crate::error::{Result, StageError};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const API_BASE_ENV: &str = "VIDSUM_API_BASE";
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

pub const TRANSCRIBE_MODEL: &str = "whisper-1";
pub const SUMMARIZE_MODEL: &str = "gpt-4o-2024-08-06";

/// Hosted transcription uploads the whole audio file; give it more room
/// than the summarization call.
pub const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(600);
pub const SUMMARIZE_TIMEOUT: Duration = Duration::from_secs(300);

/// Credentials and endpoint for the hosted speech/language API, resolved
/// once at process start.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| StageError::MissingApiKey {
            env_var: API_KEY_ENV.to_string(),
        })?;
        let base_url = std::env::var(API_BASE_ENV)
            .unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(ApiConfig { base_url, api_key })
    }

    pub fn transcriptions_url(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Immutable summarizer settings, passed into the summarize stage at call
/// time rather than read from globals.
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub model: String,
    pub temperature: f32,
    pub system_prompt: String,
    /// The `response_format` object sent with the chat completion; the model
    /// must conform its output to the embedded strict JSON schema.
    pub response_format: serde_json::Value,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        SummarizerConfig {
            model: SUMMARIZE_MODEL.to_string(),
            temperature: 0.0,
            system_prompt: SYSTEM_PROMPT.to_string(),
            response_format: summary_response_format(),
        }
    }
}

const SYSTEM_PROMPT: &str = "\
You are an expert summarizer and analyst. Your task is to read the attached \
transcript and provide various summaries.

More details can be found in the output schema.
";

/// Strict output schema for the summarizer. Field descriptions double as
/// prompt text; the hosted API enforces the shape.
fn summary_response_format() -> serde_json::Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "transcript_summary",
            "schema": {
                "type": "object",
                "properties": {
                    "page_summary": {
                        "type": "string",
                        "description": "A concise but detailed short-form notes document summarizing the transcript, keeping the length of these notes between half a page and two pages. Uses a standard markdown document format (starting with a # heading), prioritizing concise bulleted lists of notes over full paragraphs to get more complete coverage. Does not include quotes, keywords, or topic lists, only a simple, structured summary of the content."
                    },
                    "paragraph_summary": {
                        "type": "string",
                        "description": "A concise summary of the transcript, at most a single paragraph."
                    },
                    "sentence_summary": {
                        "type": "string",
                        "description": "An extremely concise summary of the transcript, at most a single sentence."
                    },
                    "topics": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "An array of the major topics discussed as extracted from the transcript. These should be contained to specifically what content was covered to communicate to users what topics are discussed in the video."
                    },
                    "keywords": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "An array of field-appropriate keywords or search terms extracted from the transcript. These should be connective, helping users explore additional relevant information in the same vein as the content discussed. Prioritize generality with these keywords, like you might see in a research paper in an established domain."
                    },
                    "pull_quotes": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "An array of significant, memorable, or punchy quotes (best if all three!) that communicate core ideas or illustrate points, extracted VERBATIM* from the transcript. *(with the exception that the audio was highly compressed, so adjusting for obvious errors in transcription is acceptable)."
                    }
                },
                "required": ["page_summary", "paragraph_summary", "sentence_summary", "topics", "keywords", "pull_quotes"],
                "additionalProperties": false
            },
            "strict": true
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarizer_defaults_are_deterministic() {
        let cfg = SummarizerConfig::default();
        assert_eq!(cfg.temperature, 0.0);
        assert_eq!(cfg.model, SUMMARIZE_MODEL);
    }

    #[test]
    fn response_format_is_strict_and_complete() {
        let cfg = SummarizerConfig::default();
        let schema = &cfg.response_format["json_schema"];
        assert_eq!(schema["strict"], serde_json::json!(true));
        let required = schema["schema"]["required"].as_array().unwrap();
        assert_eq!(required.len(), 6);
        assert_eq!(
            schema["schema"]["additionalProperties"],
            serde_json::json!(false)
        );
    }
}
