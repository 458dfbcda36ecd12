use serde::{Deserialize, Serialize};

/// Typed view of a stored transcript. The transcript JSON on disk is the
/// full verbose API response; fields not modeled here are preserved in the
/// file but ignored by downstream stages.
#[derive(Debug, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// The six summary fields the language model must produce, exactly.
///
/// Deserialization rejects unknown fields so that an off-schema model
/// response surfaces as a parse failure rather than passing through
/// silently.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryFields {
    pub page_summary: String,
    pub paragraph_summary: String,
    pub sentence_summary: String,
    pub topics: Vec<String>,
    pub keywords: Vec<String>,
    pub pull_quotes: Vec<String>,
}

/// Provenance of a summary: everything needed to reproduce the model call.
#[derive(Debug, Serialize, Deserialize)]
pub struct LlmDetails {
    pub model: String,
    pub temperature: f32,
    pub system_prompt: String,
    pub output_json_schema: serde_json::Value,
    pub input_file: String,
}

/// The summaries artifact written to `<stem>.summaries.json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryDoc {
    #[serde(flatten)]
    pub fields: SummaryFields,
    pub llm_details: LlmDetails,
}
