use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single pipeline stage.
///
/// Variants fall into three kinds: external tool/API failures, filesystem
/// failures, and schema/parse failures. The orchestrator uses
/// [`StageError::is_transient`] to decide whether a hosted-API call is worth
/// retrying.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("{tool} failed for {path}: {reason}")]
    Tool {
        tool: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("API request failed with status {status}: {body}")]
    ApiStatus { status: u16, body: String },

    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No usable font found for word cloud rendering")]
    FontNotFound,

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected API response shape: {reason}")]
    Schema { reason: String },
}

impl StageError {
    /// Whether retrying the operation could plausibly succeed.
    ///
    /// Network-level failures, timeouts, rate limits, and server errors are
    /// transient. Client errors, schema violations, and local filesystem
    /// failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            StageError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            StageError::ApiStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_rate_limits_are_transient() {
        let rate_limited = StageError::ApiStatus {
            status: 429,
            body: String::new(),
        };
        let server_error = StageError::ApiStatus {
            status: 503,
            body: String::new(),
        };
        assert!(rate_limited.is_transient());
        assert!(server_error.is_transient());
    }

    #[test]
    fn client_and_local_errors_are_permanent() {
        let bad_request = StageError::ApiStatus {
            status: 400,
            body: String::new(),
        };
        let schema = StageError::Schema {
            reason: "missing field".into(),
        };
        let missing_key = StageError::MissingApiKey {
            env_var: "OPENAI_API_KEY".into(),
        };
        assert!(!bad_request.is_transient());
        assert!(!schema.is_transient());
        assert!(!missing_key.is_transient());
        assert!(!StageError::FontNotFound.is_transient());
    }
}
