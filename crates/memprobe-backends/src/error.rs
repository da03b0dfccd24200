//! Error types for memprobe-backends

use memprobe_core::GenerationError;
use thiserror::Error;

/// Errors raised while configuring or talking to a model backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// The hosted API needs a key and none was configured
    #[error("OPENAI_API_KEY is not set (required for {0})")]
    MissingApiKey(String),

    /// Model spec prefix is not one of openai, ollama, local, sim
    #[error("unknown provider '{0}' (expected openai, ollama, local or sim)")]
    UnknownProvider(String),

    /// Preset key not in the catalog
    #[error("unknown model preset '{0}'")]
    UnknownPreset(String),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status from the backend
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Body did not match the expected response shape
    #[error("could not decode backend response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

impl From<BackendError> for GenerationError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Status { status, body } => GenerationError::BackendStatus { status, body },
            BackendError::Decode(detail) => GenerationError::Malformed { detail },
            BackendError::Http(detail) => GenerationError::Transport { detail },
            other => GenerationError::transport(other.to_string()),
        }
    }
}

/// Map a failed request onto the per-case error taxonomy.
///
/// Elapsed request timeouts become [`GenerationError::Timeout`]; every other
/// transport problem (refused connection, DNS, TLS, reset) is `Transport`.
pub fn request_error(err: reqwest::Error, timeout: std::time::Duration) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout {
            after_ms: timeout.as_millis() as u64,
        }
    } else {
        GenerationError::from(BackendError::from(err))
    }
}

/// Longest backend error body kept in a result.
pub const MAX_ERROR_BODY: usize = 512;

pub(crate) fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_backend_status() {
        let err: GenerationError = BackendError::Status {
            status: 429,
            body: "rate limited".to_string(),
        }
        .into();
        assert_eq!(
            err,
            GenerationError::BackendStatus {
                status: 429,
                body: "rate limited".to_string()
            }
        );
    }

    #[test]
    fn test_decode_maps_to_malformed() {
        let err: GenerationError = BackendError::Decode("missing field".to_string()).into();
        assert!(matches!(err, GenerationError::Malformed { .. }));
    }

    #[test]
    fn test_config_errors_map_to_transport() {
        let err: GenerationError = BackendError::MissingApiKey("openai-gpt-4o".to_string()).into();
        match err {
            GenerationError::Transport { detail } => assert!(detail.contains("OPENAI_API_KEY")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("  short  "), "short");
        let long = "é".repeat(400);
        let cut = truncate_body(&long);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= MAX_ERROR_BODY + 3);
    }
}
