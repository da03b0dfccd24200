//! Error taxonomy for the harness.
//!
//! Per-case failures are [`GenerationError`] values carried inside results;
//! they never unwind the run. [`ProbeError`] covers everything else.

use serde::{Deserialize, Serialize};

/// Why a single query produced no usable text.
///
/// Returned by [`crate::ModelClient::query`] in place of generated text. The
/// harness records it on the case and scores the case as incorrect (or
/// neutral for the memory/reasoning family).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationError {
    #[error("timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("transport error: {detail}")]
    Transport { detail: String },

    #[error("backend returned status {status}: {body}")]
    BackendStatus { status: u16, body: String },

    #[error("backend returned an empty response")]
    EmptyResponse,

    #[error("malformed backend response: {detail}")]
    Malformed { detail: String },

    #[error("query cancelled before completion")]
    Cancelled,

    /// The client panicked while answering; the case is kept as an error.
    #[error("model client panicked: {detail}")]
    Panicked { detail: String },
}

impl GenerationError {
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            detail: detail.into(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed {
            detail: detail.into(),
        }
    }
}

/// Harness-level errors.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("model unavailable: {model}: {reason}")]
    ModelUnavailable { model: String, reason: String },

    #[error("unknown task family: {0}")]
    UnknownFamily(String),

    #[error("unknown perturbation tag: {0}")]
    UnknownPerturbation(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, ProbeError>;
