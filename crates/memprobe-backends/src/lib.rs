//! HTTP model backends for memprobe
//!
//! Implementations of [`memprobe_core::ModelClient`] for OpenAI-compatible
//! chat completion servers and Ollama, the preset model catalog, and
//! `provider:model` parsing used by the CLI.

pub mod error;
pub mod model_spec;
pub mod ollama;
pub mod openai;
pub mod presets;

pub use error::BackendError;
pub use model_spec::{build_client, build_clients, BackendSettings, ModelSpec};
pub use ollama::{OllamaClient, OllamaConfig};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use presets::{find_preset, ModelPreset, PRESETS};

/// User agent sent with every backend request.
pub const USER_AGENT: &str = concat!("memprobe/", env!("CARGO_PKG_VERSION"));
