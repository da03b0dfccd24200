//! `provider:model` strings from the command line and the clients they
//! resolve to.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use memprobe_core::{ModelClient, SimulatedModel, TaskSuite};
use tracing::debug;

use crate::error::BackendError;
use crate::ollama::{normalize_host, OllamaClient, OllamaConfig, DEFAULT_OLLAMA_HOST};
use crate::openai::{OpenAiClient, OpenAiConfig, DEFAULT_OPENAI_BASE_URL};
use crate::presets::{find_preset, ModelPreset};

/// Default address of a local OpenAI-compatible server.
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:8000/v1";

/// A parsed model selector
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSpec {
    /// `openai:<model>`
    OpenAi { model: String },
    /// `ollama:<model>`
    Ollama { model: String },
    /// `local:<preset>` or a bare preset key
    Local { preset: &'static ModelPreset },
    /// `sim:<name>`
    Simulated { name: String },
}

impl FromStr for ModelSpec {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((provider, rest)) = s.split_once(':') else {
            let preset = find_preset(s).ok_or_else(|| BackendError::UnknownPreset(s.to_string()))?;
            return Ok(ModelSpec::Local { preset });
        };

        let rest = rest.trim();
        if rest.is_empty() {
            return Err(BackendError::UnknownProvider(s.to_string()));
        }

        match provider.to_ascii_lowercase().as_str() {
            "openai" => Ok(ModelSpec::OpenAi {
                model: rest.to_string(),
            }),
            "ollama" => Ok(ModelSpec::Ollama {
                model: rest.to_string(),
            }),
            "local" => {
                let preset =
                    find_preset(rest).ok_or_else(|| BackendError::UnknownPreset(rest.to_string()))?;
                Ok(ModelSpec::Local { preset })
            }
            "sim" => Ok(ModelSpec::Simulated {
                name: rest.to_string(),
            }),
            // `qwen2.5:0.5b` style tags without a provider are not presets
            _ => Err(BackendError::UnknownProvider(provider.to_string())),
        }
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSpec::OpenAi { model } => write!(f, "openai:{}", model),
            ModelSpec::Ollama { model } => write!(f, "ollama:{}", model),
            ModelSpec::Local { preset } => write!(f, "local:{}", preset.key),
            ModelSpec::Simulated { name } => write!(f, "sim:{}", name),
        }
    }
}

/// Endpoints and credentials shared by every client built in one run
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub ollama_host: String,
    pub local_base_url: String,
    /// Seed for simulated models
    pub seed: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_api_key: None,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            local_base_url: DEFAULT_LOCAL_BASE_URL.to_string(),
            seed: 42,
        }
    }
}

impl BackendSettings {
    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OLLAMA_HOST` and
    /// `MEMPROBE_LOCAL_BASE_URL`.
    pub fn from_env(seed: u64) -> Self {
        let openai = OpenAiConfig::from_env(String::new());
        let ollama = OllamaConfig::from_env(String::new());
        Self {
            openai_base_url: openai.base_url,
            openai_api_key: openai.api_key,
            ollama_host: ollama.base_url,
            local_base_url: std::env::var("MEMPROBE_LOCAL_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_LOCAL_BASE_URL.to_string()),
            seed,
        }
    }
}

/// Construct the client a [`ModelSpec`] names.
///
/// Simulated models are keyed with the suite's expected answers so their
/// logic-puzzle replies can be scored.
pub fn build_client(
    spec: &ModelSpec,
    settings: &BackendSettings,
    suite: &TaskSuite,
) -> Result<Arc<dyn ModelClient>, BackendError> {
    debug!(spec = %spec, "building model client");
    let client: Arc<dyn ModelClient> = match spec {
        ModelSpec::OpenAi { model } => {
            if settings.openai_api_key.is_none() {
                return Err(BackendError::MissingApiKey(format!("openai-{}", model)));
            }
            Arc::new(OpenAiClient::new(OpenAiConfig {
                base_url: settings.openai_base_url.clone(),
                api_key: settings.openai_api_key.clone(),
                model: model.clone(),
            })?)
        }
        ModelSpec::Ollama { model } => Arc::new(OllamaClient::new(OllamaConfig {
            base_url: normalize_host(&settings.ollama_host),
            model: model.clone(),
        })?),
        ModelSpec::Local { preset } => Arc::new(
            OpenAiClient::new(OpenAiConfig {
                base_url: settings.local_base_url.clone(),
                api_key: None,
                model: preset.upstream.to_string(),
            })?
            .with_name(preset.key),
        ),
        ModelSpec::Simulated { name } => Arc::new(
            SimulatedModel::new(format!("sim-{}", name), settings.seed)
                .with_answer_key(suite.answer_key()),
        ),
    };
    Ok(client)
}

/// Parse and build every spec, failing on the first bad one.
pub fn build_clients(
    specs: &[String],
    settings: &BackendSettings,
    suite: &TaskSuite,
) -> Result<Vec<Arc<dyn ModelClient>>, BackendError> {
    specs
        .iter()
        .map(|raw| {
            let spec: ModelSpec = raw.parse()?;
            build_client(&spec, settings, suite)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use memprobe_core::SuiteConfig;

    #[test]
    fn test_parse_providers() {
        assert_eq!(
            "openai:gpt-4o-mini".parse::<ModelSpec>().expect("openai"),
            ModelSpec::OpenAi {
                model: "gpt-4o-mini".to_string()
            }
        );
        // Ollama tags keep their own colon
        assert_eq!(
            "ollama:llama3.2:3b".parse::<ModelSpec>().expect("ollama"),
            ModelSpec::Ollama {
                model: "llama3.2:3b".to_string()
            }
        );
        assert_eq!(
            "sim:mock-large".parse::<ModelSpec>().expect("sim"),
            ModelSpec::Simulated {
                name: "mock-large".to_string()
            }
        );
    }

    #[test]
    fn test_bare_preset_means_local() {
        let bare: ModelSpec = "qwen-1.5b".parse().expect("bare");
        let explicit: ModelSpec = "local:qwen-1.5b".parse().expect("local");
        assert_eq!(bare, explicit);
        assert_eq!(bare.to_string(), "local:qwen-1.5b");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "anthropic:claude".parse::<ModelSpec>(),
            Err(BackendError::UnknownProvider(_))
        ));
        assert!(matches!(
            "local:gpt-5".parse::<ModelSpec>(),
            Err(BackendError::UnknownPreset(_))
        ));
        assert!(matches!(
            "not-a-preset".parse::<ModelSpec>(),
            Err(BackendError::UnknownPreset(_))
        ));
        assert!("openai:".parse::<ModelSpec>().is_err());
    }

    #[test]
    fn test_openai_requires_key() {
        let suite = TaskSuite::build(&SuiteConfig::default());
        let spec: ModelSpec = "openai:gpt-4o".parse().expect("spec");
        let err = build_client(&spec, &BackendSettings::default(), &suite)
            .err()
            .expect("missing key");
        assert!(matches!(err, BackendError::MissingApiKey(_)));
    }

    #[test]
    fn test_build_client_names() {
        let suite = TaskSuite::build(&SuiteConfig::default());
        let settings = BackendSettings {
            openai_api_key: Some("sk-test".to_string()),
            ..BackendSettings::default()
        };
        let specs: Vec<String> = ["openai:gpt-4o", "ollama:llama3.2", "phi-3.5", "sim:qwen"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let names: Vec<String> = build_clients(&specs, &settings, &suite)
            .expect("clients")
            .iter()
            .map(|c| c.model_name())
            .collect();
        assert_eq!(names, ["openai-gpt-4o", "ollama-llama3.2", "phi-3.5", "sim-qwen"]);
    }
}
