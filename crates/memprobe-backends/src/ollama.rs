//! Ollama `/api/generate` backend.

use async_trait::async_trait;
use memprobe_core::{GenerationError, ModelClient, QueryOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{request_error, truncate_body, BackendError};
use crate::USER_AGENT;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Connection settings for an Ollama server
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

impl OllamaConfig {
    /// Settings from `OLLAMA_HOST`, which may omit the scheme.
    pub fn from_env(model: impl Into<String>) -> Self {
        let host =
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string());
        Self {
            base_url: normalize_host(&host),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

/// `localhost:11434` -> `http://localhost:11434`
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Extract the `response` field from a non-streaming generate body.
pub fn parse_generate_response(body: &str) -> Result<String, GenerationError> {
    let response: GenerateResponse = serde_json::from_str(body).map_err(BackendError::from)?;
    let text = response.response.trim();
    if text.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text.to_string())
}

/// Ollama client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn query(&self, prompt: &str, options: &QueryOptions) -> Result<String, GenerationError> {
        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: options.max_tokens,
                temperature: options.temperature,
                top_p: options.top_p,
                top_k: options.top_k,
            },
        };

        let response = self
            .http
            .post(self.config.endpoint())
            .timeout(options.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(e, options.timeout))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| request_error(e, options.timeout))?;
        debug!(model = %self.config.model, status = status.as_u16(), bytes = text.len(), "ollama generate");

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: truncate_body(&text),
            }
            .into());
        }
        parse_generate_response(&text)
    }

    fn model_name(&self) -> String {
        format!("ollama-{}", self.config.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("localhost:11434"), "http://localhost:11434");
        assert_eq!(normalize_host("https://gpu-box:443"), "https://gpu-box:443");
    }

    #[test]
    fn test_parse_generate_response() {
        let body = r#"{"model":"llama3.2","response":" The answer is 4. ","done":true}"#;
        assert_eq!(parse_generate_response(body).expect("parse"), "The answer is 4.");
    }

    #[test]
    fn test_blank_generate_response_is_empty() {
        let body = r#"{"model":"llama3.2","response":"","done":true}"#;
        assert_eq!(parse_generate_response(body), Err(GenerationError::EmptyResponse));
    }

    #[test]
    fn test_missing_response_field_is_malformed() {
        let err = parse_generate_response(r#"{"error":"model not found"}"#).expect_err("shape");
        assert!(matches!(err, GenerationError::Malformed { .. }));
    }

    #[test]
    fn test_request_body_shape() {
        let options = QueryOptions::default();
        let body = GenerateRequest {
            model: "llama3.2:3b",
            prompt: "What is 2+2?",
            stream: false,
            options: GenerateOptions {
                num_predict: options.max_tokens,
                temperature: options.temperature,
                top_p: options.top_p,
                top_k: options.top_k,
            },
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 512);
        assert_eq!(json["options"]["top_k"], 50);
    }

    #[test]
    fn test_model_name() {
        let client = OllamaClient::new(OllamaConfig {
            base_url: DEFAULT_OLLAMA_HOST.to_string(),
            model: "llama3.2:3b".to_string(),
        })
        .expect("client");
        assert_eq!(client.model_name(), "ollama-llama3.2:3b");
        assert_eq!(client.config().endpoint(), "http://localhost:11434/api/generate");
    }
}
