//! OpenAI-compatible chat completions backend.
//!
//! Talks to the hosted API as well as local servers that expose the same
//! `/chat/completions` route (vLLM, llama.cpp server, LM Studio).

use async_trait::async_trait;
use memprobe_core::{GenerationError, ModelClient, QueryOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{request_error, truncate_body, BackendError};
use crate::USER_AGENT;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiConfig {
    pub base_url: String,
    /// Sent as a bearer token when set; local servers usually need none.
    pub api_key: Option<String>,
    pub model: String,
}

impl OpenAiConfig {
    /// Hosted API settings from `OPENAI_API_KEY` and `OPENAI_BASE_URL`.
    pub fn from_env(model: impl Into<String>) -> Self {
        Self {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Extract `choices[0].message.content` from a response body.
pub fn parse_chat_response(body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse = serde_json::from_str(body).map_err(BackendError::from)?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::malformed("response has no choices"))?;
    let text = choice.message.content.unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text.to_string())
}

/// Chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    name: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let name = format!("openai-{}", config.model);
        Ok(Self { config, name, http })
    }

    /// Hosted API client; fails without an API key.
    pub fn hosted(model: impl Into<String>) -> Result<Self, BackendError> {
        let config = OpenAiConfig::from_env(model);
        if config.api_key.is_none() {
            return Err(BackendError::MissingApiKey(format!("openai-{}", config.model)));
        }
        Self::new(config)
    }

    /// Override the report name (local presets report under their key).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn query(&self, prompt: &str, options: &QueryOptions) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let mut request = self
            .http
            .post(self.config.endpoint())
            .timeout(options.timeout)
            .json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| request_error(e, options.timeout))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| request_error(e, options.timeout))?;
        debug!(model = %self.name, status = status.as_u16(), bytes = text.len(), "chat completion");

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: truncate_body(&text),
            }
            .into());
        }
        parse_chat_response(&text)
    }

    fn model_name(&self) -> String {
        self.name.clone()
    }
}
