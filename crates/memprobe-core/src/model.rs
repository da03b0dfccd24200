//! The capability interface every model backend implements.
//!
//! The harness only ever calls [`ModelClient::query`] and
//! [`ModelClient::model_name`]; quantization, device placement, endpoints and
//! credentials stay behind the implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{GenerationError, ProbeError, Result};

/// Prompt sent by [`check_availability`].
pub const AVAILABILITY_PROMPT: &str = "What is 2+2?";

/// Generation options. Every field has a default; backends ignore what they
/// cannot honour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Maximum number of new tokens to generate.
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    /// Upper bound on a single query; enforced by backends and the harness.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.1,
            top_p: 0.9,
            top_k: 50,
            timeout: Duration::from_secs(30),
        }
    }
}

impl QueryOptions {
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Anything that can turn a prompt into text.
///
/// Implementations must not panic on backend failure: transport errors,
/// timeouts and non-success statuses come back as [`GenerationError`].
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn query(
        &self,
        prompt: &str,
        options: &QueryOptions,
    ) -> std::result::Result<String, GenerationError>;

    /// Stable identifier used as the grouping key in every report.
    fn model_name(&self) -> String;
}

/// Query `client` once with a trivial prompt.
///
/// Returns [`ProbeError::ModelUnavailable`] when the backend errors, times
/// out, or answers with blank text.
pub async fn check_availability(client: &dyn ModelClient, timeout: Duration) -> Result<()> {
    let name = client.model_name();
    let options = QueryOptions::default()
        .with_max_tokens(50)
        .with_timeout(timeout);

    let outcome = match tokio::time::timeout(timeout, client.query(AVAILABILITY_PROMPT, &options)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(GenerationError::Timeout {
            after_ms: timeout.as_millis() as u64,
        }),
    };

    match outcome {
        Ok(text) if !text.trim().is_empty() => {
            debug!(model = %name, "availability probe answered");
            Ok(())
        }
        Ok(_) => Err(ProbeError::ModelUnavailable {
            model: name,
            reason: "empty response to availability probe".to_string(),
        }),
        Err(e) => Err(ProbeError::ModelUnavailable {
            model: name,
            reason: e.to_string(),
        }),
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("timeout must be a non-negative number of seconds"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(std::result::Result<String, GenerationError>);

    #[async_trait]
    impl ModelClient for Fixed {
        async fn query(
            &self,
            _prompt: &str,
            _options: &QueryOptions,
        ) -> std::result::Result<String, GenerationError> {
            self.0.clone()
        }

        fn model_name(&self) -> String {
            "fixed".to_string()
        }
    }

    struct Stalled;

    #[async_trait]
    impl ModelClient for Stalled {
        async fn query(
            &self,
            _prompt: &str,
            _options: &QueryOptions,
        ) -> std::result::Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }

        fn model_name(&self) -> String {
            "stalled".to_string()
        }
    }

    #[test]
    fn test_query_options_defaults() {
        let options = QueryOptions::default();
        assert_eq!(options.max_tokens, 512);
        assert_eq!(options.temperature, 0.1);
        assert_eq!(options.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_query_options_serde_roundtrip() {
        let options = QueryOptions::default()
            .with_max_tokens(200)
            .with_timeout(Duration::from_millis(1500));
        let json = serde_json::to_string(&options).expect("serialize");
        let back: QueryOptions = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, options);
    }

    #[tokio::test]
    async fn test_available_model_passes_probe() {
        let client = Fixed(Ok("4".to_string()));
        assert!(check_availability(&client, Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_blank_answer_is_unavailable() {
        let client = Fixed(Ok("   ".to_string()));
        let err = check_availability(&client, Duration::from_secs(1))
            .await
            .expect_err("blank answer");
        assert!(matches!(err, ProbeError::ModelUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_backend_error_is_unavailable() {
        let client = Fixed(Err(GenerationError::transport("connection refused")));
        let err = check_availability(&client, Duration::from_secs(1))
            .await
            .expect_err("transport error");
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_model_times_out() {
        let err = check_availability(&Stalled, Duration::from_secs(5))
            .await
            .expect_err("stalled");
        assert!(err.to_string().contains("timed out"));
    }
}
