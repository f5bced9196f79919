use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::GenerationError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Sampling options forwarded verbatim as the request's `options` object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            num_predict: 2000,
        }
    }
}

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    options: GenerationOptions,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerationOptions,
}

/// A successful `/api/generate` exchange.
#[derive(Debug, Clone)]
pub struct RawGeneration {
    /// Full response body, kept for usage accounting
    pub body: Value,
    /// The model's text (`response` field), trimmed
    pub response_text: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            options: GenerationOptions::default(),
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Liveness probe: true only when `/api/tags` answers 200.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                debug!(url = %url, error = %e, "Ollama probe failed");
                false
            }
        }
    }

    /// Single non-streaming generation call. No retries.
    pub async fn generate(&self, prompt: &str) -> Result<RawGeneration, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: &self.options,
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        let response_text = body
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();

        Ok(RawGeneration {
            body,
            response_text,
        })
    }
}
