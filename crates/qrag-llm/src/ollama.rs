//! Ollama client for locally served models

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use qrag_core::{ChatPrompt, Error, LLMProvider, Result};

use crate::config::OllamaConfig;

/// Ollama completion client
///
/// The chat prompt is flattened to `Role: content` lines and sent to
/// `/api/generate` as a single non-streamed completion.
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_ctx: usize,
    num_predict: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a new Ollama client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env()?)
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn run(&self, prompt: &ChatPrompt, logging: bool) -> Result<String> {
        let settings = &self.config.settings;
        let request_body = GenerateRequest {
            model: &settings.model,
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                num_ctx: settings.context_size,
                num_predict: settings.max_output_tokens,
                temperature: settings.temperature,
            },
        };

        let url = format!("{}/api/generate", self.config.host.trim_end_matches('/'));
        debug!(url = %url, model = %settings.model, "sending generate request");

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::LLMProvider(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        if logging {
            info!("Message: {}", prompt);
            info!("Response: {}", generated.response);
        }

        Ok(generated.response)
    }

    fn model_id(&self) -> &str {
        &self.config.settings.model
    }

    fn max_tokens(&self) -> usize {
        self.config.settings.context_size
    }

    fn max_output_tokens(&self) -> usize {
        self.config.settings.max_output_tokens
    }
}
