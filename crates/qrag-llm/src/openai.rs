//! OpenAI chat client (api.openai.com, compatible endpoints and Azure deployments)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use qrag_core::{ChatPrompt, ChatRole, Error, LLMProvider, Result};

use crate::config::OpenAIConfig;

/// OpenAI chat completions client
pub struct OpenAIClient {
    config: OpenAIConfig,
    client: Client,
}

#[derive(Serialize)]
struct ChatMessageBody<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessageBody<'a>>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::Human => "user",
    }
}

impl OpenAIClient {
    /// Create a new OpenAI client from configuration
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a new OpenAI client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env()?)
    }

    fn completions_url(&self) -> String {
        match &self.config.azure {
            Some(azure) => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                azure.endpoint.trim_end_matches('/'),
                azure.deployment,
                azure.api_version
            ),
            None => format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn run(&self, prompt: &ChatPrompt, logging: bool) -> Result<String> {
        let settings = &self.config.settings;
        let request_body = ChatCompletionRequest {
            // Azure routes by deployment and ignores the model field
            model: self
                .config
                .azure
                .is_none()
                .then_some(settings.model.as_str()),
            messages: prompt
                .messages
                .iter()
                .map(|m| ChatMessageBody {
                    role: role_name(m.role),
                    content: &m.content,
                })
                .collect(),
            max_tokens: settings.max_output_tokens,
            temperature: settings.temperature,
        };

        let url = self.completions_url();
        debug!(url = %url, model = %settings.model, "sending chat completion request");

        let request = self.client.post(&url).json(&request_body);
        let request = match self.config.azure {
            Some(_) => request.header("api-key", &self.config.api_key),
            None => request.bearer_auth(&self.config.api_key),
        };

        let response = request
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
                "OpenAI API request failed with status {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::LLMProvider("OpenAI response contained no message".to_string()))?;

        if logging {
            info!("Message: {}", prompt);
            info!("Response: {}", text);
        }

        Ok(text)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AzureDeployment;
    use qrag_core::{ChatMessage, ChatPrompt};
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prompt() -> ChatPrompt {
        ChatPrompt {
            messages: vec![
                ChatMessage { role: ChatRole::System, content: String::new() },
                ChatMessage { role: ChatRole::Human, content: "### Question\nHi".to_string() },
            ],
        }
    }

    fn completion(text: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
        })
    }

    #[tokio::test]
    async fn test_run_openai() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": ""},
                    {"role": "user", "content": "### Question\nHi"},
                ],
                "max_tokens": 512,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hello")))
            .expect(1)
            .mount(&server)
            .await;

        let config = OpenAIConfig::new("sk-test", "gpt-4o-mini")
            .with_base_url(format!("{}/v1", server.uri()));
        let client = OpenAIClient::new(config).unwrap();

        assert_eq!(client.run(&prompt(), true).await.unwrap(), "Hello");
        assert_eq!(client.model_id(), "gpt-4o-mini");
        assert_eq!(client.max_tokens(), 8192);
    }

    #[tokio::test]
    async fn test_run_azure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt4o/chat/completions"))
            .and(query_param("api-version", "2024-06-01"))
            .and(header("api-key", "azure-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("From Azure")))
            .expect(1)
            .mount(&server)
            .await;

        let config = OpenAIConfig::new("azure-key", "gpt-4o").with_azure(AzureDeployment {
            endpoint: format!("{}/", server.uri()),
            deployment: "gpt4o".to_string(),
            api_version: "2024-06-01".to_string(),
        });
        let client = OpenAIClient::new(config).unwrap();

        assert_eq!(client.run(&prompt(), false).await.unwrap(), "From Azure");
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let config = OpenAIConfig::new("sk-test", "gpt-4o-mini").with_base_url(server.uri());
        let client = OpenAIClient::new(config).unwrap();

        let err = client.run(&prompt(), false).await.unwrap_err();
        assert!(matches!(err, Error::LLMProvider(ref message)
            if message.contains("429") && message.contains("rate limited")));
    }
}
