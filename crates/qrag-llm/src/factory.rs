//! Runtime selection of clients and embedding models

use tracing::info;

use qrag_core::{EmbeddingModel, Error, LLMProvider, Result};

use crate::config::{ClientConfig, EmbeddingConfig, EmbeddingKind};
use crate::embeddings::{HashingEmbeddings, OllamaEmbeddings, OpenAIEmbeddings};
use crate::ollama::OllamaClient;
use crate::openai::OpenAIClient;

/// Build the LLM client described by the configuration
pub fn build_client(config: &ClientConfig) -> Result<Box<dyn LLMProvider>> {
    info!(client = %config.kind(), "building llm client");

    Ok(match config {
        ClientConfig::OpenAI(openai) => Box::new(OpenAIClient::new(openai.clone())?),
        ClientConfig::Ollama(ollama) => Box::new(OllamaClient::new(ollama.clone())?),
    })
}

/// Build the embedding model described by the configuration
pub fn build_embedding_model(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingModel>> {
    info!(model = %config.model, dimension = config.dimension, "building embedding model");

    Ok(match config.kind {
        EmbeddingKind::Ollama => Box::new(OllamaEmbeddings::new(&config.endpoint, &config.model)?),
        EmbeddingKind::OpenAI => {
            let api_key = config.api_key.as_deref().ok_or_else(|| {
                Error::Configuration("OpenAI embeddings require an API key".to_string())
            })?;
            Box::new(OpenAIEmbeddings::new(api_key, &config.model, &config.endpoint)?)
        }
        EmbeddingKind::Hashing => Box::new(HashingEmbeddings::new(config.dimension)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OllamaConfig, OpenAIConfig};

    #[test]
    fn test_build_client_matches_config() {
        let client = build_client(&ClientConfig::Ollama(OllamaConfig::new(
            "http://localhost:11434",
            "llama3.1",
        )))
        .unwrap();
        assert_eq!(client.model_id(), "llama3.1");

        let client = build_client(&ClientConfig::OpenAI(OpenAIConfig::new("sk-test", "gpt-4o-mini"))).unwrap();
        assert_eq!(client.model_id(), "gpt-4o-mini");
        assert_eq!(client.max_output_tokens(), 512);
    }

    #[tokio::test]
    async fn test_build_hashing_model() {
        let model = build_embedding_model(&EmbeddingConfig::hashing(32).unwrap()).unwrap();
        assert_eq!(model.model_name(), "hashing-32");
        assert_eq!(model.embed_query("Peter").await.unwrap().len(), 32);
    }

    #[test]
    fn test_openai_embeddings_need_key() {
        let config = EmbeddingConfig {
            kind: EmbeddingKind::OpenAI,
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            endpoint: OpenAIConfig::DEFAULT_BASE_URL.to_string(),
            api_key: None,
        };
        assert!(matches!(build_embedding_model(&config), Err(Error::Configuration(_))));
    }
}
