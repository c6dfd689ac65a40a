//! Snapshot tests for client configuration

#[cfg(test)]
mod snapshot_tests {
    use crate::{AzureDeployment, ClientConfig, EmbeddingConfig, OllamaConfig, OpenAIConfig};
    use insta::assert_json_snapshot;

    #[test]
    fn test_azure_config_snapshot_hides_key() {
        let config = ClientConfig::OpenAI(
            OpenAIConfig::new("secret-key", "gpt-4o").with_azure(AzureDeployment {
                endpoint: "https://example.openai.azure.com".to_string(),
                deployment: "gpt4o".to_string(),
                api_version: "2024-06-01".to_string(),
            }),
        );

        assert_json_snapshot!(config, @r#"
        {
          "client": "openai",
          "base_url": "https://api.openai.com/v1",
          "azure": {
            "endpoint": "https://example.openai.azure.com",
            "deployment": "gpt4o",
            "api_version": "2024-06-01"
          },
          "settings": {
            "model": "gpt-4o",
            "context_size": 8192,
            "max_output_tokens": 512,
            "temperature": null
          }
        }
        "#);
    }

    #[test]
    fn test_ollama_config_snapshot() {
        let config = ClientConfig::Ollama(OllamaConfig::new("http://localhost:11434", "llama3.1"));

        assert_json_snapshot!(config, @r#"
        {
          "client": "ollama",
          "host": "http://localhost:11434",
          "settings": {
            "model": "llama3.1",
            "context_size": 8192,
            "max_output_tokens": 512,
            "temperature": null
          }
        }
        "#);
    }

    #[test]
    fn test_hashing_embedding_config_snapshot() {
        assert_json_snapshot!(EmbeddingConfig::hashing(384).unwrap(), @r#"
        {
          "kind": "hashing",
          "model": "hashing-384",
          "dimension": 384,
          "endpoint": ""
        }
        "#);
    }
}
