//! Model client and embedding adapters for QRAG
//!
//! This crate provides the OpenAI (including Azure-hosted deployments) and Ollama
//! implementations of the `LLMProvider` trait, the embedding providers behind
//! `EmbeddingModel`, and the environment configuration that selects between them.

mod config;
mod embeddings;
mod factory;
mod ollama;
mod openai;

#[cfg(test)]
mod tests;

pub use config::{
    AzureDeployment, ClientConfig, ClientKind, EmbeddingConfig, EmbeddingKind, ModelSettings,
    OllamaConfig, OpenAIConfig,
};
pub use embeddings::{HashingEmbeddings, OllamaEmbeddings, OpenAIEmbeddings};
pub use factory::{build_client, build_embedding_model};
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

// Re-export core types for convenience
pub use qrag_core::{ChatPrompt, EmbeddingModel, Error, LLMProvider, Result};
