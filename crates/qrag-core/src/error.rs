//! Error types for QRAG

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the QRAG system
#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required metadata key: '{0}'")]
    MissingMetadata(String),

    #[error("Node not found: ({type_label} {{id: {id}}})")]
    NodeNotFound { type_label: String, id: String },

    #[error("Graph store error: {0}")]
    GraphStore(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
