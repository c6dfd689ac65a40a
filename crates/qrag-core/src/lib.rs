//! Core traits and types for QRAG
//!
//! This crate defines the node model and the capability-facing interfaces shared by
//! the rest of the system: graph stores, embedding models and LLM clients. Concrete
//! backends live in `qrag-graph` and `qrag-llm`, which keeps the orchestrator
//! test-friendly and lets every adapter be injected explicitly.

pub mod embedding;
pub mod error;
pub mod graph_store;
pub mod llm;
pub mod node;
pub mod prompt;

#[cfg(test)]
mod tests;

pub use embedding::EmbeddingModel;
pub use error::{Error, Result};
pub use graph_store::{
    GraphStore, NeighbourhoodMatch, Passage, SimilarNode, SimilarityMetric, VectorIndexSpec,
};
pub use llm::LLMProvider;
pub use node::{Chunk, Metadata, Node, Question};
pub use prompt::{ChatMessage, ChatPrompt, ChatRole, PromptTemplate};
