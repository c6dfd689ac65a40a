//! RAG orchestrator for QRAG
//!
//! This crate provides `RAGAgent`, which assembles context from chunk and question
//! similarity searches, generates answers through an `LLMProvider`, and grows the
//! question graph from known answers.

mod agent;
mod prompts;


pub use agent::{
    CHUNK_INDEX_NAME, HAS_ANSWER, QUESTION_INDEX_NAME, QuestionInfo, RAGAgent, construct_context,
};
pub use prompts::answer_with_context_prompt;

// Re-export core types for convenience
pub use qrag_core::{
    Chunk, EmbeddingModel, Error, GraphStore, LLMProvider, Node, Passage, Question, Result,
};
pub use qrag_graph::GraphDatabase;
