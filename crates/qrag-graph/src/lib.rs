//! Graph store adapter for QRAG
//!
//! This crate provides the `GraphDatabase` adapter (node/relationship upsert, vector
//! indexing, similarity search with neighbour expansion) over two `GraphStore`
//! backends: Neo4j through its HTTP transactional API, and an in-memory graph.

mod config;
mod cypher;
mod database;
mod memory;
mod neo4j;

#[cfg(test)]
mod tests;

pub use config::Neo4jConfig;
pub use cypher::{Statement, quote_identifier};
pub use database::GraphDatabase;
pub use memory::MemoryGraphStore;
pub use neo4j::Neo4jGraphStore;

// Re-export core types for convenience
pub use qrag_core::{
    Chunk, EmbeddingModel, Error, GraphStore, Metadata, NeighbourhoodMatch, Node, Passage,
    Question, Result, SimilarNode, SimilarityMetric, VectorIndexSpec,
};
