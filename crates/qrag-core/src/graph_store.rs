//! Graph store trait and retrieval types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Node, Result};

/// A retrieved node projected to what context rendering needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub text: String,
    pub header: Option<String>,
}

/// A node returned by a vector index query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarNode {
    #[serde(flatten)]
    pub passage: Passage,
    pub score: f32,
}

/// A vector index match together with its one-hop neighbours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighbourhoodMatch {
    #[serde(flatten)]
    pub node: SimilarNode,
    pub neighbours: Vec<Passage>,
}

/// Similarity function backing a vector index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Euclidean,
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::Euclidean => "euclidean",
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(SimilarityMetric::Cosine),
            "euclidean" => Ok(SimilarityMetric::Euclidean),
            other => Err(Error::InvalidInput(format!(
                "unknown similarity metric: {}",
                other
            ))),
        }
    }
}

/// Declaration of a vector index over a node type's `embedding` property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndexSpec {
    pub index_name: String,
    pub node_type: String,
    pub dimension: usize,
    pub similarity_metric: SimilarityMetric,
}

/// Trait for property-graph backends (e.g., Neo4j, in-memory)
///
/// Nodes are matched by `(type_label, id)`. Implementations must pass every value
/// as data, never as query text.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create the node if absent; existing nodes keep their properties
    async fn merge_node(&self, node: &Node) -> Result<()>;

    /// Create at most one `root -[label]-> rel` edge; no-op if either node is missing
    async fn merge_relationship(&self, root: &Node, rel: &Node, label: &str) -> Result<()>;

    /// Declare a vector index unless it already exists
    async fn create_vector_index(&self, spec: &VectorIndexSpec) -> Result<()>;

    /// Store `embedding` on the node unless it already has one.
    /// Returns whether a vector was written.
    async fn set_embedding_if_absent(&self, node: &Node, embedding: &[f32]) -> Result<bool>;

    /// Top-k nodes of the index, in descending score order
    async fn query_vector_index(
        &self,
        index_name: &str,
        top_k: usize,
        embedding: &[f32],
    ) -> Result<Vec<SimilarNode>>;

    /// Top-k nodes of the index that have at least one `relationship` neighbour
    async fn query_vector_index_neighbours(
        &self,
        index_name: &str,
        relationship: &str,
        top_k: usize,
        embedding: &[f32],
    ) -> Result<Vec<NeighbourhoodMatch>>;

    /// Point lookup by type and id
    async fn find_node(&self, type_label: &str, id: &str) -> Result<Option<Node>>;
}

#[async_trait]
impl<T: GraphStore + ?Sized> GraphStore for Box<T> {
    async fn merge_node(&self, node: &Node) -> Result<()> {
        (**self).merge_node(node).await
    }

    async fn merge_relationship(&self, root: &Node, rel: &Node, label: &str) -> Result<()> {
        (**self).merge_relationship(root, rel, label).await
    }

    async fn create_vector_index(&self, spec: &VectorIndexSpec) -> Result<()> {
        (**self).create_vector_index(spec).await
    }

    async fn set_embedding_if_absent(&self, node: &Node, embedding: &[f32]) -> Result<bool> {
        (**self).set_embedding_if_absent(node, embedding).await
    }

    async fn query_vector_index(
        &self,
        index_name: &str,
        top_k: usize,
        embedding: &[f32],
    ) -> Result<Vec<SimilarNode>> {
        (**self).query_vector_index(index_name, top_k, embedding).await
    }

    async fn query_vector_index_neighbours(
        &self,
        index_name: &str,
        relationship: &str,
        top_k: usize,
        embedding: &[f32],
    ) -> Result<Vec<NeighbourhoodMatch>> {
        (**self)
            .query_vector_index_neighbours(index_name, relationship, top_k, embedding)
            .await
    }

    async fn find_node(&self, type_label: &str, id: &str) -> Result<Option<Node>> {
        (**self).find_node(type_label, id).await
    }
}
