//! In-memory graph store

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use qrag_core::{
    Error, GraphStore, Metadata, NeighbourhoodMatch, Node, Passage, Result, SimilarNode,
    SimilarityMetric, VectorIndexSpec,
};

use crate::cypher::{RESERVED_PROPERTIES, quote_identifier};

type NodeKey = (String, String);

struct StoredNode {
    metadata: Metadata,
    embedding: Option<Vec<f32>>,
}

struct Edge {
    root: NodeKey,
    label: String,
    rel: NodeKey,
}

#[derive(Default)]
struct GraphState {
    nodes: HashMap<NodeKey, StoredNode>,
    edges: Vec<Edge>,
    indexes: HashMap<String, VectorIndexSpec>,
}

/// Local in-memory property graph with Neo4j-compatible semantics
///
/// Scores follow Neo4j's vector index normalisation so thresholds carry over
/// between backends: cosine maps to `(1 + cos) / 2`, euclidean to `1 / (1 + d²)`.
#[derive(Default)]
pub struct MemoryGraphStore {
    state: RwLock<GraphState>,
}

fn key(node: &Node) -> NodeKey {
    (node.type_label.clone(), node.id.clone())
}

/// Neo4j property rule: a scalar, or a list of scalars of one kind
fn is_property_value(value: &Value) -> bool {
    match value {
        Value::Bool(_) | Value::Number(_) | Value::String(_) => true,
        Value::Array(items) => {
            let kind = |v: &Value| match v {
                Value::Bool(_) => Some(0),
                Value::Number(_) => Some(1),
                Value::String(_) => Some(2),
                _ => None,
            };
            let first = items.first().map(kind);
            items.iter().all(|item| kind(item).is_some() && Some(kind(item)) == first)
        }
        Value::Null | Value::Object(_) => false,
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> Error {
    Error::GraphStore(format!("Lock error: {}", e))
}

impl MemoryGraphStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nodes
    pub fn node_count(&self) -> Result<usize> {
        Ok(self.state.read().map_err(lock_error)?.nodes.len())
    }

    /// Number of `root -[label]-> rel` edges
    pub fn relationship_count(&self, root: &Node, rel: &Node, label: &str) -> Result<usize> {
        let state = self.state.read().map_err(lock_error)?;
        let (root, rel) = (key(root), key(rel));
        Ok(state
            .edges
            .iter()
            .filter(|edge| edge.root == root && edge.rel == rel && edge.label == label)
            .count())
    }

    /// The stored embedding of a node, if any
    pub fn embedding_of(&self, node: &Node) -> Result<Option<Vec<f32>>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .nodes
            .get(&key(node))
            .and_then(|stored| stored.embedding.clone()))
    }

    /// All declared vector indexes
    pub fn vector_indexes(&self) -> Result<Vec<VectorIndexSpec>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.indexes.values().cloned().collect())
    }

    fn similarity(metric: SimilarityMetric, a: &[f32], b: &[f32]) -> f32 {
        match metric {
            SimilarityMetric::Cosine => {
                let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

                let cosine = if norm_a == 0.0 || norm_b == 0.0 {
                    0.0
                } else {
                    dot_product / (norm_a * norm_b)
                };
                ((1.0 + cosine) / 2.0).clamp(0.0, 1.0)
            }
            SimilarityMetric::Euclidean => {
                let squared: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
                1.0 / (1.0 + squared)
            }
        }
    }

    fn passage(key: &NodeKey, metadata: &Metadata) -> Passage {
        let string = |name: &str| metadata.get(name).and_then(Value::as_str).map(str::to_string);
        Passage {
            id: key.1.clone(),
            text: string("text").unwrap_or_default(),
            header: string("header"),
        }
    }

    /// Rank the index's nodes against `embedding`, best first
    fn rank(
        state: &GraphState,
        index_name: &str,
        top_k: usize,
        embedding: &[f32],
    ) -> Result<Vec<(NodeKey, SimilarNode)>> {
        let spec = state.indexes.get(index_name).ok_or_else(|| {
            Error::GraphStore(format!("There is no such vector schema index: {}", index_name))
        })?;

        if embedding.len() != spec.dimension {
            return Err(Error::GraphStore(format!(
                "Index query vector has {} dimensions, but indexed vectors have {}",
                embedding.len(),
                spec.dimension
            )));
        }

        let mut ranked: Vec<(NodeKey, SimilarNode)> = state
            .nodes
            .iter()
            .filter(|(key, _)| key.0 == spec.node_type)
            .filter_map(|(key, stored)| {
                let vector = stored.embedding.as_ref()?;
                (vector.len() == spec.dimension).then(|| {
                    let score = Self::similarity(spec.similarity_metric, embedding, vector);
                    (
                        key.clone(),
                        SimilarNode {
                            passage: Self::passage(key, &stored.metadata),
                            score,
                        },
                    )
                })
            })
            .collect();

        ranked.sort_by(|(a_key, a), (b_key, b)| {
            b.score.total_cmp(&a.score).then_with(|| a_key.cmp(b_key))
        });
        ranked.truncate(top_k);

        Ok(ranked)
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn merge_node(&self, node: &Node) -> Result<()> {
        quote_identifier(&node.type_label)?;
        let mut state = self.state.write().map_err(lock_error)?;

        let node_key = key(node);
        if state.nodes.contains_key(&node_key) {
            return Ok(());
        }

        let mut metadata = Metadata::new();
        for (name, value) in &node.metadata {
            if RESERVED_PROPERTIES.contains(&name.as_str()) || value.is_null() {
                continue;
            }
            if !is_property_value(value) {
                return Err(Error::GraphStore(format!(
                    "Property values can only be of primitive types or arrays thereof: {:?}",
                    name
                )));
            }
            metadata.insert(name.clone(), value.clone());
        }

        state.nodes.insert(
            node_key,
            StoredNode {
                metadata,
                embedding: None,
            },
        );

        Ok(())
    }

    async fn merge_relationship(&self, root: &Node, rel: &Node, label: &str) -> Result<()> {
        quote_identifier(label)?;
        let mut state = self.state.write().map_err(lock_error)?;
        let (root, rel) = (key(root), key(rel));

        if !state.nodes.contains_key(&root) || !state.nodes.contains_key(&rel) {
            debug!(?root, ?rel, "relationship endpoint missing, nothing merged");
            return Ok(());
        }

        let exists = state
            .edges
            .iter()
            .any(|edge| edge.root == root && edge.rel == rel && edge.label == label);
        if !exists {
            state.edges.push(Edge {
                root,
                label: label.to_string(),
                rel,
            });
        }

        Ok(())
    }

    async fn create_vector_index(&self, spec: &VectorIndexSpec) -> Result<()> {
        quote_identifier(&spec.index_name)?;
        quote_identifier(&spec.node_type)?;
        let mut state = self.state.write().map_err(lock_error)?;
        state
            .indexes
            .entry(spec.index_name.clone())
            .or_insert_with(|| spec.clone());
        Ok(())
    }

    async fn set_embedding_if_absent(&self, node: &Node, embedding: &[f32]) -> Result<bool> {
        let mut state = self.state.write().map_err(lock_error)?;
        match state.nodes.get_mut(&key(node)) {
            Some(stored) if stored.embedding.is_none() => {
                stored.embedding = Some(embedding.to_vec());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn query_vector_index(
        &self,
        index_name: &str,
        top_k: usize,
        embedding: &[f32],
    ) -> Result<Vec<SimilarNode>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(Self::rank(&state, index_name, top_k, embedding)?
            .into_iter()
            .map(|(_, similar)| similar)
            .collect())
    }

    async fn query_vector_index_neighbours(
        &self,
        index_name: &str,
        relationship: &str,
        top_k: usize,
        embedding: &[f32],
    ) -> Result<Vec<NeighbourhoodMatch>> {
        quote_identifier(relationship)?;
        let state = self.state.read().map_err(lock_error)?;

        let matches = Self::rank(&state, index_name, top_k, embedding)?
            .into_iter()
            .filter_map(|(matched, similar)| {
                let neighbours: Vec<Passage> = state
                    .edges
                    .iter()
                    .filter(|edge| edge.root == matched && edge.label == relationship)
                    .filter_map(|edge| {
                        state
                            .nodes
                            .get(&edge.rel)
                            .map(|stored| Self::passage(&edge.rel, &stored.metadata))
                    })
                    .collect();

                (!neighbours.is_empty()).then_some(NeighbourhoodMatch {
                    node: similar,
                    neighbours,
                })
            })
            .collect();

        Ok(matches)
    }

    async fn find_node(&self, type_label: &str, id: &str) -> Result<Option<Node>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .nodes
            .get(&(type_label.to_string(), id.to_string()))
            .map(|stored| Node::new(id, type_label, stored.metadata.clone())))
    }
}
