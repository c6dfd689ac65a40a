//! Graph database adapter: a graph store paired with an embedding model

use tracing::{debug, info};

use qrag_core::{
    EmbeddingModel, Error, GraphStore, NeighbourhoodMatch, Node, Result, SimilarNode,
    SimilarityMetric, VectorIndexSpec,
};

/// Graph database adapter
///
/// Owns one store connection and one embedding model; both are injected by the
/// caller. Each method is a single request against the store, errors are passed
/// through untouched.
pub struct GraphDatabase<S: GraphStore, E: EmbeddingModel> {
    store: S,
    embedding_model: E,
}

impl<S: GraphStore, E: EmbeddingModel> GraphDatabase<S, E> {
    /// Create a new adapter over a store and an embedding model
    pub fn new(store: S, embedding_model: E) -> Self {
        Self {
            store,
            embedding_model,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn embedding_model(&self) -> &E {
        &self.embedding_model
    }

    /// Add a node, matched by type label and id. Properties are only set on creation.
    pub async fn add_node(&self, node: &Node) -> Result<()> {
        debug!(id = %node.id, label = %node.type_label, "merging node");
        self.store.merge_node(node).await
    }

    /// Add a directed relationship from a root node to a rel node
    pub async fn add_relationship(&self, root_node: &Node, rel_node: &Node, relationship: &str) -> Result<()> {
        debug!(
            root = %root_node.id,
            rel = %rel_node.id,
            relationship,
            "merging relationship"
        );
        self.store
            .merge_relationship(root_node, rel_node, relationship)
            .await
    }

    /// Declare a vector index over a node type's embeddings; no-op if it exists
    pub async fn initiate_vector_indexing(
        &self,
        node_type: &str,
        index_name: &str,
        dimension: usize,
        similarity_metric: SimilarityMetric,
    ) -> Result<()> {
        if dimension == 0 {
            return Err(Error::InvalidInput(
                "vector index dimension must be positive".to_string(),
            ));
        }

        let spec = VectorIndexSpec {
            index_name: index_name.to_string(),
            node_type: node_type.to_string(),
            dimension,
            similarity_metric,
        };

        info!(index = index_name, node_type, dimension, metric = %similarity_metric, "declaring vector index");
        self.store.create_vector_index(&spec).await
    }

    /// Embed the node's `text` and store it, unless the node already has a vector.
    /// Returns whether a vector was written.
    pub async fn generate_vector_index(&self, node: &Node) -> Result<bool> {
        let text = node
            .text()
            .ok_or_else(|| Error::MissingMetadata("text".to_string()))?;

        let embedding = self.embedding_model.embed_query(text).await?;
        let written = self.store.set_embedding_if_absent(node, &embedding).await?;

        debug!(id = %node.id, label = %node.type_label, written, "embedding stored");
        Ok(written)
    }

    /// Retrieve nodes with text semantically similar to the query, keeping only
    /// those scoring at least `threshold`
    pub async fn retrieve_similar_nodes(
        &self,
        query: &str,
        top_k: usize,
        index_name: &str,
        threshold: f32,
    ) -> Result<Vec<SimilarNode>> {
        let query_embedding = self.embedding_model.embed_query(query).await?;

        let similar_nodes: Vec<SimilarNode> = self
            .store
            .query_vector_index(index_name, top_k, &query_embedding)
            .await?
            .into_iter()
            .filter(|node| node.score >= threshold)
            .collect();

        debug!(index = index_name, top_k, threshold, results = similar_nodes.len(), "similar nodes retrieved");
        Ok(similar_nodes)
    }

    /// Retrieve nodes similar to the query together with their neighbours along
    /// `relationship`. No threshold is applied here.
    pub async fn retrieve_similar_nodes_neighbours(
        &self,
        query: &str,
        relationship: &str,
        top_k: usize,
        index_name: &str,
    ) -> Result<Vec<NeighbourhoodMatch>> {
        let query_embedding = self.embedding_model.embed_query(query).await?;

        let docs = self
            .store
            .query_vector_index_neighbours(index_name, relationship, top_k, &query_embedding)
            .await?;

        debug!(index = index_name, relationship, top_k, results = docs.len(), "neighbourhoods retrieved");
        Ok(docs)
    }

    /// Point lookup by id and type label
    pub async fn get_node_with_id(&self, id: &str, type_label: &str) -> Result<Node> {
        self.store
            .find_node(type_label, id)
            .await?
            .ok_or_else(|| Error::NodeNotFound {
                type_label: type_label.to_string(),
                id: id.to_string(),
            })
    }
}
