//! Neo4j graph store over the HTTP transactional API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;
use url::Url;

use qrag_core::{
    Error, GraphStore, Metadata, NeighbourhoodMatch, Node, Passage, Result, SimilarNode,
    VectorIndexSpec,
};

use crate::config::Neo4jConfig;
use crate::cypher::{RESERVED_PROPERTIES, Statement, quote_identifier};

/// A result row keyed by column name
pub type Row = serde_json::Map<String, Value>;

/// Neo4j-backed graph store
///
/// Every statement is sent to `/db/{database}/tx/commit` with its values in the
/// `parameters` map; only validated identifiers are spliced into query text.
pub struct Neo4jGraphStore {
    client: Client,
    config: Neo4jConfig,
    commit_url: Url,
}

#[derive(Serialize)]
struct TransactionRequest<'a> {
    statements: [&'a Statement; 1],
}

#[derive(Deserialize)]
struct TransactionResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    data: Vec<RowData>,
}

#[derive(Deserialize)]
struct RowData {
    row: Vec<Value>,
}

#[derive(Deserialize)]
struct Neo4jError {
    code: String,
    message: String,
}

impl Neo4jGraphStore {
    /// Create a new store from configuration
    pub fn new(config: Neo4jConfig) -> Result<Self> {
        let commit_url = config.commit_url()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            client,
            config,
            commit_url,
        })
    }

    /// Create a new store from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(Neo4jConfig::from_env()?)
    }

    pub fn config(&self) -> &Neo4jConfig {
        &self.config
    }

    /// Run one statement and return its rows
    pub async fn run(&self, statement: Statement) -> Result<Vec<Row>> {
        debug!(statement = %statement.statement, "running cypher statement");

        let response = self
            .client
            .post(self.commit_url.clone())
            .basic_auth(&self.config.user, Some(&self.config.password))
            .header("Accept", "application/json")
            .json(&TransactionRequest {
                statements: [&statement],
            })
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::GraphStore(format!(
                "Neo4j request failed with status {}: {}",
                status, error_text
            )));
        }

        let body: TransactionResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        if let Some(error) = body.errors.into_iter().next() {
            return Err(Error::GraphStore(format!("{}: {}", error.code, error.message)));
        }

        let Some(result) = body.results.into_iter().next() else {
            return Ok(Vec::new());
        };

        Ok(result
            .data
            .into_iter()
            .map(|data| result.columns.iter().cloned().zip(data.row).collect())
            .collect())
    }
}

fn node_metadata_parameter(node: &Node) -> Value {
    let metadata: Metadata = node
        .metadata
        .iter()
        .filter(|(key, _)| !RESERVED_PROPERTIES.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Value::Object(metadata)
}

fn as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn passage_from_map(map: &serde_json::Map<String, Value>) -> Result<Passage> {
    let id = as_string(map.get("id"))
        .ok_or_else(|| Error::Serialization("node in result has no id".to_string()))?;

    Ok(Passage {
        id,
        text: as_string(map.get("text")).unwrap_or_default(),
        header: as_string(map.get("header")),
    })
}

fn similar_node_from_row(row: &Row) -> Result<SimilarNode> {
    let score = row
        .get("score")
        .and_then(Value::as_f64)
        .ok_or_else(|| Error::Serialization("result row has no score".to_string()))?;

    Ok(SimilarNode {
        passage: passage_from_map(row)?,
        score: score as f32,
    })
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn merge_node(&self, node: &Node) -> Result<()> {
        let label = quote_identifier(&node.type_label)?;
        let statement = Statement::new(
            format!(
                "MERGE (node:{label} {{id: $id}})\n\
                 ON CREATE SET node += $metadata"
            ),
            json!({
                "id": node.id,
                "metadata": node_metadata_parameter(node),
            }),
        );

        self.run(statement).await?;
        Ok(())
    }

    async fn merge_relationship(&self, root: &Node, rel: &Node, label: &str) -> Result<()> {
        let root_label = quote_identifier(&root.type_label)?;
        let rel_label = quote_identifier(&rel.type_label)?;
        let relationship = quote_identifier(label)?;
        let statement = Statement::new(
            format!(
                "MATCH (root:{root_label} {{id: $root_id}}), (rel:{rel_label} {{id: $rel_id}})\n\
                 MERGE (root)-[:{relationship}]->(rel)"
            ),
            json!({
                "root_id": root.id,
                "rel_id": rel.id,
            }),
        );

        self.run(statement).await?;
        Ok(())
    }

    async fn create_vector_index(&self, spec: &VectorIndexSpec) -> Result<()> {
        let index_name = quote_identifier(&spec.index_name)?;
        let label = quote_identifier(&spec.node_type)?;
        // Index options only accept literals; both values are typed, not caller text.
        let statement = Statement::new(
            format!(
                "CREATE VECTOR INDEX {index_name} IF NOT EXISTS\n\
                 FOR (node:{label}) ON (node.embedding)\n\
                 OPTIONS {{indexConfig: {{`vector.dimensions`: {dimension}, `vector.similarity_function`: '{metric}'}}}}",
                dimension = spec.dimension,
                metric = spec.similarity_metric.as_str(),
            ),
            json!({}),
        );

        self.run(statement).await?;
        Ok(())
    }

    async fn set_embedding_if_absent(&self, node: &Node, embedding: &[f32]) -> Result<bool> {
        let label = quote_identifier(&node.type_label)?;
        let statement = Statement::new(
            format!(
                "MATCH (node:{label} {{id: $id}})\n\
                 WHERE node.embedding IS NULL\n\
                 CALL db.create.setNodeVectorProperty(node, 'embedding', $embedding)\n\
                 RETURN count(node) AS updated"
            ),
            json!({
                "id": node.id,
                "embedding": embedding,
            }),
        );

        let rows = self.run(statement).await?;
        let updated = rows
            .first()
            .and_then(|row| row.get("updated"))
            .and_then(Value::as_u64)
            .unwrap_or(0);

        Ok(updated > 0)
    }

    async fn query_vector_index(
        &self,
        index_name: &str,
        top_k: usize,
        embedding: &[f32],
    ) -> Result<Vec<SimilarNode>> {
        let statement = Statement::new(
            "CALL db.index.vector.queryNodes($index_name, $top_k, $embedding)\n\
             YIELD node, score\n\
             RETURN node.id AS id, node.text AS text, node.header AS header, score",
            json!({
                "index_name": index_name,
                "top_k": top_k,
                "embedding": embedding,
            }),
        );

        self.run(statement)
            .await?
            .iter()
            .map(similar_node_from_row)
            .collect()
    }

    async fn query_vector_index_neighbours(
        &self,
        index_name: &str,
        relationship: &str,
        top_k: usize,
        embedding: &[f32],
    ) -> Result<Vec<NeighbourhoodMatch>> {
        let relationship = quote_identifier(relationship)?;
        let statement = Statement::new(
            format!(
                "CALL db.index.vector.queryNodes($index_name, $top_k, $embedding)\n\
                 YIELD node, score\n\
                 MATCH (node)-[:{relationship}]->(neighbour)\n\
                 WITH node, score, collect(neighbour {{.id, .text, .header}}) AS neighbours\n\
                 RETURN node.id AS id, node.text AS text, node.header AS header, score, neighbours\n\
                 ORDER BY score DESC"
            ),
            json!({
                "index_name": index_name,
                "top_k": top_k,
                "embedding": embedding,
            }),
        );

        self.run(statement)
            .await?
            .iter()
            .map(|row| {
                let neighbours = row
                    .get("neighbours")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_object)
                            .map(passage_from_map)
                            .collect::<Result<Vec<_>>>()
                    })
                    .transpose()?
                    .unwrap_or_default();

                Ok(NeighbourhoodMatch {
                    node: similar_node_from_row(row)?,
                    neighbours,
                })
            })
            .collect()
    }

    async fn find_node(&self, type_label: &str, id: &str) -> Result<Option<Node>> {
        let label = quote_identifier(type_label)?;
        let statement = Statement::new(
            format!(
                "MATCH (node:{label} {{id: $id}})\n\
                 RETURN properties(node) AS properties\n\
                 LIMIT 1"
            ),
            json!({ "id": id }),
        );

        let rows = self.run(statement).await?;
        let Some(properties) = rows
            .into_iter()
            .next()
            .and_then(|mut row| row.remove("properties"))
        else {
            return Ok(None);
        };

        let Value::Object(mut metadata) = properties else {
            return Err(Error::Serialization(
                "node properties are not a map".to_string(),
            ));
        };
        for key in RESERVED_PROPERTIES {
            metadata.remove(key);
        }

        Ok(Some(Node::new(id, type_label, metadata)))
    }
}
