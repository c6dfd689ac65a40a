//! Embedding model implementations

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use qrag_core::{EmbeddingModel, Error, Result};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| Error::Network(e.to_string()))
}

async fn post_embedding<T: for<'de> Deserialize<'de>>(
    request: reqwest::RequestBuilder,
    provider: &str,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Embedding(format!(
            "{} API error {}: {}",
            provider, status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| Error::Serialization(e.to_string()))
}

/// Ollama embedding model (`/api/embed`)
pub struct OllamaEmbeddings {
    client: Client,
    host: String,
    model: String,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddings {
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            host: host.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingModel for OllamaEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embed", self.host.trim_end_matches('/'));
        debug!(model = %self.model, chars = text.len(), "embedding with ollama");

        let request = self.client.post(&url).json(&EmbeddingRequest {
            model: &self.model,
            input: [text],
        });
        let response: OllamaEmbeddingResponse = post_embedding(request, "Ollama").await?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("Empty response from Ollama".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// OpenAI embedding model (`/embeddings`)
pub struct OpenAIEmbeddings {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAIEmbeddings {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingModel for OpenAIEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        debug!(model = %self.model, chars = text.len(), "embedding with openai");

        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: [text],
            });
        let response: OpenAIEmbeddingResponse = post_embedding(request, "OpenAI").await?;

        response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| Error::Embedding("Empty response from OpenAI".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Deterministic local embedding model based on feature hashing
///
/// Each lower-cased word is hashed with md5 into one of `dimension` buckets with a
/// hash-derived sign; the result is L2-normalised. Texts sharing words score
/// higher under cosine similarity. Needs no network or model download.
pub struct HashingEmbeddings {
    dimension: usize,
    name: String,
}

impl HashingEmbeddings {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Configuration(
                "hashing embedding dimension must be positive".to_string(),
            ));
        }

        Ok(Self {
            dimension,
            name: format!("hashing-{}", dimension),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Synchronous form of [`EmbeddingModel::embed_query`]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let digest = md5::compute(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest.0[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest.0[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

#[async_trait]
impl EmbeddingModel for HashingEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed(text))
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
