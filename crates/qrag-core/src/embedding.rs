//! Embedding model trait

use async_trait::async_trait;

use crate::Result;

/// Trait for models that turn text into vectors
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a single query or passage
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Name of the underlying model
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<T: EmbeddingModel + ?Sized> EmbeddingModel for Box<T> {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed_query(text).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
