//! LLM provider trait

use async_trait::async_trait;

use crate::{ChatPrompt, Result};

/// Trait for LLM clients (e.g., OpenAI, Ollama)
///
/// A single blocking round trip per call: no retry, no streaming. When `logging`
/// is set the implementation emits the prompt and the response for debugging.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send the prompt and return the raw text output
    async fn run(&self, prompt: &ChatPrompt, logging: bool) -> Result<String>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;

    /// Context window size in tokens
    fn max_tokens(&self) -> usize;

    /// Upper bound on generated tokens per call
    fn max_output_tokens(&self) -> usize;
}

#[async_trait]
impl<T: LLMProvider + ?Sized> LLMProvider for Box<T> {
    async fn run(&self, prompt: &ChatPrompt, logging: bool) -> Result<String> {
        (**self).run(prompt, logging).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn max_tokens(&self) -> usize {
        (**self).max_tokens()
    }

    fn max_output_tokens(&self) -> usize {
        (**self).max_output_tokens()
    }
}
