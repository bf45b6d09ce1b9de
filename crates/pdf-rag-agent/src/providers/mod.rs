//! Model providers used by derivation and by the RAG engine
//!
//! The agent and the engine only see [`EmbeddingProvider`] and
//! [`LlmProvider`]; [`OpenAiClient`] backs both in production and tests
//! substitute their own.

pub mod openai;

use async_trait::async_trait;

use crate::error::Result;

pub use openai::{OpenAiClient, OpenAiEmbedder, OpenAiLlm};

/// Turns text into vectors for chunk indexing and query ranking
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Vectors for every chunk of a document, in input order. Falls back to
    /// one request per chunk for providers without a batch endpoint.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every returned vector
    fn dimensions(&self) -> usize;

    /// `Ok(false)` when the endpoint answers but rejects us (bad key)
    async fn health_check(&self) -> Result<bool>;

    fn name(&self) -> &str;
}

/// Single-turn chat model: labels and grounded answers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;

    async fn health_check(&self) -> Result<bool>;

    fn name(&self) -> &str;

    /// Model identifier, for logs
    fn model(&self) -> &str;
}
