//! RAG engine contract and the lifecycle handle the agent owns

mod chunker;
mod handle;
mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::providers::{EmbeddingProvider, LlmProvider};

pub use chunker::TextChunker;
pub use handle::RagEngineHandle;
pub use local::{LocalEngineFactory, LocalRagEngine, STORE_FILE};

/// A constructed RAG engine bound to one working directory
#[async_trait]
pub trait RagEngine: Send + Sync {
    /// Index a document's full text
    async fn insert(&self, text: &str) -> Result<()>;

    /// Answer a question from the indexed content
    async fn query(&self, question: &str, top_k: usize) -> Result<QueryAnswer>;

    /// Directory the engine persists to
    fn working_dir(&self) -> &Path;
}

/// Builds engines. Construction may fail (bad credentials, unreachable
/// provider, unusable directory); the handle records such failures.
#[async_trait]
pub trait RagEngineFactory: Send + Sync {
    async fn construct(
        &self,
        working_dir: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Arc<dyn RagEngine>>;
}

/// Observable lifecycle state of a [`RagEngineHandle`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready { working_dir: PathBuf },
    Failed { reason: String },
}

impl EngineState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Answer to a query, with the passages it was grounded on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<QuerySource>,
}

/// One retrieved passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySource {
    pub document_id: Uuid,
    pub chunk_index: u32,
    pub similarity: f32,
    pub snippet: String,
}
