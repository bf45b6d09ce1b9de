//! File-backed reference engine: chunks + embeddings in the working directory

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::chunker::TextChunker;
use super::{QueryAnswer, QuerySource, RagEngine, RagEngineFactory};
use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::prompt::PromptBuilder;
use crate::providers::{EmbeddingProvider, LlmProvider};

/// Store file inside the working directory
pub const STORE_FILE: &str = "chunks.json";

/// Longest snippet reported per query source
const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreFile {
    documents: Vec<StoredDocument>,
    chunks: Vec<StoredChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    id: Uuid,
    content_hash: String,
    char_count: usize,
    chunk_count: u32,
    inserted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    id: Uuid,
    document_id: Uuid,
    index: u32,
    content: String,
    embedding: Vec<f32>,
}

/// Engine persisting embedded chunks to `<working_dir>/chunks.json`.
///
/// Identical texts are indexed once (SHA-256 of the content). Queries rank
/// chunks by cosine similarity and answer through the chat model.
pub struct LocalRagEngine {
    working_dir: PathBuf,
    store_path: PathBuf,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    store: RwLock<StoreFile>,
    /// Serialises mutations of the store and its file
    write_gate: tokio::sync::Mutex<()>,
}

impl LocalRagEngine {
    /// Open the engine, loading an existing store if present
    pub async fn open(
        working_dir: &Path,
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let store_path = working_dir.join(STORE_FILE);
        let store = match tokio::fs::read_to_string(&store_path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                Error::engine_init(format!("corrupt store {}: {}", store_path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => return Err(e.into()),
        };
        if let Some(chunk) = store.chunks.first() {
            if chunk.embedding.len() != embedder.dimensions() {
                return Err(Error::engine_init(format!(
                    "store {} holds {}-dimensional embeddings but '{}' produces {}",
                    store_path.display(),
                    chunk.embedding.len(),
                    embedder.name(),
                    embedder.dimensions()
                )));
            }
        }
        tracing::info!(
            "Loaded {} documents ({} chunks) from {}",
            store.documents.len(),
            store.chunks.len(),
            store_path.display()
        );

        Ok(Self {
            working_dir: working_dir.to_path_buf(),
            store_path,
            chunker,
            embedder,
            llm,
            store: RwLock::new(store),
            write_gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Number of indexed documents
    pub fn document_count(&self) -> usize {
        self.store.read().documents.len()
    }

    /// Number of stored chunks
    pub fn chunk_count(&self) -> usize {
        self.store.read().chunks.len()
    }

    fn contains_hash(&self, hash: &str) -> bool {
        self.store.read().documents.iter().any(|d| d.content_hash == hash)
    }

    /// Write the store atomically (temp file + rename)
    async fn persist(&self) -> Result<()> {
        let json = serde_json::to_vec(&*self.store.read())?;
        let tmp = self.store_path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.store_path).await?;
        Ok(())
    }
}

#[async_trait]
impl RagEngine for LocalRagEngine {
    async fn insert(&self, text: &str) -> Result<()> {
        let hash = hash_content(text);
        if self.contains_hash(&hash) {
            tracing::debug!("Document {} already indexed, skipping", &hash[..12]);
            return Ok(());
        }

        let pieces = self.chunker.chunk(text);
        if pieces.is_empty() {
            return Err(Error::indexing("document produced no chunks"));
        }
        let embeddings = self.embedder.embed_batch(&pieces).await?;
        if embeddings.len() != pieces.len() {
            return Err(Error::indexing(format!(
                "expected {} embeddings, got {}",
                pieces.len(),
                embeddings.len()
            )));
        }
        let dimensions = self.embedder.dimensions();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
            return Err(Error::indexing(format!(
                "embedding has {} dimensions, expected {}",
                bad.len(),
                dimensions
            )));
        }

        let _gate = self.write_gate.lock().await;
        if self.contains_hash(&hash) {
            return Ok(());
        }

        let document_id = Uuid::new_v4();
        let chunk_count = pieces.len() as u32;
        {
            let mut store = self.store.write();
            for (index, (content, embedding)) in pieces.into_iter().zip(embeddings).enumerate() {
                store.chunks.push(StoredChunk {
                    id: Uuid::new_v4(),
                    document_id,
                    index: index as u32,
                    content,
                    embedding,
                });
            }
            store.documents.push(StoredDocument {
                id: document_id,
                content_hash: hash,
                char_count: text.chars().count(),
                chunk_count,
                inserted_at: Utc::now(),
            });
        }

        if let Err(e) = self.persist().await {
            // Keep memory and disk consistent: drop what was just added
            let mut store = self.store.write();
            store.chunks.retain(|c| c.document_id != document_id);
            store.documents.retain(|d| d.id != document_id);
            return Err(Error::indexing(format!("failed to persist store: {}", e)));
        }

        tracing::info!("Indexed document {} ({} chunks)", document_id, chunk_count);
        Ok(())
    }

    async fn query(&self, question: &str, top_k: usize) -> Result<QueryAnswer> {
        let query_embedding = self.embedder.embed(question).await?;

        let ranked: Vec<(f32, StoredChunk)> = {
            let store = self.store.read();
            let mut scored: Vec<(f32, &StoredChunk)> = store
                .chunks
                .iter()
                .map(|chunk| (cosine_similarity(&query_embedding, &chunk.embedding), chunk))
                .collect();
            scored.sort_by(|a, b| b.0.total_cmp(&a.0));
            scored
                .into_iter()
                .take(top_k)
                .map(|(score, chunk)| (score, chunk.clone()))
                .collect()
        };

        if ranked.is_empty() {
            return Ok(QueryAnswer {
                answer: "No indexed content is available to answer this question.".to_string(),
                sources: Vec::new(),
            });
        }

        let passages: Vec<&str> = ranked.iter().map(|(_, c)| c.content.as_str()).collect();
        let answer = self
            .llm
            .complete(PromptBuilder::rag_system(), &PromptBuilder::rag_prompt(question, &passages))
            .await?;

        let sources = ranked
            .iter()
            .map(|(similarity, chunk)| QuerySource {
                document_id: chunk.document_id,
                chunk_index: chunk.index,
                similarity: *similarity,
                snippet: chunk.content.chars().take(SNIPPET_CHARS).collect(),
            })
            .collect();

        Ok(QueryAnswer { answer, sources })
    }

    fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

/// Builds [`LocalRagEngine`]s
#[derive(Debug, Clone, Default)]
pub struct LocalEngineFactory {
    chunking: ChunkingConfig,
    verify_providers: bool,
}

impl LocalEngineFactory {
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self {
            chunking,
            verify_providers: false,
        }
    }

    /// Fail construction when the embedding provider does not answer its
    /// health check (bad credentials, unreachable endpoint)
    pub fn verify_providers(mut self, verify: bool) -> Self {
        self.verify_providers = verify;
        self
    }
}

#[async_trait]
impl RagEngineFactory for LocalEngineFactory {
    async fn construct(
        &self,
        working_dir: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Arc<dyn RagEngine>> {
        if self.verify_providers && !embedder.health_check().await? {
            return Err(Error::engine_init(format!(
                "embedding provider '{}' is unavailable",
                embedder.name()
            )));
        }

        let engine = LocalRagEngine::open(
            working_dir,
            TextChunker::from_config(&self.chunking),
            embedder,
            llm,
        )
        .await?;
        Ok(Arc::new(engine))
    }
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
