//! Document agent: extraction, derivation and indexing of PDFs

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{AgentConfig, DerivationBackend, PipelineConfig};
use crate::derivation::{Deriver, LlmDeriver, PlaceholderDeriver};
use crate::engine::{EngineState, LocalEngineFactory, QueryAnswer, RagEngineHandle};
use crate::error::{Error, ExtractionError, Result};
use crate::ingestion::{DocumentExtractor, ExtractedPdf, PdfExtractor};
use crate::providers::{EmbeddingProvider, LlmProvider, OpenAiClient, OpenAiEmbedder, OpenAiLlm};
use crate::types::{DocumentRecord, IndexingStatus};

/// Outcome of extraction + derivation. `text` is kept for indexing so the
/// document is read once per call.
struct Processed {
    record: DocumentRecord,
    text: Option<String>,
}

/// Processes PDFs into [`DocumentRecord`]s and submits them to the RAG
/// engine it owns.
///
/// Per-document failures never escape `process*`: they end up in the
/// record's `error` field or its `indexing_status`.
pub struct DocumentAgent {
    config: AgentConfig,
    extractor: Arc<dyn DocumentExtractor>,
    deriver: Arc<dyn Deriver>,
    engine: RagEngineHandle,
}

impl DocumentAgent {
    /// Build an agent backed by the OpenAI-compatible providers and the
    /// local file engine. Fails with [`Error::Config`] when no API key is
    /// available.
    pub fn new(config: AgentConfig) -> Result<Self> {
        let client = Arc::new(OpenAiClient::from_config(&config.llm)?);
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(OpenAiEmbedder::from_client(Arc::clone(&client)));
        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiLlm::from_client(client));

        let deriver = build_deriver(&config.agent, Arc::clone(&llm));
        let factory =
            Arc::new(LocalEngineFactory::new(config.chunking.clone()).verify_providers(true));
        let extractor = Arc::new(PdfExtractor::new(config.timeouts.extraction()));

        info!(
            "Document agent using {} derivation, models {} / {}",
            deriver.name(),
            config.llm.chat_model,
            config.llm.embed_model
        );

        let engine = RagEngineHandle::new(factory, embedder, llm);
        Ok(Self::with_components(config, extractor, deriver, engine))
    }

    /// Build an agent from explicit collaborators
    pub fn with_components(
        config: AgentConfig,
        extractor: Arc<dyn DocumentExtractor>,
        deriver: Arc<dyn Deriver>,
        engine: RagEngineHandle,
    ) -> Self {
        Self {
            config,
            extractor,
            deriver,
            engine,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Bind the engine to `working_dir`. Failures are reported through the
    /// returned state, never as an error.
    pub async fn initialize_engine(&self, working_dir: impl AsRef<Path>) -> EngineState {
        self.engine.ensure_initialized(working_dir.as_ref()).await
    }

    /// Bind the engine to the configured working directory
    pub async fn initialize_default_engine(&self) -> EngineState {
        let dir = self.config.agent.working_dir.clone();
        self.engine.ensure_initialized(&dir).await
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }

    /// Extract and derive without indexing. Successful records carry
    /// `IndexingStatus::NotAttempted`.
    pub async fn process(&self, path: impl AsRef<Path>) -> DocumentRecord {
        self.extract_and_derive(path.as_ref()).await.record
    }

    /// Extract, derive and submit the full text to the engine
    pub async fn process_and_index(&self, path: impl AsRef<Path>) -> DocumentRecord {
        let path = path.as_ref();
        let Processed { mut record, text } = self.extract_and_derive(path).await;

        let Some(text) = text else {
            info!("Skipping indexing for {} due to processing error", path.display());
            return record;
        };

        let status = self.submit(path, &text).await;
        record.set_indexing_status(status);
        record
    }

    /// [`process`](Self::process) over many paths. Records come back in
    /// input order.
    pub async fn process_batch<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<DocumentRecord> {
        self.run_batch(paths, false, |_| {}).await
    }

    /// [`process_batch`](Self::process_batch), calling `on_record` as each
    /// record completes, in input order
    pub async fn process_batch_with<P, F>(&self, paths: &[P], on_record: F) -> Vec<DocumentRecord>
    where
        P: AsRef<Path>,
        F: FnMut(&DocumentRecord),
    {
        self.run_batch(paths, false, on_record).await
    }

    /// [`process_and_index`](Self::process_and_index) over many paths.
    /// Records come back in input order.
    pub async fn process_and_index_batch<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> Vec<DocumentRecord> {
        self.run_batch(paths, true, |_| {}).await
    }

    /// [`process_and_index_batch`](Self::process_and_index_batch), calling
    /// `on_record` as each record completes, in input order
    pub async fn process_and_index_batch_with<P, F>(
        &self,
        paths: &[P],
        on_record: F,
    ) -> Vec<DocumentRecord>
    where
        P: AsRef<Path>,
        F: FnMut(&DocumentRecord),
    {
        self.run_batch(paths, true, on_record).await
    }

    /// Ask the engine a question
    pub async fn query(&self, question: &str, top_k: usize) -> Result<QueryAnswer> {
        let engine = self.engine.engine().ok_or(Error::EngineNotInitialized)?;
        engine.query(question, top_k).await
    }

    async fn run_batch<P, F>(&self, paths: &[P], index: bool, on_record: F) -> Vec<DocumentRecord>
    where
        P: AsRef<Path>,
        F: FnMut(&DocumentRecord),
    {
        let limit = self.config.agent.max_concurrent_documents.max(1);
        debug!("Processing {} documents, {} at a time", paths.len(), limit);

        stream::iter(paths)
            .map(|path| async move {
                if index {
                    self.process_and_index(path).await
                } else {
                    self.process(path).await
                }
            })
            .buffered(limit)
            .inspect(on_record)
            .collect()
            .await
    }

    async fn extract_and_derive(&self, path: &Path) -> Processed {
        info!("Processing PDF document: {}", path.display());

        let extracted = match self.extract(path).await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Extraction failed for {}: {}", path.display(), e);
                return Processed {
                    record: DocumentRecord::extraction_failed(path, &e),
                    text: None,
                };
            }
        };
        let ExtractedPdf { text, metadata } = extracted;

        let (summary, classification) =
            tokio::join!(self.summarize(path, &text), self.classify(path, &text));

        let record = DocumentRecord::derived(
            path,
            metadata,
            &text,
            self.config.agent.snippet_length,
            summary,
            classification,
        );
        info!(
            "Finished processing {} ({} chars)",
            path.display(),
            record.full_text_length.unwrap_or(0)
        );

        Processed {
            record,
            text: Some(text),
        }
    }

    /// Run the blocking extractor on the blocking pool under the
    /// extraction timeout
    async fn extract(&self, path: &Path) -> std::result::Result<ExtractedPdf, ExtractionError> {
        let extractor = Arc::clone(&self.extractor);
        debug!("Extracting {} with {}", path.display(), extractor.name());
        let owned: PathBuf = path.to_path_buf();
        let task = tokio::task::spawn_blocking(move || extractor.extract(&owned));

        match tokio::time::timeout(self.config.timeouts.extraction(), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ExtractionError::Task {
                path: path.to_path_buf(),
                message: join_err.to_string(),
            }),
            Err(_) => Err(ExtractionError::Timeout {
                path: path.to_path_buf(),
                secs: self.config.timeouts.extraction_secs,
            }),
        }
    }

    async fn summarize(&self, path: &Path, text: &str) -> String {
        let max_len = self.config.agent.summary_max_length;
        match tokio::time::timeout(
            self.config.timeouts.derivation(),
            self.deriver.summarize(text, max_len),
        )
        .await
        {
            Ok(summary) => summary,
            Err(_) => {
                warn!(
                    "Summarization of {} timed out after {}s, using placeholder",
                    path.display(),
                    self.config.timeouts.derivation_secs
                );
                PlaceholderDeriver.summarize_sync(text, max_len)
            }
        }
    }

    async fn classify(&self, path: &Path, text: &str) -> String {
        match tokio::time::timeout(self.config.timeouts.derivation(), self.deriver.classify(text))
            .await
        {
            Ok(label) => label,
            Err(_) => {
                warn!(
                    "Classification of {} timed out after {}s, using placeholder",
                    path.display(),
                    self.config.timeouts.derivation_secs
                );
                PlaceholderDeriver.classify_sync(text)
            }
        }
    }

    /// Submit extracted text to the engine and report the outcome
    async fn submit(&self, path: &Path, text: &str) -> IndexingStatus {
        let Some(engine) = self.engine.engine() else {
            warn!(
                "RAG engine not initialized ({:?}), skipping indexing for {}",
                self.engine.state(),
                path.display()
            );
            return IndexingStatus::SkippedNotInitialized;
        };

        if text.trim().is_empty() {
            info!("No text to index for {}", path.display());
            return IndexingStatus::SkippedNoText;
        }

        info!("Submitting {} to the RAG engine", path.display());
        match tokio::time::timeout(self.config.timeouts.indexing(), engine.insert(text)).await {
            Ok(Ok(())) => {
                info!("Submitted {} for indexing", path.display());
                IndexingStatus::Submitted
            }
            Ok(Err(e)) => {
                warn!("Error indexing {}: {}", path.display(), e);
                IndexingStatus::failed(e.to_string())
            }
            Err(_) => {
                let e = Error::Timeout {
                    stage: "indexing",
                    secs: self.config.timeouts.indexing_secs,
                };
                warn!("Error indexing {}: {}", path.display(), e);
                IndexingStatus::failed(e.to_string())
            }
        }
    }
}

/// Derivation backend selected by the pipeline config
fn build_deriver(config: &PipelineConfig, llm: Arc<dyn LlmProvider>) -> Arc<dyn Deriver> {
    match config.derivation {
        DerivationBackend::Placeholder => Arc::new(PlaceholderDeriver),
        DerivationBackend::Llm => {
            Arc::new(LlmDeriver::new(llm).with_labels(config.labels.clone()))
        }
    }
}
