//! pdf-rag-agent: PDF ingestion into a RAG knowledge store
//!
//! Reads text and metadata from PDF documents, derives a bounded summary and
//! a classification label, and submits the full text to a retrieval engine
//! that can later answer questions over everything indexed.
//!
//! [`DocumentAgent`] is the entry point. Per-document failures are reported
//! in the returned [`DocumentRecord`], never raised.

pub mod agent;
pub mod config;
pub mod derivation;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod prompt;
pub mod providers;
pub mod types;

#[cfg(test)]
mod test_support;

pub use agent::DocumentAgent;
pub use config::{AgentConfig, DerivationBackend};
pub use derivation::{Deriver, LlmDeriver, PlaceholderDeriver};
pub use engine::{
    EngineState, LocalEngineFactory, QueryAnswer, QuerySource, RagEngine, RagEngineFactory,
    RagEngineHandle,
};
pub use error::{Error, ExtractionError, Result};
pub use ingestion::{extract_metadata, extract_text, DocumentExtractor, PdfExtractor};
pub use types::{DocumentRecord, IndexingStatus, MetadataOutcome, PdfMetadata};
