//! Core types for the ingestion agent

pub mod metadata;
pub mod record;

pub use metadata::{MetadataError, MetadataOutcome, PdfMetadata};
pub use record::{DocumentRecord, IndexingStatus, NO_TEXT_SNIPPET};
