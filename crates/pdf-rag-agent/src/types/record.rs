//! Per-document result record

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::metadata::PdfMetadata;
use crate::error::ExtractionError;

/// Snippet value when extraction produced no text
pub const NO_TEXT_SNIPPET: &str = "N/A";

/// Outcome of submitting a document to the RAG engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum IndexingStatus {
    /// Only `process` ran; indexing was never requested
    NotAttempted,
    /// Full text accepted by the engine
    Submitted,
    /// Extraction yielded no text, nothing to index
    SkippedNoText,
    /// Engine handle not ready (never initialized, or initialization failed)
    SkippedNotInitialized,
    /// Engine rejected the submission or it timed out
    Failed { reason: String },
}

impl IndexingStatus {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for IndexingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAttempted => write!(f, "not-attempted"),
            Self::Submitted => write!(f, "submitted"),
            Self::SkippedNoText => write!(f, "skipped-no-text"),
            Self::SkippedNotInitialized => write!(f, "skipped-not-initialized"),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// The single structured result produced for one input document.
///
/// A record is in one of two shapes:
/// - error record: `source_path` + `error`, every other field `None`
/// - derived record: `error` is `None`, `summary`, `classification` and
///   `indexing_status` are all `Some`
///
/// Use the constructors; they are the only way the two shapes are built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub source_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PdfMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexing_status: Option<IndexingStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentRecord {
    /// Terminal record for a document whose extraction failed
    pub fn extraction_failed(source_path: impl Into<PathBuf>, error: &ExtractionError) -> Self {
        Self::with_error(source_path, error.to_string())
    }

    /// Terminal record carrying an arbitrary error message
    pub fn with_error(source_path: impl Into<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            metadata: None,
            text_snippet: None,
            full_text_length: None,
            summary: None,
            classification: None,
            indexing_status: None,
            error: Some(error.into()),
        }
    }

    /// Record for a successfully extracted and derived document.
    /// Indexing starts as `NotAttempted`.
    pub fn derived(
        source_path: impl Into<PathBuf>,
        metadata: PdfMetadata,
        text: &str,
        snippet_length: usize,
        summary: String,
        classification: String,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            metadata: Some(metadata),
            text_snippet: Some(make_snippet(text, snippet_length)),
            full_text_length: Some(text.chars().count()),
            summary: Some(summary),
            classification: Some(classification),
            indexing_status: Some(IndexingStatus::NotAttempted),
            error: None,
        }
    }

    /// Record the indexing outcome. Error records are terminal and are
    /// left untouched.
    pub fn set_indexing_status(&mut self, status: IndexingStatus) {
        if self.error.is_some() {
            tracing::warn!(
                "Ignoring indexing status '{}' for failed record {}",
                status,
                self.source_path.display()
            );
            return;
        }
        self.indexing_status = Some(status);
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// True only when the engine accepted the document. Any other status
    /// means the document is not searchable yet.
    pub fn is_searchable(&self) -> bool {
        matches!(self.indexing_status, Some(IndexingStatus::Submitted))
    }
}

/// First `cap` characters of `text`, with `"..."` appended when truncated;
/// `"N/A"` for empty text.
pub fn make_snippet(text: &str, cap: usize) -> String {
    if text.is_empty() {
        return NO_TEXT_SNIPPET.to_string();
    }
    match text.char_indices().nth(cap) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
