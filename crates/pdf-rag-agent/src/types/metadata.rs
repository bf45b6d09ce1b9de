//! PDF document properties

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Document properties read from the PDF Info dictionary.
///
/// Every field is optional; a PDF without an Info dictionary yields a record
/// with only `page_count` set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    /// Raw `/CreationDate` value, e.g. `D:20240101120000Z`
    pub creation_date: Option<String>,
    /// Raw `/ModDate` value
    pub mod_date: Option<String>,
    pub page_count: Option<u32>,
}

/// Error record returned in place of metadata when a file cannot be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataError {
    pub error: String,
    pub file_path: PathBuf,
}

/// Result of the non-raising metadata call: either populated metadata or an
/// explicit error record, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataOutcome {
    Metadata(PdfMetadata),
    Error(MetadataError),
}

impl MetadataOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Populated metadata, if any
    pub fn metadata(&self) -> Option<&PdfMetadata> {
        match self {
            Self::Metadata(m) => Some(m),
            Self::Error(_) => None,
        }
    }
}
