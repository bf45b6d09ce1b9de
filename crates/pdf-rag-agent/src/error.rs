//! Error types for the ingestion agent

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Agent errors
///
/// None of these escape `DocumentAgent::process` or
/// `DocumentAgent::process_and_index`; they are folded into the
/// `DocumentRecord` or the engine handle state instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (including a missing provider credential)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extraction error
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Chat-completion error
    #[error("LLM error: {0}")]
    Llm(String),

    /// RAG engine construction failed
    #[error("RAG engine initialization failed: {0}")]
    EngineInit(String),

    /// RAG engine is not in the ready state
    #[error("RAG engine not initialized")]
    EngineNotInitialized,

    /// Submission of a document to the RAG engine failed
    #[error("Indexing failed: {0}")]
    Indexing(String),

    /// A stage exceeded its configured timeout
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an engine initialization error
    pub fn engine_init(message: impl Into<String>) -> Self {
        Self::EngineInit(message.into())
    }

    /// Create an indexing error
    pub fn indexing(message: impl Into<String>) -> Self {
        Self::Indexing(message.into())
    }
}

/// Why text or metadata could not be read from a PDF.
///
/// Terminal for the document it concerns, never retried automatically.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// No file at the given path
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be read
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unreadable or corrupt PDF structure
    #[error("Failed to parse PDF '{}': {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    /// Encrypted PDF that the empty password does not open
    #[error("Encrypted PDF '{}', decryption failed: {message}", path.display())]
    Decryption { path: PathBuf, message: String },

    /// Extraction did not finish within the configured timeout
    #[error("Extraction of '{}' timed out after {secs}s", path.display())]
    Timeout { path: PathBuf, secs: u64 },

    /// The blocking extraction task panicked or was cancelled
    #[error("Extraction task for '{}' failed: {message}", path.display())]
    Task { path: PathBuf, message: String },
}

impl ExtractionError {
    /// Create a corrupt-structure error
    pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a decryption error
    pub fn decryption(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decryption {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Map an IO error on `path`, treating `NotFound` as its own kind
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// Path of the document the error concerns
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound(path) => path,
            Self::Io { path, .. }
            | Self::Corrupt { path, .. }
            | Self::Decryption { path, .. }
            | Self::Timeout { path, .. }
            | Self::Task { path, .. } => path,
        }
    }
}
