//! Configuration for the ingestion agent

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Pipeline configuration
    #[serde(default)]
    pub agent: PipelineConfig,
    /// Per-stage timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Model provider configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Chunking configuration for the local engine
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

impl AgentConfig {
    /// Load configuration from a TOML file. Missing sections use defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

/// Which derivation backend produces summaries and labels
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DerivationBackend {
    /// Deterministic rule-based output
    #[default]
    Placeholder,
    /// Chat-completion model
    Llm,
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Working directory the RAG engine is bound to
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    /// Maximum characters kept in `DocumentRecord::text_snippet`
    #[serde(default = "default_snippet_length")]
    pub snippet_length: usize,
    /// Maximum characters of a summary before the truncation marker
    #[serde(default = "default_summary_max_length")]
    pub summary_max_length: usize,
    /// Documents processed at once by the batch operations
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_documents: usize,
    /// Derivation backend
    #[serde(default)]
    pub derivation: DerivationBackend,
    /// Label vocabulary offered to the model backend; empty means free-form
    #[serde(default)]
    pub labels: Vec<String>,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("./rag_data")
}

fn default_snippet_length() -> usize {
    200
}

fn default_summary_max_length() -> usize {
    500
}

fn default_max_concurrent() -> usize {
    num_cpus::get().max(1)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            snippet_length: default_snippet_length(),
            summary_max_length: default_summary_max_length(),
            max_concurrent_documents: default_max_concurrent(),
            derivation: DerivationBackend::default(),
            labels: Vec::new(),
        }
    }
}

/// Per-stage timeouts in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Text + metadata extraction (default: 60s)
    #[serde(default = "default_extraction_secs")]
    pub extraction_secs: u64,
    /// Summary and classification, each (default: 120s)
    #[serde(default = "default_derivation_secs")]
    pub derivation_secs: u64,
    /// Submission to the RAG engine (default: 300s)
    #[serde(default = "default_indexing_secs")]
    pub indexing_secs: u64,
}

fn default_extraction_secs() -> u64 {
    60
}

fn default_derivation_secs() -> u64 {
    120
}

fn default_indexing_secs() -> u64 {
    300
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            extraction_secs: default_extraction_secs(),
            derivation_secs: default_derivation_secs(),
            indexing_secs: default_indexing_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn extraction(&self) -> Duration {
        Duration::from_secs(self.extraction_secs)
    }

    pub fn derivation(&self) -> Duration {
        Duration::from_secs(self.derivation_secs)
    }

    pub fn indexing(&self) -> Duration {
        Duration::from_secs(self.indexing_secs)
    }
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Explicit credential; takes precedence over the environment
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable holding the credential
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Chat-completion model name
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Embedding model name
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    /// Embedding dimensions reported by the embed model
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    /// Temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embed_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_dimensions() -> usize {
    1536
}

fn default_temperature() -> f32 {
    0.2
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            chat_model: default_chat_model(),
            embed_model: default_embed_model(),
            dimensions: default_dimensions(),
            temperature: default_temperature(),
            timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl LlmConfig {
    /// Resolve the provider credential: explicit override first, then the
    /// configured environment variable. Blank values count as absent.
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| lookup(&self.api_key_env).filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| {
                Error::config(format!(
                    "API key not found. Set {} or pass it explicitly.",
                    self.api_key_env
                ))
            })
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Minimum chunk size (skip smaller trailing chunks)
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
            min_chunk_size: 50,
        }
    }
}
