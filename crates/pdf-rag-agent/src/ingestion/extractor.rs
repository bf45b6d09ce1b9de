//! PDF extractor built on lopdf, with pdf-extract as the text fallback

use lopdf::{Dictionary, Document, Object};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use super::cleanup::cleanup_pdf_text;
use crate::error::ExtractionError;
use crate::types::{MetadataError, MetadataOutcome, PdfMetadata};

/// Text and metadata pulled from one PDF in a single pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPdf {
    /// Cleaned full text, pages joined by newlines. Empty for a valid PDF
    /// with no text layer.
    pub text: String,
    pub metadata: PdfMetadata,
}

/// Extraction capability the agent depends on.
///
/// Implementations are blocking; the agent runs them on the blocking pool.
pub trait DocumentExtractor: Send + Sync {
    /// Read text and metadata from `path`, reporting every failure kind
    /// distinctly
    fn extract(&self, path: &Path) -> Result<ExtractedPdf, ExtractionError>;

    /// Get extractor name for logging
    fn name(&self) -> &str;
}

/// lopdf-backed PDF extractor
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    /// Budget for the pdf-extract fallback, which can hang on odd fonts
    fallback_timeout: Duration,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl PdfExtractor {
    pub fn new(fallback_timeout: Duration) -> Self {
        Self { fallback_timeout }
    }

    /// Load a PDF, decrypting it with the empty password when needed
    fn load(&self, path: &Path) -> Result<(Document, Vec<u8>), ExtractionError> {
        let data = std::fs::read(path).map_err(|e| ExtractionError::from_io(path, e))?;

        let mut doc = Document::load_mem(&data).map_err(|e| {
            let msg = e.to_string();
            let lower = msg.to_lowercase();
            if lower.contains("encrypt") || lower.contains("password") || lower.contains("decrypt") {
                ExtractionError::decryption(path, msg)
            } else {
                ExtractionError::corrupt(path, msg)
            }
        })?;

        if doc.is_encrypted() {
            doc.decrypt("")
                .map_err(|e| ExtractionError::decryption(path, e.to_string()))?;
            tracing::debug!("Decrypted '{}' with empty password", path.display());
        }

        Ok((doc, data))
    }

    /// Extract text page by page; fall back to pdf-extract when lopdf finds
    /// nothing
    fn extract_text_from_document(&self, path: &Path, doc: &Document, data: &[u8]) -> String {
        let mut parts = Vec::new();
        for page_num in doc.get_pages().keys() {
            match doc.extract_text(&[*page_num]) {
                Ok(text) => {
                    let text = cleanup_pdf_text(&text);
                    if !text.is_empty() {
                        parts.push(text);
                    }
                }
                Err(e) => {
                    tracing::debug!("Could not extract text from page {}: {}", page_num, e);
                }
            }
        }

        let text = parts.join("\n");
        if !text.is_empty() {
            return text;
        }

        match self.extract_with_fallback(data) {
            Ok(text) => cleanup_pdf_text(&text),
            Err(msg) => {
                tracing::debug!("pdf-extract fallback for '{}' failed: {}", path.display(), msg);
                String::new()
            }
        }
    }

    /// Run pdf-extract on a separate thread so a hang cannot stall the caller
    fn extract_with_fallback(&self, data: &[u8]) -> std::result::Result<String, String> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.fallback_timeout) {
            Ok(Ok(text)) => {
                let _ = handle.join();
                Ok(text)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e.to_string())
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // The thread cannot be killed; it is detached and its result dropped
                tracing::error!(
                    "pdf-extract timeout after {:?} - PDF may have complex fonts",
                    self.fallback_timeout
                );
                Err("timeout".to_string())
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err("extraction thread crashed".to_string()),
        }
    }

    /// Metadata only, without reading any page content
    pub fn read_metadata(&self, path: &Path) -> Result<PdfMetadata, ExtractionError> {
        let (doc, _) = self.load(path)?;
        Ok(read_info(&doc))
    }
}

impl DocumentExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedPdf, ExtractionError> {
        tracing::debug!("Extracting PDF: {}", path.display());
        let (doc, data) = self.load(path)?;

        let metadata = read_info(&doc);
        let text = self.extract_text_from_document(path, &doc, &data);

        if text.is_empty() {
            tracing::info!("No text extracted from '{}'", path.display());
        } else {
            tracing::debug!(
                "Extracted {} chars from {} pages of '{}'",
                text.chars().count(),
                metadata.page_count.unwrap_or(0),
                path.display()
            );
        }

        Ok(ExtractedPdf { text, metadata })
    }

    fn name(&self) -> &str {
        "lopdf"
    }
}

/// Read the Info dictionary. A missing dictionary or field is not an error.
fn read_info(doc: &Document) -> PdfMetadata {
    let mut metadata = PdfMetadata {
        page_count: Some(doc.get_pages().len() as u32),
        ..Default::default()
    };

    let info = doc.trailer.get(b"Info").ok().and_then(|obj| match obj {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    });

    if let Some(dict) = info {
        metadata.title = info_string(dict, b"Title");
        metadata.author = info_string(dict, b"Author");
        metadata.subject = info_string(dict, b"Subject");
        metadata.creator = info_string(dict, b"Creator");
        metadata.producer = info_string(dict, b"Producer");
        metadata.creation_date = info_string(dict, b"CreationDate");
        metadata.mod_date = info_string(dict, b"ModDate");
    }

    metadata
}

fn info_string(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let bytes = dict.get(key).ok()?.as_str().ok()?;
    let text = decode_pdf_string(bytes);
    let text = text.trim_matches('\0').trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Decode a PDF text string: UTF-16BE when it carries a BOM, otherwise
/// UTF-8 with a Latin-1 fallback
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Extract the text of a PDF. Returns an empty string on any failure
/// (missing file, corrupt structure, failed decryption).
pub fn extract_text(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    match PdfExtractor::default().extract(path) {
        Ok(extracted) => extracted.text,
        Err(e) => {
            tracing::warn!("{}", e);
            String::new()
        }
    }
}

/// Extract PDF metadata, or an error record naming the file. Never fails.
pub fn extract_metadata(path: impl AsRef<Path>) -> MetadataOutcome {
    let path = path.as_ref();
    match PdfExtractor::default().read_metadata(path) {
        Ok(metadata) => MetadataOutcome::Metadata(metadata),
        Err(e) => {
            tracing::warn!("{}", e);
            MetadataOutcome::Error(MetadataError {
                error: e.to_string(),
                file_path: path.to_path_buf(),
            })
        }
    }
}

/// Collect PDF files under `root` (or `root` itself when it is a file),
/// sorted for stable batch order
pub fn discover_pdfs(root: impl AsRef<Path>) -> Vec<PathBuf> {
    let root = root.as_ref();
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    paths.sort();
    paths
}
