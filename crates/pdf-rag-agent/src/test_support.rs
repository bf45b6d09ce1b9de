//! Helpers shared by the unit tests: PDF generation and stub collaborators

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, encryption, Document, Object, ObjectId, Stream, StringFormat};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::derivation::Deriver;
use crate::engine::{QueryAnswer, RagEngine, RagEngineFactory};
use crate::error::{Error, ExtractionError, Result};
use crate::ingestion::{DocumentExtractor, ExtractedPdf};
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::types::PdfMetadata;

/// What to put in a generated PDF
#[derive(Debug, Clone, Default)]
pub struct PdfSpec {
    /// One entry per page; an empty string yields a page without text
    pub pages: Vec<String>,
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Write a minimal PDF with a Type1 Courier font on every page
pub fn write_pdf(path: &Path, spec: &PdfSpec) {
    build_pdf(spec).save(path).expect("save generated pdf");
}

/// Write `spec` as a 40-bit RC4 (V1 R2) encrypted PDF.
///
/// Unlocked files carry no /U check value, so the empty user password
/// derives the right key. Locked files carry a /U value no empty password
/// matches.
pub fn write_encrypted_pdf(path: &Path, spec: &PdfSpec, locked: bool) {
    let mut doc = build_pdf(spec);

    let mut encrypt = dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "Length" => 40,
        "O" => Object::String(vec![0x5A; 32], StringFormat::Hexadecimal),
        "P" => -4,
    };
    if locked {
        encrypt.set("U", Object::String(vec![0xA5; 32], StringFormat::Hexadecimal));
    }
    let encrypt_id = doc.add_object(encrypt);
    doc.trailer.set("Encrypt", encrypt_id);
    let file_id = Object::String(b"pdf-rag-agent-id".to_vec(), StringFormat::Hexadecimal);
    doc.trailer.set("ID", vec![file_id.clone(), file_id]);

    let key = encryption::get_encryption_key(&doc, "", false).expect("derive rc4 key");

    // RC4 is symmetric, so the object decryption routine also encrypts
    let ids: Vec<ObjectId> = doc.objects.keys().copied().filter(|id| *id != encrypt_id).collect();
    for id in ids {
        let obj = doc.objects.get_mut(&id).expect("object id from key set");
        if let Ok(cipher) = encryption::decrypt_object(&key, id, &*obj) {
            match obj {
                Object::Stream(stream) => stream.set_content(cipher),
                Object::String(content, _) => *content = cipher,
                _ => {}
            }
        }
    }
    if let Ok(info_id) = doc.trailer.get(b"Info").and_then(Object::as_reference) {
        let info = doc
            .get_object_mut(info_id)
            .and_then(Object::as_dict_mut)
            .expect("info dictionary");
        for (_, value) in info.iter_mut() {
            if let Ok(cipher) = encryption::decrypt_object(&key, info_id, &*value) {
                if let Object::String(content, _) = value {
                    *content = cipher;
                }
            }
        }
    }

    doc.save(path).expect("save encrypted pdf");
}

fn build_pdf(spec: &PdfSpec) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in &spec.pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(text.as_str())]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content stream"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info = lopdf::Dictionary::new();
    if let Some(title) = &spec.title {
        info.set("Title", Object::string_literal(title.as_str()));
    }
    if let Some(author) = &spec.author {
        info.set("Author", Object::string_literal(author.as_str()));
    }
    if !info.is_empty() {
        let info_id = doc.add_object(Object::Dictionary(info));
        doc.trailer.set("Info", info_id);
    }

    doc
}

/// Embedder returning a fixed-size vector derived from byte counts
pub struct StubEmbedder;

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; 8];
        for b in text.bytes() {
            v[(b % 8) as usize] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        8
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Chat model echoing a fixed reply, or failing when `reply` is `None`
pub struct StubLlm {
    pub reply: Option<String>,
}

#[async_trait]
impl LlmProvider for StubLlm {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
        self.reply
            .clone()
            .ok_or_else(|| Error::llm("stub model unavailable"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.reply.is_some())
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

/// Chat model with a fixed reply that keeps every prompt it receives
pub struct RecordingLlm {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingLlm {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmProvider for RecordingLlm {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn model(&self) -> &str {
        "recording-model"
    }
}

/// Deriver that answers only after `delay`
pub struct SlowDeriver {
    pub delay: Duration,
}

#[async_trait]
impl Deriver for SlowDeriver {
    async fn summarize(&self, _text: &str, _max_len: usize) -> String {
        tokio::time::sleep(self.delay).await;
        "late summary".to_string()
    }

    async fn classify(&self, _text: &str) -> String {
        tokio::time::sleep(self.delay).await;
        "late label".to_string()
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// Extractor returning fixed text after an optional blocking delay
pub struct FixedExtractor {
    pub text: String,
    pub delay: Duration,
}

impl DocumentExtractor for FixedExtractor {
    fn extract(&self, _path: &Path) -> std::result::Result<ExtractedPdf, ExtractionError> {
        std::thread::sleep(self.delay);
        Ok(ExtractedPdf {
            text: self.text.clone(),
            metadata: PdfMetadata {
                page_count: Some(1),
                ..Default::default()
            },
        })
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Engine recording every inserted text
#[derive(Default)]
pub struct RecordingEngine {
    pub working_dir: PathBuf,
    pub inserted: Mutex<Vec<String>>,
    pub fail_inserts: bool,
    pub insert_delay: Duration,
}

#[async_trait]
impl RagEngine for RecordingEngine {
    async fn insert(&self, text: &str) -> Result<()> {
        if !self.insert_delay.is_zero() {
            tokio::time::sleep(self.insert_delay).await;
        }
        if self.fail_inserts {
            return Err(Error::indexing("engine rejected document"));
        }
        self.inserted.lock().push(text.to_string());
        Ok(())
    }

    async fn query(&self, question: &str, _top_k: usize) -> Result<QueryAnswer> {
        Ok(QueryAnswer {
            answer: format!("answer to {}", question),
            sources: Vec::new(),
        })
    }

    fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

/// Factory counting constructions; fails while `fail` is set
#[derive(Default)]
pub struct CountingFactory {
    pub constructions: AtomicUsize,
    pub fail: std::sync::atomic::AtomicBool,
    pub fail_inserts: bool,
    pub insert_delay: Duration,
    pub engine: Mutex<Option<Arc<RecordingEngine>>>,
}

impl CountingFactory {
    pub fn failing() -> Self {
        let factory = Self::default();
        factory.fail.store(true, Ordering::SeqCst);
        factory
    }

    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn inserted(&self) -> Vec<String> {
        self.engine
            .lock()
            .as_ref()
            .map(|e| e.inserted.lock().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RagEngineFactory for CountingFactory {
    async fn construct(
        &self,
        working_dir: &Path,
        _embedder: Arc<dyn EmbeddingProvider>,
        _llm: Arc<dyn LlmProvider>,
    ) -> Result<Arc<dyn RagEngine>> {
        self.constructions.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to pile up on the gate
        tokio::task::yield_now().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::engine_init("invalid credentials"));
        }
        let engine = Arc::new(RecordingEngine {
            working_dir: working_dir.to_path_buf(),
            fail_inserts: self.fail_inserts,
            insert_delay: self.insert_delay,
            ..Default::default()
        });
        *self.engine.lock() = Some(Arc::clone(&engine));
        Ok(engine)
    }
}
