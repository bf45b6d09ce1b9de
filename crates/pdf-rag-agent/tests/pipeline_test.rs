//! Integration tests for the full ingestion pipeline.
//!
//! Tests the complete flow: extract → derive → chunk → embed → store → query.

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_rag_agent::config::ChunkingConfig;
use pdf_rag_agent::engine::STORE_FILE;
use pdf_rag_agent::providers::{EmbeddingProvider, LlmProvider};
use pdf_rag_agent::{
    extract_metadata, extract_text, AgentConfig, Deriver, DocumentAgent, EngineState, Error,
    IndexingStatus, LlmDeriver, LocalEngineFactory, PdfExtractor, PlaceholderDeriver,
    RagEngineHandle,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

const TEST_DIM: usize = 16;

/// Mock embedder: letter frequencies, so related texts land close together
struct MockEmbedder;

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> pdf_rag_agent::Result<Vec<f32>> {
        let mut v = vec![0.0f32; TEST_DIM];
        for c in text.to_lowercase().chars().filter(|c| c.is_ascii_alphabetic()) {
            v[(c as usize - 'a' as usize) % TEST_DIM] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }

    async fn health_check(&self) -> pdf_rag_agent::Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "mock-embedder"
    }
}

/// Mock chat model with a canned reply
struct MockLlm {
    reply: &'static str,
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn complete(&self, _system: &str, _prompt: &str) -> pdf_rag_agent::Result<String> {
        Ok(self.reply.to_string())
    }

    async fn health_check(&self) -> pdf_rag_agent::Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "mock-llm"
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

fn create_pdf(path: &Path, pages: &[&str], title: Option<&str>) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
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

    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
        });
        doc.trailer.set("Info", info_id);
    }

    doc.save(path).unwrap();
}

fn create_agent(deriver: Arc<dyn Deriver>) -> DocumentAgent {
    let mut config = AgentConfig::default();
    config.agent.max_concurrent_documents = 2;

    let factory = Arc::new(LocalEngineFactory::new(ChunkingConfig::default()).verify_providers(true));
    let engine = RagEngineHandle::new(
        factory,
        Arc::new(MockEmbedder),
        Arc::new(MockLlm {
            reply: "Payment is due within thirty days.",
        }),
    );
    DocumentAgent::with_components(config, Arc::new(PdfExtractor::default()), deriver, engine)
}

fn contract_pdfs(dir: &Path) -> Vec<PathBuf> {
    let contract = dir.join("contract.pdf");
    create_pdf(
        &contract,
        &["Payment is due within thirty days.", "Late fees apply."],
        Some("Services Agreement"),
    );
    let memo = dir.join("memo.pdf");
    create_pdf(&memo, &["Quarterly meeting moved to Friday."], None);
    vec![contract, memo]
}

#[tokio::test]
async fn test_index_and_query_pipeline() {
    let temp = tempdir().unwrap();
    let store_dir = temp.path().join("rag_store");
    let agent = create_agent(Arc::new(PlaceholderDeriver));

    let state = agent.initialize_engine(&store_dir).await;
    assert_eq!(
        state,
        EngineState::Ready {
            working_dir: store_dir.clone()
        }
    );

    let paths = contract_pdfs(temp.path());
    let records = agent.process_and_index_batch(&paths).await;

    assert_eq!(records.len(), 2);
    for record in &records {
        assert!(record.error.is_none(), "unexpected error: {:?}", record.error);
        assert_eq!(record.indexing_status, Some(IndexingStatus::Submitted));
    }
    assert_eq!(
        records[0].summary.as_deref(),
        Some("Payment is due within thirty days.\nLate fees apply.")
    );
    assert_eq!(
        records[0].metadata.as_ref().and_then(|m| m.page_count),
        Some(2)
    );
    assert!(store_dir.join(STORE_FILE).is_file());

    let answer = agent.query("When is payment due?", 2).await.unwrap();
    assert_eq!(answer.answer, "Payment is due within thirty days.");
    assert!(!answer.sources.is_empty());
    assert!(answer.sources.len() <= 2);
}

#[tokio::test]
async fn test_store_survives_restart() {
    let temp = tempdir().unwrap();
    let store_dir = temp.path().join("rag_store");
    let paths = contract_pdfs(temp.path());

    {
        let agent = create_agent(Arc::new(PlaceholderDeriver));
        agent.initialize_engine(&store_dir).await;
        agent.process_and_index_batch(&paths).await;
    }

    let agent = create_agent(Arc::new(PlaceholderDeriver));
    agent.initialize_engine(&store_dir).await;
    let answer = agent.query("meeting", 1).await.unwrap();
    assert_eq!(answer.sources.len(), 1);
}

#[tokio::test]
async fn test_llm_derivation_backend() {
    let temp = tempdir().unwrap();
    let paths = contract_pdfs(temp.path());
    let deriver = LlmDeriver::new(Arc::new(MockLlm { reply: "Contract" }));
    let agent = create_agent(Arc::new(deriver));

    let record = agent.process(&paths[0]).await;

    assert_eq!(record.classification.as_deref(), Some("Contract"));
    // The summary is the document's own leading text, not the model reply
    assert_eq!(
        record.summary.as_deref(),
        Some("Payment is due within thirty days.\nLate fees apply.")
    );
    assert_eq!(record.indexing_status, Some(IndexingStatus::NotAttempted));
}

#[tokio::test]
async fn test_bad_inputs_become_error_records() {
    let temp = tempdir().unwrap();
    let corrupt = temp.path().join("corrupt.pdf");
    std::fs::write(&corrupt, b"%PDF-1.4 this is not a real pdf").unwrap();
    let missing = temp.path().join("missing.pdf");

    let agent = create_agent(Arc::new(PlaceholderDeriver));
    agent.initialize_engine(temp.path().join("rag_store")).await;
    let records = agent.process_and_index_batch(&[&corrupt, &missing]).await;

    assert!(records.iter().all(|r| r.is_error()));
    assert!(records.iter().all(|r| r.indexing_status.is_none()));
    assert!(records[1].error.as_deref().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_record_json_shape() {
    let temp = tempdir().unwrap();
    let paths = contract_pdfs(temp.path());
    let agent = create_agent(Arc::new(PlaceholderDeriver));

    let ok = serde_json::to_value(agent.process_and_index(&paths[1]).await).unwrap();
    assert_eq!(ok["sourcePath"], paths[1].to_str().unwrap());
    assert_eq!(ok["fullTextLength"], 34);
    assert_eq!(ok["indexingStatus"]["status"], "skipped-not-initialized");
    assert!(ok.get("error").is_none());

    let failed =
        serde_json::to_value(agent.process(temp.path().join("nope.pdf")).await).unwrap();
    assert!(failed["error"].is_string());
    assert!(failed.get("summary").is_none());
    assert!(failed.get("metadata").is_none());
}

#[test]
fn test_free_extraction_functions() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("titled.pdf");
    create_pdf(&path, &["Hello World"], Some("Greeting"));

    assert_eq!(extract_text(&path), "Hello World");
    let outcome = extract_metadata(&path);
    assert_eq!(outcome.metadata().and_then(|m| m.title.as_deref()), Some("Greeting"));

    let missing = temp.path().join("missing.pdf");
    assert_eq!(extract_text(&missing), "");
    assert!(extract_metadata(&missing).is_error());
}

#[test]
fn test_missing_credential_fails_construction() {
    let mut config = AgentConfig::default();
    config.llm.api_key = None;
    config.llm.api_key_env = "PDF_RAG_AGENT_TEST_KEY_THAT_IS_NEVER_SET".to_string();

    match DocumentAgent::new(config) {
        Err(Error::Config(message)) => {
            assert!(message.contains("PDF_RAG_AGENT_TEST_KEY_THAT_IS_NEVER_SET"))
        }
        Err(other) => panic!("expected config error, got {}", other),
        Ok(_) => panic!("construction should fail without a credential"),
    }
}

#[test]
fn test_explicit_credential_builds_uninitialized_agent() {
    let mut config = AgentConfig::default();
    config.llm.api_key = Some("sk-test".to_string());

    let agent = DocumentAgent::new(config).unwrap();
    assert_eq!(agent.engine_state(), EngineState::Uninitialized);
}
