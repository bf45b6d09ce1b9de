//! OpenAI-compatible client for chat completion and embeddings, with retry

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::{EmbeddingProvider, LlmProvider};

/// HTTP client for an OpenAI-compatible API
pub struct OpenAiClient {
    client: Client,
    config: LlmConfig,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiClient {
    /// Create a client with the given credential
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key: api_key.into(),
        })
    }

    /// Create a client, resolving the credential from the config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        Self::new(config, api_key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        let delay = backoff_delay(attempt);
                        tracing::warn!(
                            "Request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.config.max_retries.saturating_add(1),
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::llm("Unknown error")))
    }

    /// Check that the API answers with this credential
    pub async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(self.url("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Single-turn chat completion
    pub async fn chat(&self, system: &str, prompt: &str) -> Result<String> {
        let url = self.url("chat/completions");
        let url = url.as_str();
        let this = self;

        self.retry_request(move || async move {
            let request = ChatRequest {
                model: &this.config.chat_model,
                messages: vec![
                    ChatMessage { role: "system", content: system },
                    ChatMessage { role: "user", content: prompt },
                ],
                temperature: this.config.temperature,
            };

            let response = this
                .client
                .post(url)
                .bearer_auth(&this.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::llm(format!("Chat request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(Error::llm(format!("Chat failed: HTTP {}", response.status())));
            }

            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| Error::llm(format!("Invalid chat response: {}", e)))?;

            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| Error::llm("Chat response contained no message"))
        })
        .await
    }

    /// Embed a batch of texts; output order matches input order
    pub async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.url("embeddings");
        let url = url.as_str();
        let this = self;

        self.retry_request(move || async move {
            let request = EmbedRequest {
                model: &this.config.embed_model,
                input: texts,
            };

            let response = this
                .client
                .post(url)
                .bearer_auth(&this.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(Error::embedding(format!(
                    "Embedding failed: HTTP {}",
                    response.status()
                )));
            }

            let mut parsed: EmbedResponse = response
                .json()
                .await
                .map_err(|e| Error::embedding(format!("Invalid embedding response: {}", e)))?;

            if parsed.data.len() != texts.len() {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    texts.len(),
                    parsed.data.len()
                )));
            }
            parsed.data.sort_by_key(|d| d.index);
            Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
        })
        .await
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }
}

/// Embedding provider backed by the `/embeddings` endpoint
pub struct OpenAiEmbedder {
    client: Arc<OpenAiClient>,
}

impl OpenAiEmbedder {
    pub fn from_client(client: Arc<OpenAiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.client.embed_many(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| Error::embedding("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed_many(texts).await
    }

    fn dimensions(&self) -> usize {
        self.client.config().dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Chat-completion provider backed by `/chat/completions`
pub struct OpenAiLlm {
    client: Arc<OpenAiClient>,
}

impl OpenAiLlm {
    pub fn from_client(client: Arc<OpenAiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LlmProvider for OpenAiLlm {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        self.client.chat(system, prompt).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.client.config().chat_model
    }
}

/// Longest wait between retries
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Exponential delay before retry `attempt + 1`: 1s, 2s, 4s, ... capped at
/// [`MAX_BACKOFF`]
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt)).min(MAX_BACKOFF)
}
