//! Model-backed classification

use async_trait::async_trait;
use std::sync::Arc;

use super::placeholder::PlaceholderDeriver;
use super::{bound_length, Deriver, NO_CLASSIFICATION_INPUT};
use crate::prompt::PromptBuilder;
use crate::providers::LlmProvider;

/// Longest label kept from a model reply
const MAX_LABEL_CHARS: usize = 100;

/// Classification through a chat-completion model.
///
/// Summaries are always the leading text of the document, cut at `max_len`
/// chars, so the bounded-prefix shape holds whatever the model says. A
/// failed or empty model reply degrades to the placeholder label so that
/// derivation itself never fails.
pub struct LlmDeriver {
    llm: Arc<dyn LlmProvider>,
    labels: Vec<String>,
    fallback: PlaceholderDeriver,
}

impl LlmDeriver {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            labels: Vec::new(),
            fallback: PlaceholderDeriver,
        }
    }

    /// Restrict classification to a fixed label vocabulary
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }
}

#[async_trait]
impl Deriver for LlmDeriver {
    async fn summarize(&self, text: &str, max_len: usize) -> String {
        self.fallback.summarize_sync(text, max_len)
    }

    async fn classify(&self, text: &str) -> String {
        if text.is_empty() {
            return NO_CLASSIFICATION_INPUT.to_string();
        }

        let prompt = PromptBuilder::classification_prompt(text, &self.labels);
        let reply = match self
            .llm
            .complete(PromptBuilder::classification_system(), &prompt)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Classification via {} failed: {}, using placeholder", self.llm.name(), e);
                return self.fallback.classify_sync(text);
            }
        };

        let label = reply
            .lines()
            .map(|l| l.trim().trim_matches(|c| c == '"' || c == '.' || c == '*'))
            .find(|l| !l.is_empty());

        match label {
            Some(label) => bound_length(label, MAX_LABEL_CHARS),
            None => self.fallback.classify_sync(text),
        }
    }

    fn name(&self) -> &str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::{NO_SUMMARY_INPUT, PLACEHOLDER_LABEL, TRUNCATION_MARKER};
    use crate::test_support::StubLlm;

    fn deriver(reply: Option<&str>) -> LlmDeriver {
        LlmDeriver::new(Arc::new(StubLlm {
            reply: reply.map(str::to_string),
        }))
    }

    #[tokio::test]
    async fn test_empty_input_never_calls_model() {
        let d = deriver(None);
        assert_eq!(d.summarize("", 10).await, NO_SUMMARY_INPUT);
        assert_eq!(d.classify("").await, NO_CLASSIFICATION_INPUT);
    }

    #[tokio::test]
    async fn test_short_text_returned_verbatim() {
        let d = deriver(Some("ignored"));
        assert_eq!(d.summarize("Hello World", 50).await, "Hello World");
    }

    #[tokio::test]
    async fn test_long_summary_is_input_prefix_plus_marker() {
        let text = "The quick brown fox jumps over the lazy dog";
        for reply in [Some("Short."), Some("  A very long model summary that keeps going  "), None] {
            let summary = deriver(reply).summarize(text, 10).await;
            assert_eq!(summary, format!("The quick {}", TRUNCATION_MARKER));
        }
    }

    #[tokio::test]
    async fn test_whitespace_is_classified_by_model() {
        let d = deriver(Some("Blank Page"));
        assert_eq!(d.summarize("   ", 10).await, "   ");
        assert_eq!(d.classify("   ").await, "Blank Page");
    }

    #[tokio::test]
    async fn test_model_failure_falls_back() {
        let d = deriver(None);
        let text = "abcdefghijklmnop";
        assert_eq!(d.summarize(text, 4).await, "abcd...");
        assert_eq!(d.classify(text).await, PLACEHOLDER_LABEL);
    }

    #[tokio::test]
    async fn test_label_is_first_line() {
        let d = deriver(Some("\n\"Employment Contract\".\nBecause it mentions salary."))
            .with_labels(vec!["Employment Contract".to_string()]);
        assert_eq!(d.classify("The employee shall...").await, "Employment Contract");
    }
}
