//! Rule-based derivation backend

use async_trait::async_trait;

use super::{
    bound_length, Deriver, NO_CLASSIFICATION_INPUT, NO_SUMMARY_INPUT, PLACEHOLDER_LABEL,
};

/// Deterministic derivation: the summary is the leading text, the label is
/// fixed. Used in tests and as the fallback of the model backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderDeriver;

impl PlaceholderDeriver {
    pub fn summarize_sync(&self, text: &str, max_len: usize) -> String {
        if text.is_empty() {
            return NO_SUMMARY_INPUT.to_string();
        }
        bound_length(text, max_len)
    }

    pub fn classify_sync(&self, text: &str) -> String {
        if text.is_empty() {
            return NO_CLASSIFICATION_INPUT.to_string();
        }
        PLACEHOLDER_LABEL.to_string()
    }
}

#[async_trait]
impl Deriver for PlaceholderDeriver {
    async fn summarize(&self, text: &str, max_len: usize) -> String {
        tracing::debug!("Placeholder summarization of {} chars", text.len());
        self.summarize_sync(text, max_len)
    }

    async fn classify(&self, text: &str) -> String {
        tracing::debug!("Placeholder classification of {} chars", text.len());
        self.classify_sync(text)
    }

    fn name(&self) -> &str {
        "placeholder"
    }
}
