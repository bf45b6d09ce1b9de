//! Summary and classification derivation
//!
//! The agent depends only on [`Deriver`]. Two backends ship:
//! [`PlaceholderDeriver`] (deterministic, rule-based) and [`LlmDeriver`]
//! (chat-completion model, degrading to the placeholder output on error).
//!
//! Contract shared by every backend:
//! - empty input yields the "no input" marker, never an empty string
//! - `summarize` returns the input unchanged when it fits in `max_len` chars
//! - longer input yields at most `max_len` chars followed by
//!   [`TRUNCATION_MARKER`]

mod llm;
mod placeholder;

use async_trait::async_trait;

pub use llm::LlmDeriver;
pub use placeholder::PlaceholderDeriver;

/// Summary returned for empty input
pub const NO_SUMMARY_INPUT: &str = "No text provided for summarization.";

/// Label returned for empty input
pub const NO_CLASSIFICATION_INPUT: &str = "No text provided for classification.";

/// Appended to a summary cut at `max_len` characters
pub const TRUNCATION_MARKER: &str = "...";

/// Label produced by the rule-based backend
pub const PLACEHOLDER_LABEL: &str = "[Placeholder Classification]: General Legal Document";

/// Summary and classification capability
#[async_trait]
pub trait Deriver: Send + Sync {
    /// Bounded summary of `text`
    async fn summarize(&self, text: &str, max_len: usize) -> String;

    /// Short classification label for `text`
    async fn classify(&self, text: &str) -> String;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Cut `text` to `max_len` chars plus the truncation marker, or return it
/// unchanged when it already fits
pub fn bound_length(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
