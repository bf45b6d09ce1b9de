//! Prompt templates for classification and RAG queries

/// Longest document excerpt sent to the model for classification, in
/// characters
pub const MAX_PROMPT_CHARS: usize = 12_000;

/// Prompt builder for model-backed stages
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn classification_system() -> &'static str {
        "You classify documents. Reply with a single short label on one line and nothing else."
    }

    /// Classification request, optionally restricted to a label vocabulary
    pub fn classification_prompt(text: &str, labels: &[String]) -> String {
        let vocabulary = if labels.is_empty() {
            String::new()
        } else {
            format!("Choose exactly one of: {}.\n\n", labels.join(", "))
        };
        format!(
            "What kind of document is this?\n{vocabulary}DOCUMENT:\n{document}",
            vocabulary = vocabulary,
            document = Self::excerpt(text),
        )
    }

    pub fn rag_system() -> &'static str {
        "You are a document-grounded assistant. Use only the provided context. If the answer \
         is not in the context, say that the information is not available in the indexed \
         documents."
    }

    /// Grounded question over numbered context passages
    pub fn rag_prompt(question: &str, passages: &[&str]) -> String {
        let mut context = String::new();
        for (i, passage) in passages.iter().enumerate() {
            context.push_str(&format!("[{}]\n{}\n\n---\n\n", i + 1, passage));
        }
        format!(
            "CONTEXT:\n{context}QUESTION: {question}\n\nAnswer using only the context above and \
             cite passages as [n]:",
            context = context,
            question = question,
        )
    }

    /// Leading part of a document that fits the prompt budget
    fn excerpt(text: &str) -> &str {
        match text.char_indices().nth(MAX_PROMPT_CHARS) {
            Some((byte_idx, _)) => &text[..byte_idx],
            None => text,
        }
    }
}
