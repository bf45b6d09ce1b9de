//! Sentence-aware text chunking for the local engine

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in bytes
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
    /// Minimum chunk size
    min_size: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize, min_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap: overlap.min(chunk_size / 2),
            min_size,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap, config.min_chunk_size)
    }

    /// Split text into overlapping chunks on sentence boundaries.
    ///
    /// Non-empty text always yields at least one chunk. Text shorter than
    /// the minimum size is merged into a neighbouring chunk, never dropped.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        // Bytes at the start of `current` repeated from the previous chunk
        let mut carried = 0;

        for sentence in text.split_sentence_bounds() {
            let body = current.trim();
            if body.len() >= self.min_size.max(1)
                && current.len() + sentence.len() > self.chunk_size
            {
                chunks.push(body.to_string());
                current = self.overlap_tail(&current);
                carried = current.len();
            }
            current.push_str(sentence);
        }

        let fresh = current[carried..].trim();
        if !fresh.is_empty() {
            let tail = current.trim();
            match chunks.last_mut() {
                Some(last) if tail.len() < self.min_size => {
                    last.push(' ');
                    last.push_str(fresh);
                }
                _ => chunks.push(tail.to_string()),
            }
        }

        chunks
    }

    /// Trailing part of a chunk carried into the next one
    fn overlap_tail(&self, text: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }
        if text.len() <= self.overlap {
            return text.to_string();
        }

        let mut start = text.len() - self.overlap;
        while start > 0 && !text.is_char_boundary(start) {
            start -= 1;
        }
        let tail = &text[start..];

        // Prefer starting at a sentence, then a word boundary
        if let Some(pos) = tail.find(". ") {
            let rest = &tail[pos + 2..];
            if !rest.trim().is_empty() {
                return rest.to_string();
            }
        }
        if let Some(pos) = tail.find(' ') {
            return tail[pos + 1..].to_string();
        }
        tail.to_string()
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}
