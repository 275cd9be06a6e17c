//! Summarizer that needs no model: the leading sentences of the text, one
//! per line.

use crate::backend::Summarizer;
use crate::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Regex matching bracketed citation markers like `[12]`.
static CITATION_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d+\]").unwrap());

/// Regex matching a sentence end: terminal punctuation followed by whitespace.
static SENTENCE_END_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Default number of sentences kept.
pub const DEFAULT_SENTENCE_COUNT: usize = 5;

/// Split text into trimmed, non-empty sentences, citation markers removed.
pub fn split_sentences(text: &str) -> Vec<String> {
    let cleaned = CITATION_REGEX.replace_all(text, "").replace('\n', " ");

    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END_REGEX.find_iter(&cleaned) {
        // Keep the punctuation, drop the whitespace.
        let end = m.start() + 1;
        sentences.push(cleaned[start..end].trim().to_string());
        start = m.end();
    }
    sentences.push(cleaned[start..].trim().to_string());

    sentences.retain(|s| !s.is_empty());
    sentences
}

/// Returns the first few sentences of the text as bullet lines.
#[derive(Debug, Clone)]
pub struct SentenceSummarizer {
    max_sentences: usize,
}

impl Default for SentenceSummarizer {
    fn default() -> Self {
        Self {
            max_sentences: DEFAULT_SENTENCE_COUNT,
        }
    }
}

impl SentenceSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_sentences(mut self, max: usize) -> Self {
        self.max_sentences = max.max(1);
        self
    }
}

impl Summarizer for SentenceSummarizer {
    fn summarize(&self, text: &str) -> Result<String> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Err(Error::SummarizerUnavailable(
                "no sentences in text".to_string(),
            ));
        }

        Ok(sentences
            .into_iter()
            .take(self.max_sentences)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("Neurons fire. Weights adjust! Does it learn? Yes");
        assert_eq!(
            sentences,
            vec!["Neurons fire.", "Weights adjust!", "Does it learn?", "Yes"]
        );
    }

    #[test]
    fn test_split_sentences_strips_citations() {
        let sentences = split_sentences("Backprop works[3]. See\nalso [12] this.");
        assert_eq!(sentences, vec!["Backprop works.", "See also  this."]);
    }

    #[test]
    fn test_decimal_points_do_not_split() {
        assert_eq!(split_sentences("Pi is 3.14 roughly."), vec!["Pi is 3.14 roughly."]);
    }

    #[test]
    fn test_summarize_keeps_leading_sentences() {
        let summarizer = SentenceSummarizer::new().with_max_sentences(2);
        let summary = summarizer.summarize("One. Two. Three.").unwrap();
        assert_eq!(summary, "One.\nTwo.");
    }

    #[test]
    fn test_summarize_empty_text_is_unavailable() {
        let result = SentenceSummarizer::new().summarize("   ");
        assert!(matches!(result, Err(Error::SummarizerUnavailable(_))));
    }
}
