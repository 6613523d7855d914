//! Term extraction for the vectorizer.
//!
//! Documents are split into word tokens of two or more word characters,
//! optionally filtered against the stop word list, and expanded into
//! contiguous n-grams joined by a single space.

use std::sync::LazyLock;

use regex::Regex;

use crate::analysis::StopWords;

/// Default token pattern: runs of at least two word characters.
pub const TOKEN_PATTERN: &str = r"\b\w\w+\b";

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TOKEN_PATTERN).expect("Default token pattern should be valid"));

/// Extracts n-gram terms from text.
#[derive(Debug, Clone)]
pub struct TermExtractor {
    ngram_range: (usize, usize),
    stop_words: Option<StopWords>,
}

impl TermExtractor {
    /// Create an extractor for the inclusive n-gram range.
    pub fn new(ngram_range: (usize, usize)) -> Self {
        TermExtractor {
            ngram_range,
            stop_words: None,
        }
    }

    /// Drop tokens found in `stop_words` before building n-grams.
    pub fn with_stop_words(mut self, stop_words: StopWords) -> Self {
        self.stop_words = Some(stop_words);
        self
    }

    /// The n-gram range.
    pub fn ngram_range(&self) -> (usize, usize) {
        self.ngram_range
    }

    /// Lowercased word tokens, stop words removed.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        TOKEN_REGEX
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|token| match &self.stop_words {
                Some(stop_words) => !stop_words.contains(token),
                None => true,
            })
            .map(str::to_string)
            .collect()
    }

    /// All n-gram terms of `text`, in document order, shortest n first.
    pub fn terms(&self, text: &str) -> Vec<String> {
        let tokens = self.tokens(text);
        let (min_n, max_n) = self.ngram_range;

        if (min_n, max_n) == (1, 1) {
            return tokens;
        }

        let mut terms = Vec::new();
        for n in min_n..=max_n.min(tokens.len()) {
            if n == 1 {
                terms.extend(tokens.iter().cloned());
            } else {
                terms.extend(tokens.windows(n).map(|window| window.join(" ")));
            }
        }
        terms
    }
}
