//! Vectorizer configuration.

use serde::{Deserialize, Serialize};

use crate::error::{JobCheckError, Result};

/// A document-frequency bound, absolute or relative to the corpus size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFrequency {
    /// Absolute number of documents.
    Count(usize),
    /// Fraction of the corpus in `[0, 1]`.
    Proportion(f64),
}

impl DocumentFrequency {
    /// Resolve the bound to a document count for a corpus of `n_documents`.
    pub fn resolve(&self, n_documents: usize) -> f64 {
        match *self {
            DocumentFrequency::Count(count) => count as f64,
            DocumentFrequency::Proportion(fraction) => fraction * n_documents as f64,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if let DocumentFrequency::Proportion(fraction) = *self {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(JobCheckError::config(format!(
                    "{name} proportion must be in [0, 1], got {fraction}"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for fitting a [`VocabularyModel`](super::VocabularyModel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// Keep at most this many terms, by corpus frequency.
    pub max_features: Option<usize>,
    /// Inclusive `(min, max)` n-gram lengths.
    pub ngram_range: (usize, usize),
    /// Drop terms in fewer documents than this.
    pub min_df: DocumentFrequency,
    /// Drop terms in more documents than this.
    pub max_df: DocumentFrequency,
    /// Drop English stop words before building n-grams.
    pub stop_words: bool,
    /// Use `1 + ln(tf)` instead of raw term counts.
    pub sublinear_tf: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: Some(5000),
            ngram_range: (1, 2),
            min_df: DocumentFrequency::Count(2),
            max_df: DocumentFrequency::Proportion(0.95),
            stop_words: true,
            sublinear_tf: false,
        }
    }
}

impl VectorizerConfig {
    /// Check the configuration values.
    pub fn validate(&self) -> Result<()> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(JobCheckError::config(format!(
                "ngram_range must satisfy 1 <= min <= max, got ({min_n}, {max_n})"
            )));
        }
        if self.max_features == Some(0) {
            return Err(JobCheckError::config("max_features must be positive"));
        }
        self.min_df.validate("min_df")?;
        self.max_df.validate("max_df")?;
        Ok(())
    }
}
