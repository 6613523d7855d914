//! TF-IDF vocabulary model.

use std::collections::HashMap;
use std::fmt;

use ahash::{AHashMap, AHashSet};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::StopWords;
use crate::error::{JobCheckError, ModelStateError, Result};
use crate::feature::config::VectorizerConfig;
use crate::feature::tokenizer::TermExtractor;
use crate::feature::vector::FeatureVector;

/// Learned term vocabulary with IDF weights.
///
/// A model starts unfitted. [`fit`](Self::fit) learns the vocabulary once;
/// after that the model is read-only and [`transform`](Self::transform) maps
/// text to L2-normalized TF-IDF vectors of fixed [`dimension`](Self::dimension).
///
/// Terms are indexed in lexicographic order, so two models fitted on the same
/// corpus with the same configuration are identical.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "StoredVocabulary", into = "StoredVocabulary")]
pub struct VocabularyModel {
    config: VectorizerConfig,
    extractor: TermExtractor,
    fitted: Option<FittedVocabulary>,
}

#[derive(Clone)]
struct FittedVocabulary {
    terms: Vec<String>,
    index: HashMap<String, u32>,
    idf: Vec<f64>,
    n_documents: usize,
    fingerprint: u32,
}

/// Serialized form of a [`VocabularyModel`]. The term index is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct StoredVocabulary {
    config: VectorizerConfig,
    terms: Vec<String>,
    idf: Vec<f64>,
    n_documents: usize,
    fingerprint: u32,
    fitted: bool,
}

impl fmt::Debug for VocabularyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VocabularyModel")
            .field("fitted", &self.is_fitted())
            .field("dimension", &self.dimension())
            .field("n_documents", &self.n_documents())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for VocabularyModel {
    fn default() -> Self {
        Self::new(VectorizerConfig::default())
    }
}

fn extractor_for(config: &VectorizerConfig) -> TermExtractor {
    let extractor = TermExtractor::new(config.ngram_range);
    if config.stop_words {
        extractor.with_stop_words(StopWords::english())
    } else {
        extractor
    }
}

/// CRC-32 over the dimension and the ordered term list.
fn fingerprint(terms: &[String]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&(terms.len() as u64).to_le_bytes());
    for term in terms {
        hasher.update(term.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

impl VocabularyModel {
    /// Create an unfitted model.
    pub fn new(config: VectorizerConfig) -> Self {
        let extractor = extractor_for(&config);
        VocabularyModel {
            config,
            extractor,
            fitted: None,
        }
    }

    /// The configuration this model was created with.
    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    /// Check if the vocabulary has been learned.
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Learn the vocabulary and IDF weights from cleaned documents.
    ///
    /// Terms outside the document-frequency bounds are dropped, then the
    /// `max_features` most frequent terms across the corpus are kept.
    ///
    /// # Panics
    ///
    /// Panics if the model is already fitted; fitted models are immutable.
    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        assert!(
            !self.is_fitted(),
            "VocabularyModel::fit called on an already fitted model"
        );
        self.config.validate()?;

        let n_documents = documents.len();
        if n_documents == 0 {
            return Err(ModelStateError::EmptyVocabulary("corpus has no documents".into()).into());
        }

        let extracted: Vec<Vec<String>> = documents
            .par_iter()
            .map(|doc| self.extractor.terms(doc))
            .collect();

        let mut document_frequency: AHashMap<&str, usize> = AHashMap::new();
        let mut term_frequency: AHashMap<&str, u64> = AHashMap::new();
        for terms in &extracted {
            let mut seen = AHashSet::new();
            for term in terms {
                *term_frequency.entry(term.as_str()).or_insert(0) += 1;
                if seen.insert(term.as_str()) {
                    *document_frequency.entry(term.as_str()).or_insert(0) += 1;
                }
            }
        }

        if document_frequency.is_empty() {
            return Err(ModelStateError::EmptyVocabulary(
                "documents contain only stop words or single-character tokens".into(),
            )
            .into());
        }

        let min_count = self.config.min_df.resolve(n_documents);
        let max_count = self.config.max_df.resolve(n_documents);
        if max_count < min_count {
            return Err(JobCheckError::config(format!(
                "max_df ({max_count}) corresponds to fewer documents than min_df ({min_count})"
            )));
        }

        let mut candidates: Vec<(&str, usize, u64)> = document_frequency
            .iter()
            .filter(|(_, df)| {
                let df = **df as f64;
                df >= min_count && df <= max_count
            })
            .map(|(term, df)| (*term, *df, term_frequency[term]))
            .collect();

        if candidates.is_empty() {
            return Err(ModelStateError::EmptyVocabulary(
                "no terms remain after document-frequency pruning; lower min_df or raise max_df".into(),
            )
            .into());
        }

        if let Some(limit) = self.config.max_features {
            if candidates.len() > limit {
                candidates.sort_unstable_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(b.0)));
                candidates.truncate(limit);
            }
        }
        candidates.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let n = n_documents as f64;
        let terms: Vec<String> = candidates.iter().map(|(term, _, _)| term.to_string()).collect();
        let idf: Vec<f64> = candidates
            .iter()
            .map(|(_, df, _)| ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();

        debug!(
            "Fitted vocabulary: {} of {} candidate terms over {} documents",
            terms.len(),
            document_frequency.len(),
            n_documents
        );

        self.fitted = Some(FittedVocabulary::new(terms, idf, n_documents));
        Ok(())
    }

    /// Fit on `documents` and return their vectors.
    pub fn fit_transform(&mut self, documents: &[String]) -> Result<Vec<FeatureVector>> {
        self.fit(documents)?;
        self.transform_batch(documents)
    }

    /// Map cleaned text to an L2-normalized TF-IDF vector.
    ///
    /// Terms outside the vocabulary are ignored; text with no known terms
    /// maps to the zero vector.
    pub fn transform(&self, text: &str) -> Result<FeatureVector> {
        let fitted = self.fitted.as_ref().ok_or(ModelStateError::NotFitted)?;

        let mut counts: AHashMap<u32, f64> = AHashMap::new();
        for term in self.extractor.terms(text) {
            if let Some(&index) = fitted.index.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut pairs: Vec<(u32, f64)> = counts
            .into_iter()
            .map(|(index, count)| {
                let tf = if self.config.sublinear_tf {
                    1.0 + count.ln()
                } else {
                    count
                };
                (index, tf * fitted.idf[index as usize])
            })
            .collect();
        // Summation order must not depend on hash iteration order.
        pairs.sort_unstable_by_key(|&(index, _)| index);

        let norm = pairs.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, value) in &mut pairs {
                *value /= norm;
            }
        }

        FeatureVector::from_pairs(fitted.terms.len(), pairs)
    }

    /// Transform many documents in parallel, preserving order.
    pub fn transform_batch(&self, documents: &[String]) -> Result<Vec<FeatureVector>> {
        if !self.is_fitted() {
            return Err(ModelStateError::NotFitted.into());
        }
        documents.par_iter().map(|doc| self.transform(doc)).collect()
    }

    /// Number of terms; zero before fitting.
    pub fn dimension(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.terms.len())
    }

    /// Terms in index order.
    pub fn vocabulary(&self) -> &[String] {
        self.fitted.as_ref().map_or(&[], |f| f.terms.as_slice())
    }

    /// Index of `term`, if it is in the vocabulary.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.fitted
            .as_ref()
            .and_then(|f| f.index.get(term))
            .map(|&i| i as usize)
    }

    /// IDF weights in index order.
    pub fn idf(&self) -> &[f64] {
        self.fitted.as_ref().map_or(&[], |f| f.idf.as_slice())
    }

    /// Documents seen during fitting.
    pub fn n_documents(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.n_documents)
    }

    /// Identity of the learned vocabulary; `None` before fitting.
    ///
    /// Classifiers record this value so a mismatched pairing is caught at load.
    pub fn fingerprint(&self) -> Option<u32> {
        self.fitted.as_ref().map(|f| f.fingerprint)
    }
}

impl FittedVocabulary {
    fn new(terms: Vec<String>, idf: Vec<f64>, n_documents: usize) -> Self {
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i as u32))
            .collect();
        let fingerprint = fingerprint(&terms);
        FittedVocabulary {
            terms,
            index,
            idf,
            n_documents,
            fingerprint,
        }
    }
}

impl From<VocabularyModel> for StoredVocabulary {
    fn from(model: VocabularyModel) -> Self {
        match model.fitted {
            Some(fitted) => StoredVocabulary {
                config: model.config,
                terms: fitted.terms,
                idf: fitted.idf,
                n_documents: fitted.n_documents,
                fingerprint: fitted.fingerprint,
                fitted: true,
            },
            None => StoredVocabulary {
                config: model.config,
                terms: Vec::new(),
                idf: Vec::new(),
                n_documents: 0,
                fingerprint: 0,
                fitted: false,
            },
        }
    }
}

impl TryFrom<StoredVocabulary> for VocabularyModel {
    type Error = JobCheckError;

    fn try_from(stored: StoredVocabulary) -> Result<Self> {
        let mut model = VocabularyModel::new(stored.config);
        if !stored.fitted {
            return Ok(model);
        }

        if stored.terms.len() != stored.idf.len() {
            return Err(JobCheckError::artifact(format!(
                "vocabulary has {} terms but {} idf weights",
                stored.terms.len(),
                stored.idf.len()
            )));
        }
        if stored.terms.windows(2).any(|w| w[0] >= w[1]) {
            return Err(JobCheckError::artifact("vocabulary terms are not strictly ordered"));
        }

        let fitted = FittedVocabulary::new(stored.terms, stored.idf, stored.n_documents);
        if fitted.fingerprint != stored.fingerprint {
            return Err(JobCheckError::artifact(format!(
                "vocabulary fingerprint {:08x} does not match stored {:08x}",
                fitted.fingerprint, stored.fingerprint
            )));
        }
        model.fitted = Some(fitted);
        Ok(model)
    }
}
