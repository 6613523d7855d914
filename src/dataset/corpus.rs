//! Labeled, normalized training corpus.

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::TextNormalizer;
use crate::dataset::record::{Label, RawRecord};
use crate::error::{JobCheckError, Result};

/// Cleaned posting texts with their labels, row-aligned.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    texts: Vec<String>,
    labels: Vec<Label>,
}

/// Summary statistics gathered while preparing a corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Records read from the source.
    pub records: usize,
    /// Records kept after normalization.
    pub kept: usize,
    /// Records dropped because their cleaned text was empty.
    pub dropped_empty: usize,
    /// Kept records labeled Real.
    pub real: usize,
    /// Kept records labeled Fake.
    pub fake: usize,
    /// Records without requirements text.
    pub missing_requirements: usize,
    /// Records without benefits text.
    pub missing_benefits: usize,
    /// Mean merged text length before cleaning, in characters.
    pub mean_raw_length: f64,
    /// Mean cleaned text length, in characters.
    pub mean_clean_length: f64,
}

impl CorpusStats {
    /// Fraction of kept records labeled Fake.
    pub fn fake_ratio(&self) -> f64 {
        if self.kept == 0 {
            0.0
        } else {
            self.fake as f64 / self.kept as f64
        }
    }
}

impl Corpus {
    /// Build a corpus directly from cleaned texts and labels.
    pub fn new(texts: Vec<String>, labels: Vec<Label>) -> Result<Self> {
        if texts.len() != labels.len() {
            return Err(JobCheckError::data(format!(
                "corpus has {} texts but {} labels",
                texts.len(),
                labels.len()
            )));
        }
        Ok(Corpus { texts, labels })
    }

    /// Normalize labeled records, dropping rows whose cleaned text is empty.
    ///
    /// Every record must carry a label.
    pub fn prepare(records: &[RawRecord], normalizer: &TextNormalizer) -> Result<(Self, CorpusStats)> {
        if let Some(position) = records.iter().position(|r| r.label.is_none()) {
            return Err(JobCheckError::data(format!(
                "record {} has no label; training data must be labeled",
                position + 1
            )));
        }

        let cleaned: Vec<(usize, String)> = records
            .par_iter()
            .map(|record| {
                let raw_length = crate::analysis::merge_fields(
                    &record.description,
                    record.requirements.as_deref(),
                    record.benefits.as_deref(),
                )
                .chars()
                .count();
                (raw_length, normalizer.normalize_record(record))
            })
            .collect();

        let mut stats = CorpusStats {
            records: records.len(),
            ..Default::default()
        };
        let mut texts = Vec::with_capacity(records.len());
        let mut labels = Vec::with_capacity(records.len());
        let mut raw_total = 0usize;
        let mut clean_total = 0usize;

        for (record, (raw_length, text)) in records.iter().zip(cleaned) {
            raw_total += raw_length;
            if record.requirements.is_none() {
                stats.missing_requirements += 1;
            }
            if record.benefits.is_none() {
                stats.missing_benefits += 1;
            }
            if text.is_empty() {
                stats.dropped_empty += 1;
                continue;
            }

            let label = record.label.unwrap_or(Label::Real);
            match label {
                Label::Real => stats.real += 1,
                Label::Fake => stats.fake += 1,
            }
            clean_total += text.chars().count();
            texts.push(text);
            labels.push(label);
        }

        stats.kept = texts.len();
        if stats.records > 0 {
            stats.mean_raw_length = raw_total as f64 / stats.records as f64;
        }
        if stats.kept > 0 {
            stats.mean_clean_length = clean_total as f64 / stats.kept as f64;
        }

        if stats.dropped_empty > 0 {
            debug!("Removed {} rows with empty cleaned text", stats.dropped_empty);
        }

        Ok((Corpus { texts, labels }, stats))
    }

    /// Cleaned texts.
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// Labels, aligned with [`texts`](Self::texts).
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Check if the corpus has no rows.
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}
