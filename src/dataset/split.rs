//! Stratified train/test splitting.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::dataset::record::Label;
use crate::error::{JobCheckError, Result};

/// Minimum examples per class: one for each partition.
pub const MIN_EXAMPLES_PER_CLASS: usize = 2;

/// Configuration for the holdout split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of each class held out for evaluation.
    pub test_size: f64,
    /// Seed for the per-class shuffles.
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
        }
    }
}

impl SplitConfig {
    /// Check the configuration values.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(JobCheckError::config(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        Ok(())
    }
}

/// Row indices of the two partitions, each in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    /// Select the items at `indices` from `items`.
    pub fn take<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
        indices.iter().map(|&i| items[i].clone()).collect()
    }
}

/// Split row indices so that each class is represented in the holdout in
/// proportion to its share of the corpus.
///
/// For a class with `n` examples, `round(n * test_size)` rows (clamped to
/// `1..=n-1`) are drawn into the holdout after a seeded shuffle, so the
/// holdout class counts differ from the exact proportion by at most one.
pub fn stratified_split(labels: &[Label], config: &SplitConfig) -> Result<SplitIndices> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for class in Label::ALL {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == class)
            .map(|(i, _)| i)
            .collect();

        let n = members.len();
        if n < MIN_EXAMPLES_PER_CLASS {
            return Err(JobCheckError::insufficient_data(
                class.as_str(),
                MIN_EXAMPLES_PER_CLASS,
                n,
            ));
        }

        let n_test = ((n as f64 * config.test_size).round() as usize).clamp(1, n - 1);
        members.shuffle(&mut rng);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();

    Ok(SplitIndices { train, test })
}
