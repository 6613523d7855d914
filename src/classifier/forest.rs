//! Random forest over [`DecisionTree`]s.

use std::time::Instant;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classifier::model::TrainingStats;
use crate::classifier::tree::{DecisionTree, TreeConfig};
use crate::classifier::{Classifier, ClassifierKind, Probabilities, check_dimension, check_training_set};
use crate::dataset::Label;
use crate::error::{JobCheckError, Result};
use crate::feature::FeatureVector;

/// Number of candidate features examined at each split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `sqrt(V)`.
    Sqrt,
    /// `log2(V)`.
    Log2,
    /// Every feature.
    All,
    /// A fixed count.
    Count(usize),
    /// A fraction of `V`.
    Fraction(f64),
}

impl MaxFeatures {
    /// Resolve to a count for `dimension` features, at least one.
    pub fn resolve(&self, dimension: usize) -> usize {
        let n = dimension as f64;
        let resolved = match *self {
            MaxFeatures::Sqrt => n.sqrt() as usize,
            MaxFeatures::Log2 => n.log2() as usize,
            MaxFeatures::All => dimension,
            MaxFeatures::Count(count) => count.min(dimension),
            MaxFeatures::Fraction(fraction) => (fraction * n) as usize,
        };
        resolved.max(1)
    }
}

/// Hyperparameters for [`EnsembleTreeClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees.
    pub n_estimators: usize,
    pub max_features: MaxFeatures,
    /// Maximum tree depth; unlimited when `None`.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Train each tree on a bootstrap resample.
    pub bootstrap: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
        }
    }
}

impl ForestConfig {
    /// Check the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(JobCheckError::config("n_estimators must be positive"));
        }
        if self.min_samples_split < 2 {
            return Err(JobCheckError::config("min_samples_split must be at least 2"));
        }
        if self.min_samples_leaf == 0 {
            return Err(JobCheckError::config("min_samples_leaf must be positive"));
        }
        if self.max_depth == Some(0) {
            return Err(JobCheckError::config("max_depth must be positive"));
        }
        if let MaxFeatures::Fraction(fraction) = self.max_features {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(JobCheckError::config("max_features fraction must be in (0, 1]"));
            }
        }
        Ok(())
    }
}

/// Bagged ensemble of CART trees; probabilities are averaged over trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleTreeClassifier {
    trees: Vec<DecisionTree>,
    dimension: usize,
}

impl EnsembleTreeClassifier {
    /// Train a forest.
    ///
    /// Per-tree seeds are drawn from `seed` before any tree is grown, so the
    /// result is the same regardless of how rayon schedules the trees.
    pub fn fit(
        config: &ForestConfig,
        features: &[FeatureVector],
        labels: &[Label],
        seed: u64,
    ) -> Result<(Self, TrainingStats)> {
        config.validate()?;
        let dimension = check_training_set(features, labels)?;
        let start = Instant::now();

        let tree_config = TreeConfig {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features.resolve(dimension),
        };

        let mut master = StdRng::seed_from_u64(seed);
        let tree_seeds: Vec<u64> = (0..config.n_estimators).map(|_| master.random()).collect();
        let n = features.len();

        let trees: Vec<DecisionTree> = tree_seeds
            .par_iter()
            .map(|&tree_seed| {
                let mut rng = StdRng::seed_from_u64(tree_seed);
                let samples: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| rng.random_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                DecisionTree::fit(features, labels, samples, &tree_config, &mut rng)
            })
            .collect();

        let forest = EnsembleTreeClassifier { trees, dimension };
        debug!(
            "Random forest: {} trees, max depth {}, {} features per split",
            forest.trees.len(),
            forest.trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            tree_config.max_features
        );

        let stats = TrainingStats {
            iterations: forest.trees.len(),
            converged: true,
            final_loss: None,
            training_time_ms: start.elapsed().as_millis() as u64,
        };
        Ok((forest, stats))
    }

    /// The fitted trees.
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

impl Classifier for EnsembleTreeClassifier {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Probabilities> {
        check_dimension(self.dimension, features)?;
        if self.trees.is_empty() {
            return Err(JobCheckError::inference("forest has no trees"));
        }

        let mut sum = [0.0, 0.0];
        for tree in &self.trees {
            let p = tree.predict_proba(features);
            sum[0] += p[0];
            sum[1] += p[1];
        }
        let count = self.trees.len() as f64;
        Ok([sum[0] / count, sum[1] / count])
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::EnsembleTree
    }
}
