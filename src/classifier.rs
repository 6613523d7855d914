//! Binary classifiers over TF-IDF feature vectors.
//!
//! Two model families implement [`Classifier`]: [`LinearClassifier`]
//! (logistic regression) and [`EnsembleTreeClassifier`] (random forest).
//! Trained models are wrapped in a [`TrainedClassifier`] that records the
//! vocabulary they were trained against.

pub mod forest;
pub mod linear;
pub mod model;
pub mod tree;

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::Label;
use crate::error::{JobCheckError, Result};
use crate::feature::FeatureVector;

pub use forest::{EnsembleTreeClassifier, ForestConfig, MaxFeatures};
pub use linear::{LinearClassifier, LinearConfig};
pub use model::{ClassifierModel, ModelMetadata, TrainedClassifier, TrainingStats};
pub use tree::DecisionTree;

/// Class probabilities ordered `[p_real, p_fake]`.
pub type Probabilities = [f64; 2];

/// Model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Logistic regression.
    Linear,
    /// Random forest.
    EnsembleTree,
}

impl ClassifierKind {
    /// Every kind, in training order.
    pub const ALL: [ClassifierKind; 2] = [ClassifierKind::Linear, ClassifierKind::EnsembleTree];

    /// Human-readable model name used in reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            ClassifierKind::Linear => "Logistic Regression",
            ClassifierKind::EnsembleTree => "Random Forest",
        }
    }

    /// Artifact key under which this kind is persisted.
    pub fn artifact_key(&self) -> &'static str {
        match self {
            ClassifierKind::Linear => crate::storage::keys::LINEAR_MODEL,
            ClassifierKind::EnsembleTree => crate::storage::keys::FOREST_MODEL,
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A trained binary classifier.
pub trait Classifier: Send + Sync {
    /// Class probabilities for one vector.
    fn predict_proba(&self, features: &FeatureVector) -> Result<Probabilities>;

    /// Predicted label: Fake when `p_fake > p_real`.
    fn predict(&self, features: &FeatureVector) -> Result<Label> {
        let [p_real, p_fake] = self.predict_proba(features)?;
        Ok(if p_fake > p_real { Label::Fake } else { Label::Real })
    }

    /// Probabilities for many vectors, in parallel, preserving order.
    fn predict_proba_batch(&self, features: &[FeatureVector]) -> Result<Vec<Probabilities>> {
        features.par_iter().map(|x| self.predict_proba(x)).collect()
    }

    /// Labels for many vectors, in parallel, preserving order.
    fn predict_batch(&self, features: &[FeatureVector]) -> Result<Vec<Label>> {
        features.par_iter().map(|x| self.predict(x)).collect()
    }

    /// Input dimension the model was trained on.
    fn dimension(&self) -> usize;

    /// Model family.
    fn kind(&self) -> ClassifierKind;
}

pub(crate) fn check_dimension(expected: usize, features: &FeatureVector) -> Result<()> {
    if features.dimension() != expected {
        return Err(JobCheckError::inference(format!(
            "feature dimension {} does not match model dimension {}",
            features.dimension(),
            expected
        )));
    }
    Ok(())
}

/// Validate a training set and return its common dimension.
pub(crate) fn check_training_set(features: &[FeatureVector], labels: &[Label]) -> Result<usize> {
    if features.len() != labels.len() {
        return Err(JobCheckError::insufficient_data(
            "labels",
            features.len(),
            labels.len(),
        ));
    }
    for class in Label::ALL {
        let present = labels.iter().filter(|&&l| l == class).count();
        if present == 0 {
            return Err(JobCheckError::insufficient_data(class.as_str(), 1, 0));
        }
    }

    let dimension = features[0].dimension();
    if let Some(position) = features.iter().position(|x| x.dimension() != dimension) {
        return Err(JobCheckError::data(format!(
            "training vector {} has dimension {}, expected {}",
            position,
            features[position].dimension(),
            dimension
        )));
    }
    Ok(dimension)
}
