//! Persistable trained models and their metadata.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::{
    Classifier, ClassifierKind, EnsembleTreeClassifier, LinearClassifier, Probabilities,
};
use crate::error::{JobCheckError, Result};
use crate::feature::{FeatureVector, VocabularyModel};

/// Either model family, dispatching through [`Classifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassifierModel {
    Linear(LinearClassifier),
    EnsembleTree(EnsembleTreeClassifier),
}

impl ClassifierModel {
    fn inner(&self) -> &dyn Classifier {
        match self {
            ClassifierModel::Linear(model) => model,
            ClassifierModel::EnsembleTree(model) => model,
        }
    }
}

impl Classifier for ClassifierModel {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Probabilities> {
        self.inner().predict_proba(features)
    }

    fn dimension(&self) -> usize {
        self.inner().dimension()
    }

    fn kind(&self) -> ClassifierKind {
        self.inner().kind()
    }
}

impl From<LinearClassifier> for ClassifierModel {
    fn from(model: LinearClassifier) -> Self {
        ClassifierModel::Linear(model)
    }
}

impl From<EnsembleTreeClassifier> for ClassifierModel {
    fn from(model: EnsembleTreeClassifier) -> Self {
        ClassifierModel::EnsembleTree(model)
    }
}

/// Descriptive information stored with every trained classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name.
    pub name: String,
    pub kind: ClassifierKind,
    /// Training timestamp.
    pub trained_at: DateTime<Utc>,
    /// Number of training examples used.
    pub training_examples: usize,
    /// Dimension of the vocabulary the model was trained against.
    pub vocabulary_size: usize,
    /// Fingerprint of that vocabulary.
    pub vocabulary_fingerprint: u32,
    /// Seed for every random choice made during training.
    pub seed: u64,
    /// Training run that produced the model, if run by the pipeline.
    pub run_id: Option<Uuid>,
    /// Model hyperparameters.
    pub hyperparameters: BTreeMap<String, f64>,
}

/// Training statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Epochs for the linear model; trees for the forest.
    pub iterations: usize,
    /// Whether training stopped before its iteration cap.
    pub converged: bool,
    /// Final training objective, where the model tracks one.
    pub final_loss: Option<f64>,
    /// Training time in milliseconds.
    pub training_time_ms: u64,
}

/// A classifier bundled with its metadata and training statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedClassifier {
    pub metadata: ModelMetadata,
    pub stats: TrainingStats,
    pub model: ClassifierModel,
}

impl TrainedClassifier {
    /// Fail unless this classifier was trained against `vocabulary`.
    pub fn ensure_compatible(&self, vocabulary: &VocabularyModel) -> Result<()> {
        let Some(fingerprint) = vocabulary.fingerprint() else {
            return Err(crate::error::ModelStateError::NotFitted.into());
        };

        if self.model.dimension() != vocabulary.dimension()
            || self.metadata.vocabulary_size != vocabulary.dimension()
        {
            return Err(JobCheckError::schema_mismatch(
                format!("dimension {}", vocabulary.dimension()),
                format!("dimension {}", self.model.dimension()),
            ));
        }
        if self.metadata.vocabulary_fingerprint != fingerprint {
            return Err(JobCheckError::schema_mismatch(
                format!("vocabulary {fingerprint:08x}"),
                format!("vocabulary {:08x}", self.metadata.vocabulary_fingerprint),
            ));
        }
        Ok(())
    }
}

impl Classifier for TrainedClassifier {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Probabilities> {
        self.model.predict_proba(features)
    }

    fn dimension(&self) -> usize {
        self.model.dimension()
    }

    fn kind(&self) -> ClassifierKind {
        self.model.kind()
    }
}
