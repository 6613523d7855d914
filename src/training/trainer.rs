//! Training of the configured classifier families.

use std::collections::BTreeMap;

use chrono::Utc;
use log::info;
use uuid::Uuid;

use crate::classifier::{
    ClassifierKind, ClassifierModel, EnsembleTreeClassifier, ForestConfig, LinearClassifier,
    LinearConfig, ModelMetadata, TrainedClassifier, TrainingStats,
};
use crate::config::PipelineConfig;
use crate::dataset::Label;
use crate::error::{ModelStateError, Result};
use crate::feature::{FeatureVector, VocabularyModel};

/// Trains classifiers on a fixed training split.
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    linear: LinearConfig,
    forest: ForestConfig,
    models: Vec<ClassifierKind>,
    seed: u64,
    run_id: Option<Uuid>,
}

impl ModelTrainer {
    /// Create a trainer for every model family.
    pub fn new(linear: LinearConfig, forest: ForestConfig, seed: u64) -> Self {
        ModelTrainer {
            linear,
            forest,
            models: ClassifierKind::ALL.to_vec(),
            seed,
            run_id: None,
        }
    }

    /// Create a trainer from a pipeline configuration; the split seed seeds
    /// every model.
    pub fn from_config(config: &PipelineConfig) -> Self {
        ModelTrainer {
            linear: config.linear.clone(),
            forest: config.forest.clone(),
            models: config.models.clone(),
            seed: config.split.seed,
            run_id: None,
        }
    }

    /// Record `run_id` in the metadata of every trained model.
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Model families this trainer produces, in order.
    pub fn models(&self) -> &[ClassifierKind] {
        &self.models
    }

    /// Train one model family.
    pub fn train_variant(
        &self,
        kind: ClassifierKind,
        features: &[FeatureVector],
        labels: &[Label],
        seed: u64,
    ) -> Result<(ClassifierModel, TrainingStats)> {
        info!("Training {} on {} examples", kind, features.len());
        let (model, stats) = match kind {
            ClassifierKind::Linear => {
                let (model, stats) = LinearClassifier::fit(&self.linear, features, labels, seed)?;
                (ClassifierModel::from(model), stats)
            }
            ClassifierKind::EnsembleTree => {
                let (model, stats) = EnsembleTreeClassifier::fit(&self.forest, features, labels, seed)?;
                (ClassifierModel::from(model), stats)
            }
        };
        info!(
            "{} trained in {} ms ({} iterations)",
            kind, stats.training_time_ms, stats.iterations
        );
        Ok((model, stats))
    }

    /// Train every configured family, in order, and attach metadata linking
    /// each model to `vocabulary`.
    pub fn train_all(
        &self,
        features: &[FeatureVector],
        labels: &[Label],
        vocabulary: &VocabularyModel,
    ) -> Result<Vec<TrainedClassifier>> {
        let fingerprint = vocabulary.fingerprint().ok_or(ModelStateError::NotFitted)?;

        let mut trained = Vec::with_capacity(self.models.len());
        for &kind in &self.models {
            let (model, stats) = self.train_variant(kind, features, labels, self.seed)?;
            let metadata = ModelMetadata {
                name: kind.display_name().to_string(),
                kind,
                trained_at: Utc::now(),
                training_examples: features.len(),
                vocabulary_size: vocabulary.dimension(),
                vocabulary_fingerprint: fingerprint,
                seed: self.seed,
                run_id: self.run_id,
                hyperparameters: self.hyperparameters(kind, vocabulary.dimension()),
            };
            trained.push(TrainedClassifier {
                metadata,
                stats,
                model,
            });
        }
        Ok(trained)
    }

    fn hyperparameters(&self, kind: ClassifierKind, dimension: usize) -> BTreeMap<String, f64> {
        let mut params = BTreeMap::new();
        match kind {
            ClassifierKind::Linear => {
                params.insert("learning_rate".into(), self.linear.learning_rate);
                params.insert("l2".into(), self.linear.l2);
                params.insert("batch_size".into(), self.linear.batch_size as f64);
                params.insert("max_iter".into(), self.linear.max_iter as f64);
                params.insert("tol".into(), self.linear.tol);
                params.insert("n_iter_no_change".into(), self.linear.n_iter_no_change as f64);
            }
            ClassifierKind::EnsembleTree => {
                params.insert("n_estimators".into(), self.forest.n_estimators as f64);
                params.insert(
                    "max_features".into(),
                    self.forest.max_features.resolve(dimension) as f64,
                );
                if let Some(depth) = self.forest.max_depth {
                    params.insert("max_depth".into(), depth as f64);
                }
                params.insert("min_samples_split".into(), self.forest.min_samples_split as f64);
                params.insert("min_samples_leaf".into(), self.forest.min_samples_leaf as f64);
            }
        }
        params
    }
}
