//! Configuration for the training pipeline.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::NormalizerOptions;
use crate::classifier::{ClassifierKind, ForestConfig, LinearConfig};
use crate::dataset::SplitConfig;
use crate::error::{JobCheckError, Result};
use crate::evaluation::DEFAULT_TARGET_ACCURACY;
use crate::feature::VectorizerConfig;

/// Everything a training run needs, resolved once.
///
/// Every section has defaults, so a JSON config file only needs the values
/// it changes:
///
/// ```
/// use jobcheck::config::PipelineConfig;
///
/// let config: PipelineConfig =
///     serde_json::from_str(r#"{"forest": {"n_estimators": 20}, "split": {"seed": 7}}"#).unwrap();
/// assert_eq!(config.forest.n_estimators, 20);
/// assert_eq!(config.split.seed, 7);
/// assert_eq!(config.split.test_size, 0.2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Text normalization applied before vectorizing.
    pub normalizer: NormalizerOptions,
    /// TF-IDF vocabulary settings.
    pub vectorizer: VectorizerConfig,
    /// Holdout split. Its seed also seeds the classifiers.
    pub split: SplitConfig,
    /// Logistic regression hyperparameters.
    pub linear: LinearConfig,
    /// Random forest hyperparameters.
    pub forest: ForestConfig,
    /// Model families to train, in order.
    pub models: Vec<ClassifierKind>,
    /// Accuracy the selected model is expected to reach.
    pub target_accuracy: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerOptions::default(),
            vectorizer: VectorizerConfig::default(),
            split: SplitConfig::default(),
            linear: LinearConfig::default(),
            forest: ForestConfig::default(),
            models: ClassifierKind::ALL.to_vec(),
            target_accuracy: DEFAULT_TARGET_ACCURACY,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            JobCheckError::config(format!("cannot read config {}: {e}", path.display()))
        })?;
        let config: PipelineConfig = serde_json::from_str(&text).map_err(|e| {
            JobCheckError::config(format!("invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.vectorizer.validate()?;
        self.split.validate()?;
        self.linear.validate()?;
        self.forest.validate()?;

        if self.models.is_empty() {
            return Err(JobCheckError::config("at least one model must be configured"));
        }
        for (i, kind) in self.models.iter().enumerate() {
            if self.models[..i].contains(kind) {
                return Err(JobCheckError::config(format!("model {kind} listed twice")));
            }
        }
        if !(0.0..=1.0).contains(&self.target_accuracy) {
            return Err(JobCheckError::config(format!(
                "target_accuracy must be in [0, 1], got {}",
                self.target_accuracy
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_accuracy, 0.90);
        assert_eq!(config.split.test_size, 0.2);
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.linear.max_iter, 1000);
        assert_eq!(config.forest.n_estimators, 100);
        assert_eq!(config.vectorizer.max_features, Some(5000));
        assert_eq!(config.models, vec![ClassifierKind::Linear, ClassifierKind::EnsembleTree]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"target_accuracy": 0.8, "models": ["ensemble_tree"], "normalizer": {{"remove_stopwords": false}}}}"#
        )
        .unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.target_accuracy, 0.8);
        assert_eq!(config.models, vec![ClassifierKind::EnsembleTree]);
        assert!(!config.normalizer.remove_stopwords);
        assert!(config.normalizer.remove_html);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = PipelineConfig::default();
        config.target_accuracy = 1.5;
        assert!(matches!(config.validate(), Err(JobCheckError::Config(_))));

        let mut config = PipelineConfig::default();
        config.models = vec![ClassifierKind::Linear, ClassifierKind::Linear];
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.split.test_size = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unreadable_file() {
        let err = PipelineConfig::from_file("/nonexistent/jobcheck.json").unwrap_err();
        assert!(matches!(err, JobCheckError::Config(_)));
    }
}
