//! Single-record prediction over persisted artifacts.

use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{NormalizerOptions, TextNormalizer};
use crate::classifier::{Classifier, ModelMetadata, TrainedClassifier};
use crate::dataset::Label;
use crate::error::JobCheckError;
use crate::feature::VocabularyModel;
use crate::serving::log::{PredictionLogEntry, PredictionSink};
use crate::storage::{ArtifactStore, FileArtifactStore, keys, load_classifier, load_vocabulary};

/// Per-request prediction failure. The service stays usable afterwards.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    /// Nothing left to classify after normalization.
    #[error("input is empty after normalization")]
    EmptyInput,

    /// The vocabulary could not vectorize the input.
    #[error("feature extraction failed: {0}")]
    Transform(String),

    /// The classifier failed or returned non-finite probabilities.
    #[error("inference failed: {0}")]
    Inference(String),
}

impl From<PredictError> for JobCheckError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::EmptyInput => JobCheckError::EmptyInput,
            PredictError::Transform(msg) => JobCheckError::Data(msg),
            PredictError::Inference(msg) => JobCheckError::Inference(msg),
        }
    }
}

/// Artifacts could not be loaded; the service cannot be constructed.
#[derive(Error, Debug)]
#[error("prediction service unavailable: {source}")]
pub struct ServiceUnavailable {
    #[from]
    pub source: JobCheckError,
}

/// Outcome of a single prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(with = "label_name")]
    pub label: Label,
    /// `0` for Real, `1` for Fake.
    pub prediction: u8,
    /// Probability of the predicted class as a percentage, two decimals.
    pub confidence: f64,
    pub probability_real: f64,
    pub probability_fake: f64,
    /// No input term was in the vocabulary; the prediction rests on the
    /// classifier's bias alone.
    pub low_information: bool,
}

mod label_name {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::dataset::Label;

    pub fn serialize<S: Serializer>(label: &Label, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(label.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Label, D::Error> {
        let name = String::deserialize(deserializer)?;
        Label::parse(&name).ok_or_else(|| D::Error::custom(format!("unknown label '{name}'")))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Answers predictions with a vocabulary and classifier loaded once.
///
/// The service is immutable after construction and can be shared across
/// threads behind an [`Arc`].
#[derive(Debug)]
pub struct PredictionService {
    normalizer: TextNormalizer,
    vocabulary: VocabularyModel,
    classifier: TrainedClassifier,
    sink: Option<Arc<dyn PredictionSink>>,
}

impl PredictionService {
    /// Load the best model from an artifact directory.
    pub fn load<P: AsRef<Path>>(directory: P) -> Result<Self, ServiceUnavailable> {
        let store = FileArtifactStore::open(directory)?;
        Self::from_store(&store)
    }

    /// Load the best model from `store`.
    pub fn from_store(store: &dyn ArtifactStore) -> Result<Self, ServiceUnavailable> {
        Self::from_store_with_model(store, keys::BEST_MODEL)
    }

    /// Load the classifier stored under `key` from `store`.
    pub fn from_store_with_model(
        store: &dyn ArtifactStore,
        key: &str,
    ) -> Result<Self, ServiceUnavailable> {
        let vocabulary = load_vocabulary(store)?;
        let classifier = load_classifier(store, key)?;
        let service = Self::from_parts(vocabulary.normalizer, vocabulary.vocabulary, classifier)?;
        info!(
            "Loaded {} ({} terms) from '{}'",
            service.classifier.metadata.name,
            service.vocabulary.dimension(),
            key
        );
        Ok(service)
    }

    /// Assemble a service from already-loaded parts, checking that the
    /// classifier was trained against `vocabulary`.
    pub fn from_parts(
        normalizer: NormalizerOptions,
        vocabulary: VocabularyModel,
        classifier: TrainedClassifier,
    ) -> Result<Self, ServiceUnavailable> {
        classifier.ensure_compatible(&vocabulary)?;
        Ok(PredictionService {
            normalizer: TextNormalizer::with_options(normalizer),
            vocabulary,
            classifier,
            sink: None,
        })
    }

    /// Send every successful prediction to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn PredictionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Classify one posting.
    pub fn predict(
        &self,
        description: &str,
        requirements: Option<&str>,
        benefits: Option<&str>,
    ) -> Result<PredictionResult, PredictError> {
        let cleaned = self
            .normalizer
            .normalize_fields(description, requirements, benefits);
        if cleaned.is_empty() {
            return Err(PredictError::EmptyInput);
        }

        let features = self
            .vocabulary
            .transform(&cleaned)
            .map_err(|e| PredictError::Transform(e.to_string()))?;
        let [p_real, p_fake] = self
            .classifier
            .predict_proba(&features)
            .map_err(|e| PredictError::Inference(e.to_string()))?;
        if !(p_real.is_finite() && p_fake.is_finite()) {
            return Err(PredictError::Inference(format!(
                "non-finite probabilities [{p_real}, {p_fake}]"
            )));
        }

        let label = if p_fake > p_real { Label::Fake } else { Label::Real };
        let result = PredictionResult {
            label,
            prediction: label.index() as u8,
            confidence: round2(p_real.max(p_fake) * 100.0),
            probability_real: p_real,
            probability_fake: p_fake,
            low_information: features.is_zero(),
        };

        if let Some(sink) = &self.sink {
            let entry = PredictionLogEntry::new(description, requirements, benefits, &result);
            if !sink.record(entry) {
                debug!("Prediction log entry dropped");
            }
        }

        Ok(result)
    }

    /// Metadata of the loaded classifier.
    pub fn metadata(&self) -> &ModelMetadata {
        &self.classifier.metadata
    }

    /// The loaded vocabulary.
    pub fn vocabulary(&self) -> &VocabularyModel {
        &self.vocabulary
    }

    /// Normalizer options replayed from training.
    pub fn normalizer_options(&self) -> NormalizerOptions {
        self.normalizer.options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use chrono::Utc;

    use crate::classifier::{ClassifierKind, LinearClassifier, TrainingStats};
    use crate::feature::{DocumentFrequency, VectorizerConfig};

    #[derive(Debug, Default)]
    struct RecordingSink(Mutex<Vec<PredictionLogEntry>>);

    impl PredictionSink for RecordingSink {
        fn record(&self, entry: PredictionLogEntry) -> bool {
            self.0.lock().unwrap().push(entry);
            true
        }
    }

    #[derive(Debug)]
    struct RejectingSink;

    impl PredictionSink for RejectingSink {
        fn record(&self, _entry: PredictionLogEntry) -> bool {
            false
        }
    }

    /// A linear model that scores "cash" as fraudulent and "engineer" as legitimate.
    fn service() -> PredictionService {
        let mut vocabulary = VocabularyModel::new(VectorizerConfig {
            ngram_range: (1, 1),
            min_df: DocumentFrequency::Count(1),
            max_df: DocumentFrequency::Proportion(1.0),
            ..Default::default()
        });
        vocabulary
            .fit(&["cash engineer".to_string(), "cash".to_string()])
            .unwrap();

        let mut weights = vec![0.0; vocabulary.dimension()];
        weights[vocabulary.term_index("cash").unwrap()] = 6.0;
        weights[vocabulary.term_index("engineer").unwrap()] = -6.0;

        let classifier = TrainedClassifier {
            metadata: ModelMetadata {
                name: "Logistic Regression".into(),
                kind: ClassifierKind::Linear,
                trained_at: Utc::now(),
                training_examples: 2,
                vocabulary_size: vocabulary.dimension(),
                vocabulary_fingerprint: vocabulary.fingerprint().unwrap(),
                seed: 42,
                run_id: None,
                hyperparameters: BTreeMap::new(),
            },
            stats: TrainingStats::default(),
            model: LinearClassifier::from_parameters(weights, -0.5).into(),
        };

        PredictionService::from_parts(NormalizerOptions::default(), vocabulary, classifier).unwrap()
    }

    #[test]
    fn test_predict_fake() {
        let result = service().predict("Earn CASH daily!!!", None, None).unwrap();
        assert_eq!(result.label, Label::Fake);
        assert_eq!(result.prediction, 1);
        assert!((result.probability_real + result.probability_fake - 1.0).abs() < 1e-9);
        assert_eq!(result.confidence, round2(result.probability_fake * 100.0));
        assert!(!result.low_information);
    }

    #[test]
    fn test_predict_real_from_requirements() {
        let result = service()
            .predict("<p>Position</p>", Some("Engineer"), None)
            .unwrap();
        assert_eq!(result.label, Label::Real);
        assert_eq!(result.prediction, 0);
    }

    #[test]
    fn test_empty_input() {
        let service = service();
        assert_eq!(service.predict("", Some(""), Some("")), Err(PredictError::EmptyInput));
        assert_eq!(service.predict("<br/> the !!!", None, None), Err(PredictError::EmptyInput));
    }

    #[test]
    fn test_unknown_terms_flag_low_information() {
        let result = service().predict("completely unrelated words", None, None).unwrap();
        assert!(result.low_information);
        assert_eq!(result.label, Label::Real);
    }

    #[test]
    fn test_sink_receives_predictions() {
        let sink = Arc::new(RecordingSink::default());
        let service = service().with_sink(sink.clone());

        service.predict("cash", None, Some("bonus")).unwrap();
        assert!(service.predict("", None, None).is_err());

        let entries = sink.0.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "cash");
        assert_eq!(entries[0].benefits.as_deref(), Some("bonus"));
    }

    #[test]
    fn test_rejecting_sink_does_not_fail_predict() {
        let service = service().with_sink(Arc::new(RejectingSink));
        assert!(service.predict("cash", None, None).is_ok());
    }

    #[test]
    fn test_result_json_shape() {
        let result = service().predict("cash", None, None).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["label"], "Fake");
        assert_eq!(json["prediction"], 1);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(87.456), 87.46);
        assert_eq!(round2(50.0), 50.0);
    }
}
