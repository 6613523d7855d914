//! The batch training pipeline.
//!
//! ```text
//! load → normalize → fit → split → train → evaluate → persist
//! ```
//!
//! Each failure is tagged with the stage it happened in. Nothing is written
//! until every artifact has been serialized, and the artifacts are committed
//! as one batch, so a failed run leaves the store untouched.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::TextNormalizer;
use crate::classifier::{Classifier, ClassifierKind, TrainingStats};
use crate::config::PipelineConfig;
use crate::dataset::{Corpus, CorpusStats, DataSource, SplitIndices, stratified_split};
use crate::error::{JobCheckError, Result, StageContext, TrainingStage};
use crate::evaluation::{EvaluationReport, Evaluator, best_index, render_comparison};
use crate::feature::VocabularyModel;
use crate::storage::{
    ArtifactKind, ArtifactStore, VocabularyArtifact, encode, keys, load_classifier,
    load_vocabulary,
};
use crate::training::trainer::ModelTrainer;

/// One trained model's statistics and holdout evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub kind: ClassifierKind,
    pub artifact_key: String,
    pub stats: TrainingStats,
    pub evaluation: EvaluationReport,
}

/// Summary of a training run, persisted as `training_report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Name of the data source.
    pub source: String,
    pub corpus: CorpusStats,
    pub vocabulary_size: usize,
    pub vocabulary_fingerprint: u32,
    pub train_size: usize,
    pub test_size: usize,
    /// Every trained model, in training order.
    pub models: Vec<ModelSummary>,
    /// The model persisted as `best_model`.
    pub best_model: ClassifierKind,
    pub target_accuracy: f64,
    pub target_met: bool,
}

impl TrainingReport {
    /// Summary of the selected model.
    pub fn best(&self) -> Option<&ModelSummary> {
        self.models.iter().find(|m| m.kind == self.best_model)
    }

    /// Human-readable summary.
    pub fn render(&self) -> String {
        let evaluations: Vec<EvaluationReport> =
            self.models.iter().map(|m| m.evaluation.clone()).collect();

        let mut out = String::new();
        let _ = writeln!(out, "Training run {}", self.run_id);
        let _ = writeln!(
            out,
            "Corpus: {} records, {} kept ({} real, {} fake), {} dropped as empty",
            self.corpus.records, self.corpus.kept, self.corpus.real, self.corpus.fake, self.corpus.dropped_empty
        );
        let _ = writeln!(
            out,
            "Vocabulary: {} terms; train {} / test {}",
            self.vocabulary_size, self.train_size, self.test_size
        );
        let _ = writeln!(out);
        out.push_str(&render_comparison(&evaluations));
        let _ = writeln!(out);
        if let Some(best) = self.best() {
            let _ = writeln!(
                out,
                "Best model: {} (accuracy {:.2}%, F1 {:.4})",
                best.evaluation.model_name,
                best.evaluation.accuracy * 100.0,
                best.evaluation.f1
            );
        }
        let status = if self.target_met { "reached" } else { "not reached" };
        let _ = writeln!(
            out,
            "Target accuracy {:.0}%: {}",
            self.target_accuracy * 100.0,
            status
        );
        out
    }
}

/// Runs a full training job against an artifact store.
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: PipelineConfig,
}

impl TrainingPipeline {
    /// Create a pipeline; fails on invalid configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(TrainingPipeline { config })
    }

    /// The resolved configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Train, evaluate and persist every configured model.
    pub fn run(&self, source: &dyn DataSource, store: &dyn ArtifactStore) -> Result<TrainingReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Starting training run {} on {}", run_id, source.name());

        let records = source.records().stage(TrainingStage::Load)?;
        info!("Loaded {} records", records.len());

        let normalizer = TextNormalizer::with_options(self.config.normalizer);
        let (corpus, corpus_stats) = Corpus::prepare(&records, &normalizer)
            .and_then(|(corpus, stats)| {
                if corpus.is_empty() {
                    Err(JobCheckError::data("no records left after normalization"))
                } else {
                    Ok((corpus, stats))
                }
            })
            .stage(TrainingStage::Normalize)?;
        info!(
            "Prepared corpus: {} rows ({} real, {} fake)",
            corpus.len(),
            corpus_stats.real,
            corpus_stats.fake
        );

        let mut vocabulary = VocabularyModel::new(self.config.vectorizer.clone());
        let features = vocabulary
            .fit_transform(corpus.texts())
            .stage(TrainingStage::Fit)?;
        info!("Fitted vocabulary with {} terms", vocabulary.dimension());

        let split = stratified_split(corpus.labels(), &self.config.split).stage(TrainingStage::Split)?;
        let train_x = SplitIndices::take(&features, &split.train);
        let train_y = SplitIndices::take(corpus.labels(), &split.train);
        let test_x = SplitIndices::take(&features, &split.test);
        let test_y = SplitIndices::take(corpus.labels(), &split.test);
        info!("Split: {} training, {} test", train_x.len(), test_x.len());

        let trainer = ModelTrainer::from_config(&self.config).with_run_id(run_id);
        let trained = trainer
            .train_all(&train_x, &train_y, &vocabulary)
            .stage(TrainingStage::Train)?;

        let evaluator = Evaluator::new(self.config.target_accuracy);
        let (reports, best, target_met) = (|| -> Result<_> {
            let reports = trained
                .iter()
                .map(|model| evaluator.evaluate(&model.metadata.name, model, &test_x, &test_y))
                .collect::<Result<Vec<_>>>()?;
            let best = best_index(&reports)?;
            info!("Selected {} as the best model", reports[best].model_name);
            let target_met = evaluator.meets_target(&reports[best]);
            Ok((reports, best, target_met))
        })()
        .stage(TrainingStage::Evaluate)?;

        let report = TrainingReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            source: source.name().to_string(),
            corpus: corpus_stats,
            vocabulary_size: vocabulary.dimension(),
            vocabulary_fingerprint: vocabulary.fingerprint().unwrap_or_default(),
            train_size: train_x.len(),
            test_size: test_x.len(),
            models: trained
                .iter()
                .zip(&reports)
                .map(|(model, evaluation)| ModelSummary {
                    kind: model.kind(),
                    artifact_key: model.kind().artifact_key().to_string(),
                    stats: model.stats.clone(),
                    evaluation: evaluation.clone(),
                })
                .collect(),
            best_model: trained[best].kind(),
            target_accuracy: self.config.target_accuracy,
            target_met,
        };

        (|| -> Result<()> {
            let vocabulary_artifact = VocabularyArtifact {
                normalizer: self.config.normalizer,
                vocabulary,
            };

            let mut blobs: Vec<(&str, Vec<u8>)> = vec![(
                keys::VOCABULARY,
                encode(ArtifactKind::Vocabulary, &vocabulary_artifact)?,
            )];
            for model in &trained {
                blobs.push((model.kind().artifact_key(), encode(ArtifactKind::Classifier, model)?));
            }
            blobs.push((keys::BEST_MODEL, encode(ArtifactKind::Classifier, &trained[best])?));
            blobs.push((keys::TRAINING_REPORT, serde_json::to_vec_pretty(&report)?));

            let batch: Vec<(&str, &[u8])> =
                blobs.iter().map(|(key, bytes)| (*key, bytes.as_slice())).collect();
            store.put_all(&batch)?;
            debug!("Persisted {} artifacts", blobs.len());
            Ok(())
        })()
        .stage(TrainingStage::Persist)?;

        info!("Training run {} complete", run_id);
        Ok(report)
    }
}

/// Evaluate a persisted classifier on a labeled data source.
///
/// Every record is scored; there is no holdout split.
pub fn evaluate_stored_model(
    source: &dyn DataSource,
    store: &dyn ArtifactStore,
    key: &str,
    evaluator: &Evaluator,
) -> Result<EvaluationReport> {
    let VocabularyArtifact {
        normalizer,
        vocabulary,
    } = load_vocabulary(store)?;
    let classifier = load_classifier(store, key)?;
    classifier.ensure_compatible(&vocabulary)?;

    let records = source.records()?;
    let (corpus, _) = Corpus::prepare(&records, &TextNormalizer::with_options(normalizer))?;
    let features = vocabulary.transform_batch(corpus.texts())?;

    evaluator.evaluate(&classifier.metadata.name, &classifier, &features, corpus.labels())
}
