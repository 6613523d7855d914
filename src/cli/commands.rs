//! Command implementations for the jobcheck CLI.

use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};

use crate::analysis::{NormalizerOptions, TextNormalizer};
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::PipelineConfig;
use crate::dataset::open_data_source;
use crate::error::Result;
use crate::evaluation::Evaluator;
use crate::serving::{JsonlPredictionLog, PredictionService};
use crate::storage::{
    ArtifactStore, FileArtifactStore, keys, load_classifier, load_vocabulary, read_header,
};
use crate::training::{TrainingPipeline, evaluate_stored_model};

/// Execute a CLI command, naming the failed command in the error chain.
pub fn run(args: JobCheckArgs) -> anyhow::Result<()> {
    let name = args.command.name();
    execute_command(args).with_context(|| format!("{name} command failed"))
}

/// Execute a CLI command.
pub fn execute_command(args: JobCheckArgs) -> Result<()> {
    match &args.command {
        Command::Train(train_args) => train(train_args, &args),
        Command::Predict(predict_args) => predict(predict_args, &args),
        Command::Evaluate(evaluate_args) => evaluate(evaluate_args, &args),
        Command::Normalize(normalize_args) => normalize(normalize_args, &args),
        Command::Inspect(inspect_args) => inspect(inspect_args, &args),
    }
}

/// Run the training pipeline.
fn train(args: &TrainArgs, cli_args: &JobCheckArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            PipelineConfig::from_file(path)?
        }
        None => PipelineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.split.seed = seed;
    }

    let pipeline = TrainingPipeline::new(config)?;
    let store = FileArtifactStore::new(&args.models)?;
    let source = open_data_source(&args.data);

    let report = pipeline.run(source.as_ref(), &store)?;
    if !report.target_met {
        warn!(
            "Selected model {} is below the target accuracy",
            report.best_model
        );
    }
    output_result(&report, cli_args)
}

/// Classify a single posting.
fn predict(args: &PredictArgs, cli_args: &JobCheckArgs) -> Result<()> {
    let store = FileArtifactStore::open(&args.models)?;
    let mut service =
        PredictionService::from_store_with_model(&store, &args.model).map_err(|e| e.source)?;

    if let Some(path) = &args.log {
        service = service.with_sink(Arc::new(JsonlPredictionLog::open(path)?));
    }

    let result = service.predict(
        &args.description,
        args.requirements.as_deref(),
        args.benefits.as_deref(),
    )?;
    // Flushes the prediction log before printing.
    drop(service);

    output_result(&result, cli_args)
}

/// Evaluate a stored model against a labeled dataset.
fn evaluate(args: &EvaluateArgs, cli_args: &JobCheckArgs) -> Result<()> {
    let store = FileArtifactStore::open(&args.models)?;
    let source = open_data_source(&args.data);
    let evaluator = Evaluator::new(args.target_accuracy);

    let report = evaluate_stored_model(source.as_ref(), &store, &args.model, &evaluator)?;
    let target_met = evaluator.meets_target(&report);

    output_result(
        &EvaluationResult {
            model: args.model.clone(),
            records: report.support,
            target_accuracy: args.target_accuracy,
            target_met,
            report,
        },
        cli_args,
    )
}

/// Print the cleaned form of a text.
fn normalize(args: &NormalizeArgs, cli_args: &JobCheckArgs) -> Result<()> {
    let normalizer = TextNormalizer::with_options(NormalizerOptions {
        remove_stopwords: !args.keep_stop_words,
        ..Default::default()
    });
    let cleaned = normalizer.normalize(&args.text);

    output_result(
        &NormalizationResult {
            original: args.text.clone(),
            tokens: cleaned.split_whitespace().count(),
            cleaned,
        },
        cli_args,
    )
}

/// Show the contents of an artifact directory.
fn inspect(args: &InspectArgs, cli_args: &JobCheckArgs) -> Result<()> {
    let store = FileArtifactStore::open(&args.models)?;

    let mut artifacts = Vec::new();
    for key in store.keys()? {
        let bytes = store.get(&key)?;
        artifacts.push(ArtifactEntry {
            version: read_header(&bytes).ok().map(|header| header.version),
            size_bytes: bytes.len() as u64,
            key,
        });
    }

    let vocabulary = if store.contains(keys::VOCABULARY) {
        let artifact = load_vocabulary(&store)?;
        let vocabulary = artifact.vocabulary;
        Some(VocabularySummary {
            terms: vocabulary.dimension(),
            fingerprint: vocabulary.fingerprint().unwrap_or_default(),
            documents: vocabulary.n_documents(),
            ngram_range: vocabulary.config().ngram_range,
            vocabulary: args.terms.then(|| vocabulary.vocabulary().to_vec()),
        })
    } else {
        None
    };

    let mut classifiers = Vec::new();
    for key in keys::CLASSIFIERS {
        if !store.contains(key) {
            continue;
        }
        let classifier = load_classifier(&store, key)?;
        classifiers.push(ClassifierSummary {
            key: key.to_string(),
            metadata: classifier.metadata,
            stats: classifier.stats,
        });
    }

    output_result(
        &InspectionResult {
            directory: store.directory().display().to_string(),
            artifacts,
            vocabulary,
            classifiers,
        },
        cli_args,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_run_names_failed_command() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let args = JobCheckArgs::try_parse_from([
            "jobcheck",
            "predict",
            "--models",
            missing.to_str().unwrap(),
            "--description",
            "Earn cash fast",
        ])
        .unwrap();

        let err = run(args).unwrap_err();
        assert_eq!(err.to_string(), "predict command failed");
        let chain = format!("{err:#}");
        assert!(chain.contains("does not exist"), "{chain}");
        assert!(err.root_cause().downcast_ref::<crate::error::JobCheckError>().is_some());
    }

    #[test]
    fn test_run_normalize_succeeds() {
        let args = JobCheckArgs::try_parse_from(["jobcheck", "-q", "normalize", "Hello WORLD!"]).unwrap();
        assert!(run(args).is_ok());
    }
}
