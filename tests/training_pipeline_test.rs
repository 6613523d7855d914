use std::fs;
use std::path::Path;

use tempfile::TempDir;

use jobcheck::classifier::{ClassifierKind, ForestConfig};
use jobcheck::config::PipelineConfig;
use jobcheck::dataset::{CsvDataSource, JsonlDataSource, open_data_source};
use jobcheck::error::TrainingStage;
use jobcheck::evaluation::Evaluator;
use jobcheck::storage::{ArtifactStore, FileArtifactStore, keys, load_classifier, load_vocabulary};
use jobcheck::training::{TrainingPipeline, TrainingReport, evaluate_stored_model};

const REAL: [&str; 6] = [
    "We are hiring a backend engineer to build payment services",
    "Senior data engineer to maintain our analytics pipelines",
    "Product designer joining a small team in our Berlin office",
    "Backend engineer working on distributed storage services",
    "Data analyst supporting the finance team with reporting",
    "Office manager coordinating facilities for our growing team",
];

const FAKE: [&str; 4] = [
    "Earn cash from home with no experience required",
    "Work from home and earn money fast, paid daily",
    "Easy online data entry, earn cash fast from home",
    "No interview needed, wire transfer payment daily",
];

fn write_csv(path: &Path, rounds: usize) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer
        .write_record(["title", "description", "requirements", "benefits", "fraudulent"])
        .unwrap();
    for round in 0..rounds {
        for text in REAL {
            writer
                .write_record([
                    "Engineer",
                    &format!("<p>{text}</p> team{round}"),
                    "Degree and experience",
                    "Health insurance",
                    "0",
                ])
                .unwrap();
        }
        for text in FAKE {
            writer
                .write_record(["Assistant", &format!("{text}!!! bonus{round}"), "", "", "1"])
                .unwrap();
        }
    }
    writer.flush().unwrap();
}

fn quick_config() -> PipelineConfig {
    PipelineConfig {
        forest: ForestConfig {
            n_estimators: 15,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_train_from_csv_persists_artifacts() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("postings.csv");
    write_csv(&data, 4);
    let store = FileArtifactStore::new(dir.path().join("models")).unwrap();

    let pipeline = TrainingPipeline::new(quick_config()).unwrap();
    let report = pipeline.run(&CsvDataSource::new(&data), &store).unwrap();

    assert_eq!(report.corpus.records, 40);
    assert_eq!(report.corpus.kept, 40);
    assert_eq!(report.corpus.fake, 16);
    assert_eq!(report.train_size + report.test_size, 40);
    assert_eq!(report.test_size, 8);
    assert_eq!(report.models.len(), 2);
    assert!(report.vocabulary_size > 0);

    for key in [
        keys::VOCABULARY,
        keys::LINEAR_MODEL,
        keys::FOREST_MODEL,
        keys::BEST_MODEL,
        keys::TRAINING_REPORT,
    ] {
        assert!(store.contains(key), "missing {key}");
    }
    // No temporary files left behind.
    let files = fs::read_dir(store.directory()).unwrap().count();
    assert_eq!(files, 5);

    let vocabulary = load_vocabulary(&store).unwrap().vocabulary;
    assert_eq!(vocabulary.dimension(), report.vocabulary_size);
    assert_eq!(vocabulary.fingerprint(), Some(report.vocabulary_fingerprint));

    for key in keys::CLASSIFIERS {
        let classifier = load_classifier(&store, key).unwrap();
        classifier.ensure_compatible(&vocabulary).unwrap();
        assert_eq!(classifier.metadata.run_id, Some(report.run_id));
    }

    let text = fs::read_to_string(store.directory().join(keys::TRAINING_REPORT)).unwrap();
    let stored: TrainingReport = serde_json::from_str(&text).unwrap();
    assert_eq!(stored, report);
}

#[test]
fn test_separable_corpus_reaches_target() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("postings.csv");
    write_csv(&data, 5);
    let store = FileArtifactStore::new(dir.path().join("models")).unwrap();

    let report = TrainingPipeline::new(quick_config())
        .unwrap()
        .run(open_data_source(&data).as_ref(), &store)
        .unwrap();

    assert!(report.target_met, "{}", report.render());
    assert!(report.best().unwrap().evaluation.accuracy >= 0.9);

    let evaluation = evaluate_stored_model(
        &CsvDataSource::new(&data),
        &store,
        keys::BEST_MODEL,
        &Evaluator::default(),
    )
    .unwrap();
    assert_eq!(evaluation.support, 50);
    assert!(evaluation.accuracy >= 0.9);
}

#[test]
fn test_training_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("postings.csv");
    write_csv(&data, 4);

    let first = FileArtifactStore::new(dir.path().join("a")).unwrap();
    let second = FileArtifactStore::new(dir.path().join("b")).unwrap();
    let pipeline = TrainingPipeline::new(quick_config()).unwrap();
    let report_a = pipeline.run(&CsvDataSource::new(&data), &first).unwrap();
    let report_b = pipeline.run(&CsvDataSource::new(&data), &second).unwrap();

    assert_eq!(
        first.get(keys::VOCABULARY).unwrap(),
        second.get(keys::VOCABULARY).unwrap()
    );
    for key in [keys::LINEAR_MODEL, keys::FOREST_MODEL, keys::BEST_MODEL] {
        let a = load_classifier(&first, key).unwrap();
        let b = load_classifier(&second, key).unwrap();
        assert_eq!(a.model, b.model, "{key} differs between runs");
        assert_eq!(a.metadata.hyperparameters, b.metadata.hyperparameters);
    }

    assert_eq!(report_a.best_model, report_b.best_model);
    assert_eq!(report_a.vocabulary_fingerprint, report_b.vocabulary_fingerprint);
    for (a, b) in report_a.models.iter().zip(&report_b.models) {
        assert_eq!(a.evaluation, b.evaluation, "{} evaluation differs", a.kind);
    }
}

#[test]
fn test_jsonl_source_and_model_selection() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("postings.jsonl");
    let mut lines = String::new();
    for round in 0..4 {
        for text in REAL {
            lines.push_str(&serde_json::json!({"description": format!("{text} {round}"), "fraudulent": 0}).to_string());
            lines.push('\n');
        }
        for text in FAKE {
            lines.push_str(&serde_json::json!({"description": format!("{text} {round}"), "fraudulent": 1}).to_string());
            lines.push('\n');
        }
    }
    fs::write(&data, lines).unwrap();

    let config = PipelineConfig {
        models: vec![ClassifierKind::Linear],
        ..quick_config()
    };
    let store = FileArtifactStore::new(dir.path().join("models")).unwrap();
    let report = TrainingPipeline::new(config)
        .unwrap()
        .run(&JsonlDataSource::new(&data), &store)
        .unwrap();

    assert_eq!(report.models.len(), 1);
    assert_eq!(report.best_model, ClassifierKind::Linear);
    assert!(!store.contains(keys::FOREST_MODEL));
    assert!(store.contains(keys::BEST_MODEL));
}

#[test]
fn test_missing_data_file_fails_at_load() {
    let dir = TempDir::new().unwrap();
    let store = FileArtifactStore::new(dir.path().join("models")).unwrap();

    let err = TrainingPipeline::new(quick_config())
        .unwrap()
        .run(&CsvDataSource::new(dir.path().join("missing.csv")), &store)
        .unwrap_err();

    assert_eq!(err.stage(), Some(TrainingStage::Load));
    assert!(store.keys().unwrap().is_empty());
}

#[test]
fn test_single_class_fails_at_split_without_writing() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("postings.csv");
    let mut writer = csv::Writer::from_path(&data).unwrap();
    writer.write_record(["description", "fraudulent"]).unwrap();
    for text in REAL {
        writer.write_record([text, "0"]).unwrap();
    }
    writer.flush().unwrap();

    let store = FileArtifactStore::new(dir.path().join("models")).unwrap();
    let err = TrainingPipeline::new(quick_config())
        .unwrap()
        .run(&CsvDataSource::new(&data), &store)
        .unwrap_err();

    assert_eq!(err.stage(), Some(TrainingStage::Split));
    assert!(store.keys().unwrap().is_empty());
}

#[test]
fn test_config_file_drives_pipeline() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{"split": {"test_size": 0.25, "seed": 7}, "forest": {"n_estimators": 5}, "models": ["ensemble_tree"]}"#,
    )
    .unwrap();
    let data = dir.path().join("postings.csv");
    write_csv(&data, 4);

    let config = PipelineConfig::from_file(&config_path).unwrap();
    let store = FileArtifactStore::new(dir.path().join("models")).unwrap();
    let report = TrainingPipeline::new(config)
        .unwrap()
        .run(&CsvDataSource::new(&data), &store)
        .unwrap();

    assert_eq!(report.test_size, 10);
    assert_eq!(report.best_model, ClassifierKind::EnsembleTree);
    let forest = load_classifier(&store, keys::BEST_MODEL).unwrap();
    assert_eq!(forest.metadata.seed, 7);
    assert_eq!(forest.stats.iterations, 5);
}
