use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use jobcheck::analysis::TextNormalizer;
use jobcheck::classifier::{Classifier, ForestConfig};
use jobcheck::config::PipelineConfig;
use jobcheck::dataset::{Corpus, Label, RawRecord, VecDataSource};
use jobcheck::error::{JobCheckError, ModelStateError};
use jobcheck::feature::VocabularyModel;
use jobcheck::serving::{JsonlPredictionLog, PredictError, PredictionLogEntry, PredictionService};
use jobcheck::storage::{
    FileArtifactStore, MemoryArtifactStore, VocabularyArtifact, keys, load_classifier,
    load_vocabulary, save_classifier, save_vocabulary,
};
use jobcheck::training::{ModelTrainer, TrainingPipeline};

fn records(offset: usize) -> Vec<RawRecord> {
    let real = [
        "Backend engineer building payment services in Rust",
        "Data engineer maintaining analytics pipelines",
        "Senior backend engineer, health insurance and pension",
        "Product designer for our mobile banking app",
        "Engineer working on storage services and pipelines",
    ];
    let fake = [
        "Earn cash from home, no experience needed",
        "Work from home and earn money fast",
        "Easy data entry, earn cash daily from home",
        "Wire transfer payment, no interview, earn fast",
    ];
    let mut out = Vec::new();
    for round in offset..offset + 4 {
        for text in real {
            out.push(
                RawRecord::new(format!("{text} office{round}"))
                    .with_requirements("Degree")
                    .with_label(Label::Real),
            );
        }
        for text in fake {
            out.push(RawRecord::new(format!("{text} bonus{round}")).with_label(Label::Fake));
        }
    }
    out
}

fn train_into(directory: &Path, records: Vec<RawRecord>) {
    let config = PipelineConfig {
        forest: ForestConfig {
            n_estimators: 10,
            ..Default::default()
        },
        ..Default::default()
    };
    let store = FileArtifactStore::new(directory).unwrap();
    TrainingPipeline::new(config)
        .unwrap()
        .run(&VecDataSource::new(records), &store)
        .unwrap();
}

const INPUTS: [(&str, Option<&str>, Option<&str>); 4] = [
    ("Earn cash from home today", None, None),
    ("Backend engineer", Some("Degree in computer science"), Some("Pension")),
    ("<b>Data entry</b> job!!!", None, Some("Paid daily")),
    ("Wire transfer payment for storage engineer", Some("Degree"), None),
];

#[test]
fn test_stored_models_predict_like_freshly_trained_ones() {
    let config = PipelineConfig {
        forest: ForestConfig {
            n_estimators: 10,
            ..Default::default()
        },
        ..Default::default()
    };
    let normalizer = TextNormalizer::with_options(config.normalizer);
    let (corpus, _) = Corpus::prepare(&records(0), &normalizer).unwrap();
    let mut vocabulary = VocabularyModel::new(config.vectorizer.clone());
    vocabulary.fit(corpus.texts()).unwrap();
    let features = vocabulary.transform_batch(corpus.texts()).unwrap();
    let trained = ModelTrainer::from_config(&config)
        .train_all(&features, corpus.labels(), &vocabulary)
        .unwrap();

    let store = MemoryArtifactStore::new();
    save_vocabulary(
        &store,
        &VocabularyArtifact {
            normalizer: config.normalizer,
            vocabulary: vocabulary.clone(),
        },
    )
    .unwrap();

    for model in &trained {
        let key = model.kind().artifact_key();
        save_classifier(&store, key, model).unwrap();
        let service = PredictionService::from_store_with_model(&store, key).unwrap();
        assert_eq!(service.metadata(), &model.metadata);

        for (description, requirements, benefits) in INPUTS {
            let result = service.predict(description, requirements, benefits).unwrap();

            let cleaned = normalizer.normalize_fields(description, requirements, benefits);
            let features = vocabulary.transform(&cleaned).unwrap();
            let [p_real, p_fake] = model.predict_proba(&features).unwrap();

            assert_eq!(result.probability_real.to_bits(), p_real.to_bits(), "{key}");
            assert_eq!(result.probability_fake.to_bits(), p_fake.to_bits(), "{key}");
            assert_eq!(result.label, model.predict(&features).unwrap(), "{key}");
        }
    }
}

#[test]
fn test_loaded_service_matches_in_process_model() {
    let dir = TempDir::new().unwrap();
    train_into(dir.path(), records(0));

    let store = FileArtifactStore::open(dir.path()).unwrap();
    let artifact = load_vocabulary(&store).unwrap();
    let classifier = load_classifier(&store, keys::BEST_MODEL).unwrap();
    let normalizer = TextNormalizer::with_options(artifact.normalizer);

    let service = PredictionService::load(dir.path()).unwrap();
    assert_eq!(service.metadata(), &classifier.metadata);

    for (description, requirements, benefits) in INPUTS {
        let result = service.predict(description, requirements, benefits).unwrap();

        let cleaned = normalizer.normalize_fields(description, requirements, benefits);
        let features = artifact.vocabulary.transform(&cleaned).unwrap();
        let [p_real, p_fake] = classifier.predict_proba(&features).unwrap();

        assert_eq!(result.probability_real.to_bits(), p_real.to_bits());
        assert_eq!(result.probability_fake.to_bits(), p_fake.to_bits());
        assert_eq!(result.label, classifier.predict(&features).unwrap());
    }
}

#[test]
fn test_service_separates_obvious_cases() {
    let dir = TempDir::new().unwrap();
    train_into(dir.path(), records(0));
    let service = PredictionService::load(dir.path()).unwrap();

    let fake = service
        .predict("Earn cash from home, no experience", None, None)
        .unwrap();
    assert_eq!(fake.label, Label::Fake);
    assert_eq!(fake.prediction, 1);
    assert!(fake.confidence >= 50.0 && fake.confidence <= 100.0);

    let real = service
        .predict("Backend engineer for payment services", Some("Degree"), None)
        .unwrap();
    assert_eq!(real.label, Label::Real);
    assert_eq!(real.prediction, 0);
}

#[test]
fn test_empty_input_is_rejected_and_service_stays_usable() {
    let dir = TempDir::new().unwrap();
    train_into(dir.path(), records(0));
    let service = PredictionService::load(dir.path()).unwrap();

    assert_eq!(service.predict("", Some(""), Some("")), Err(PredictError::EmptyInput));
    assert_eq!(
        service.predict("   <div></div> ", None, None),
        Err(PredictError::EmptyInput)
    );
    assert!(service.predict("earn cash", None, None).is_ok());
}

#[test]
fn test_unknown_terms_are_low_information() {
    let dir = TempDir::new().unwrap();
    train_into(dir.path(), records(0));
    let service = PredictionService::load(dir.path()).unwrap();

    let result = service.predict("zebra xylophone quokka", None, None).unwrap();
    assert!(result.low_information);
    assert!((result.probability_real + result.probability_fake - 1.0).abs() < 1e-9);
}

#[test]
fn test_mismatched_artifacts_are_refused() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    train_into(first.path(), records(0));
    train_into(second.path(), records(100));

    fs::copy(
        second.path().join(keys::BEST_MODEL),
        first.path().join(keys::BEST_MODEL),
    )
    .unwrap();

    let err = PredictionService::load(first.path()).unwrap_err();
    assert!(
        matches!(
            err.source,
            JobCheckError::ModelState(ModelStateError::SchemaMismatch { .. })
        ),
        "{err}"
    );
}

#[test]
fn test_corrupted_artifact_is_refused() {
    let dir = TempDir::new().unwrap();
    train_into(dir.path(), records(0));

    let path = dir.path().join(keys::VOCABULARY);
    let mut bytes = fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xff;
    fs::write(&path, bytes).unwrap();

    let err = PredictionService::load(dir.path()).unwrap_err();
    assert!(matches!(err.source, JobCheckError::Artifact(_)), "{err}");
}

#[test]
fn test_missing_directory_is_unavailable() {
    let dir = TempDir::new().unwrap();
    assert!(PredictionService::load(dir.path().join("nothing-here")).is_err());
    assert!(PredictionService::load(dir.path()).is_err());
}

#[test]
fn test_concurrent_predictions_are_consistent() {
    let dir = TempDir::new().unwrap();
    train_into(dir.path(), records(0));
    let service = Arc::new(PredictionService::load(dir.path()).unwrap());
    let expected = service.predict("earn cash from home", None, None).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                (0..25)
                    .map(|_| service.predict("earn cash from home", None, None).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for result in handle.join().unwrap() {
            assert_eq!(result, expected);
        }
    }
}

#[test]
fn test_predictions_are_logged() {
    let dir = TempDir::new().unwrap();
    train_into(dir.path(), records(0));
    let log_path = dir.path().join("predictions.jsonl");

    let log = Arc::new(JsonlPredictionLog::open(&log_path).unwrap());
    let service = PredictionService::load(dir.path()).unwrap().with_sink(log.clone());
    let result = service
        .predict("Earn cash from home", None, Some("Paid daily"))
        .unwrap();
    assert!(service.predict("", None, None).is_err());

    drop(service);
    Arc::try_unwrap(log).unwrap().close();

    let text = fs::read_to_string(&log_path).unwrap();
    let entries: Vec<PredictionLogEntry> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].description, "Earn cash from home");
    assert_eq!(entries[0].benefits.as_deref(), Some("Paid daily"));
    assert_eq!(entries[0].result, result);
}
