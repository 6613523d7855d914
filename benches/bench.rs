//! Criterion benchmarks for jobcheck.
//!
//! Covers the per-request serving path:
//! - Text normalization
//! - TF-IDF transform
//! - Classifier prediction

use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use jobcheck::analysis::TextNormalizer;
use jobcheck::classifier::{
    Classifier, EnsembleTreeClassifier, ForestConfig, LinearClassifier, LinearConfig,
};
use jobcheck::dataset::Label;
use jobcheck::feature::{FeatureVector, VectorizerConfig, VocabularyModel};

/// Generate posting-like documents with a label each.
fn generate_postings(count: usize) -> (Vec<String>, Vec<Label>) {
    let real_words = [
        "engineer", "backend", "services", "team", "office", "insurance", "pension",
        "degree", "experience", "analytics", "pipelines", "design", "product", "senior",
    ];
    let fake_words = [
        "earn", "cash", "home", "fast", "daily", "wire", "transfer", "money", "easy",
        "online", "entry", "bonus", "payment", "instant",
    ];

    let mut texts = Vec::with_capacity(count);
    let mut labels = Vec::with_capacity(count);
    for i in 0..count {
        let (words, label) = if i % 5 == 0 {
            (&fake_words, Label::Fake)
        } else {
            (&real_words, Label::Real)
        };
        let length = 40 + (i % 60);
        let mut doc = Vec::with_capacity(length + 2);
        doc.push("<p>".to_string());
        for j in 0..length {
            let word = words[(i * 7 + j * 13) % words.len()];
            doc.push(if j % 11 == 0 {
                format!("The {}!", word.to_uppercase())
            } else {
                word.to_string()
            });
        }
        doc.push("</p>".to_string());
        texts.push(doc.join(" "));
        labels.push(label);
    }
    (texts, labels)
}

fn fitted(texts: &[String]) -> (TextNormalizer, VocabularyModel, Vec<String>) {
    let normalizer = TextNormalizer::new();
    let cleaned: Vec<String> = texts.iter().map(|t| normalizer.normalize(t)).collect();
    let mut vocabulary = VocabularyModel::new(VectorizerConfig::default());
    vocabulary.fit(&cleaned).unwrap();
    (normalizer, vocabulary, cleaned)
}

/// Benchmark text normalization.
fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let normalizer = TextNormalizer::new();
    let (texts, _) = generate_postings(500);

    group.bench_function("normalize_single_posting", |b| {
        b.iter(|| black_box(normalizer.normalize(black_box(&texts[0]))))
    });

    group.throughput(Throughput::Elements(100));
    group.bench_function("normalize_batch_postings", |b| {
        b.iter(|| {
            for text in texts.iter().take(100) {
                black_box(normalizer.normalize(black_box(text)));
            }
        })
    });

    group.finish();
}

/// Benchmark vocabulary fitting and transform.
fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");
    let (texts, _) = generate_postings(1000);
    let (_, vocabulary, cleaned) = fitted(&texts);

    group.bench_function("transform_single", |b| {
        b.iter(|| black_box(vocabulary.transform(black_box(&cleaned[0])).unwrap()))
    });

    group.throughput(Throughput::Elements(cleaned.len() as u64));
    group.bench_function("transform_batch", |b| {
        b.iter(|| black_box(vocabulary.transform_batch(black_box(&cleaned)).unwrap()))
    });

    group.sample_size(10);
    group.bench_function("fit_1000_documents", |b| {
        b.iter(|| {
            let mut model = VocabularyModel::new(VectorizerConfig::default());
            model.fit(black_box(&cleaned)).unwrap();
            black_box(model)
        })
    });

    group.finish();
}

/// Benchmark single-record prediction for both model families.
fn bench_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict");
    let (texts, labels) = generate_postings(1000);
    let (normalizer, vocabulary, cleaned) = fitted(&texts);
    let features: Vec<FeatureVector> = vocabulary.transform_batch(&cleaned).unwrap();

    let (linear, _) = LinearClassifier::fit(&LinearConfig::default(), &features, &labels, 42).unwrap();
    let forest_config = ForestConfig {
        n_estimators: 50,
        ..Default::default()
    };
    let (forest, _) = EnsembleTreeClassifier::fit(&forest_config, &features, &labels, 42).unwrap();

    group.bench_function("linear_predict_proba", |b| {
        b.iter(|| black_box(linear.predict_proba(black_box(&features[0])).unwrap()))
    });

    group.bench_function("forest_predict_proba", |b| {
        b.iter(|| black_box(forest.predict_proba(black_box(&features[0])).unwrap()))
    });

    group.bench_function("end_to_end_linear", |b| {
        b.iter(|| {
            let cleaned = normalizer.normalize(black_box(&texts[1]));
            let vector = vocabulary.transform(&cleaned).unwrap();
            black_box(linear.predict_proba(&vector).unwrap())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_transform, bench_predict);

criterion_main!(benches);
