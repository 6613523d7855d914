//! # jobcheck
//!
//! Detection of fraudulent job postings from their free text.
//!
//! ## Features
//!
//! - Deterministic text normalization shared by training and serving
//! - TF-IDF vocabulary over word n-grams
//! - Logistic regression and random forest classifiers
//! - Stratified holdout evaluation with model selection
//! - Checksummed, versioned artifacts with pluggable storage
//! - Thread-safe prediction service with non-blocking prediction logging
//!
//! ## Example
//!
//! ```
//! use jobcheck::prelude::*;
//!
//! let normalizer = TextNormalizer::new();
//! assert_eq!(
//!     normalizer.normalize("<p>Earn CASH from home!</p>"),
//!     "earn cash home"
//! );
//! ```

pub mod analysis;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod feature;
pub mod serving;
pub mod storage;
pub mod training;

pub mod prelude {
    pub use crate::analysis::{NormalizerOptions, TextNormalizer};
    pub use crate::classifier::{Classifier, ClassifierKind, TrainedClassifier};
    pub use crate::config::PipelineConfig;
    pub use crate::dataset::{DataSource, Label, RawRecord, open_data_source};
    pub use crate::error::{JobCheckError, Result};
    pub use crate::evaluation::{EvaluationReport, Evaluator};
    pub use crate::feature::{FeatureVector, VocabularyModel};
    pub use crate::serving::{PredictError, PredictionResult, PredictionService};
    pub use crate::storage::{ArtifactStore, FileArtifactStore, MemoryArtifactStore};
    pub use crate::training::{TrainingPipeline, TrainingReport};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
