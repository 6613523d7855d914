//! Error types for the jobcheck library.
//!
//! All fallible library operations return [`JobCheckError`] through the
//! [`Result`] alias. Per-request serving failures are deliberately kept out
//! of this enum: see [`crate::serving::PredictError`].
//!
//! # Examples
//!
//! ```
//! use jobcheck::error::{JobCheckError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(JobCheckError::data("missing description column"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for jobcheck operations.
#[derive(Error, Debug)]
pub enum JobCheckError {
    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or missing input data.
    #[error("Data error: {0}")]
    Data(String),

    /// Not enough examples of a class to stratify the corpus.
    #[error(
        "Insufficient data: class {class} needs at least {required} examples, got {actual}"
    )]
    InsufficientData {
        class: String,
        required: usize,
        actual: usize,
    },

    /// Model used in a state that does not allow the operation.
    #[error("Model state error: {0}")]
    ModelState(#[from] ModelStateError),

    /// Nothing left to classify after normalization.
    #[error("Input is empty after normalization")]
    EmptyInput,

    /// Missing, corrupt, or incompatible persisted artifact.
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Numeric failure while running a classifier.
    #[error("Inference error: {0}")]
    Inference(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Binary serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing errors.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A training pipeline failure tagged with the stage that failed.
    #[error("Training failed during {stage}: {source}")]
    Stage {
        stage: TrainingStage,
        #[source]
        source: Box<JobCheckError>,
    },
}

/// Errors raised when a model is used in the wrong lifecycle state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelStateError {
    /// `transform` was called on a vocabulary model that was never fitted.
    #[error("vocabulary model is not fitted")]
    NotFitted,

    /// Fitting produced no usable terms.
    #[error("fit produced an empty vocabulary: {0}")]
    EmptyVocabulary(String),

    /// A classifier and vocabulary from different training runs were paired.
    #[error("schema mismatch: expected {expected}, found {actual}")]
    SchemaMismatch { expected: String, actual: String },
}

/// Stages of the batch training pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStage {
    Load,
    Normalize,
    Fit,
    Split,
    Train,
    Evaluate,
    Persist,
}

impl fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrainingStage::Load => "load",
            TrainingStage::Normalize => "normalize",
            TrainingStage::Fit => "fit",
            TrainingStage::Split => "split",
            TrainingStage::Train => "train",
            TrainingStage::Evaluate => "evaluate",
            TrainingStage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Result type alias for operations that may fail with JobCheckError.
pub type Result<T> = std::result::Result<T, JobCheckError>;

impl JobCheckError {
    /// Create a new data error.
    pub fn data<S: Into<String>>(msg: S) -> Self {
        JobCheckError::Data(msg.into())
    }

    /// Create a new artifact error.
    pub fn artifact<S: Into<String>>(msg: S) -> Self {
        JobCheckError::Artifact(msg.into())
    }

    /// Create a new inference error.
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        JobCheckError::Inference(msg.into())
    }

    /// Create a new invalid config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        JobCheckError::Config(msg.into())
    }

    /// Create a new insufficient data error.
    pub fn insufficient_data<S: Into<String>>(class: S, required: usize, actual: usize) -> Self {
        JobCheckError::InsufficientData {
            class: class.into(),
            required,
            actual,
        }
    }

    /// Create a new schema mismatch error.
    pub fn schema_mismatch<E: Into<String>, A: Into<String>>(expected: E, actual: A) -> Self {
        JobCheckError::ModelState(ModelStateError::SchemaMismatch {
            expected: expected.into(),
            actual: actual.into(),
        })
    }

    /// Tag this error with the training stage it occurred in.
    ///
    /// Errors that already carry a stage are returned unchanged so the
    /// innermost stage wins.
    pub fn at_stage(self, stage: TrainingStage) -> Self {
        match self {
            JobCheckError::Stage { .. } => self,
            other => JobCheckError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was tagged with, if any.
    pub fn stage(&self) -> Option<TrainingStage> {
        match self {
            JobCheckError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Extension for tagging results with a training stage.
pub trait StageContext<T> {
    /// Attach `stage` to the error, if any.
    fn stage(self, stage: TrainingStage) -> Result<T>;
}

impl<T> StageContext<T> for Result<T> {
    fn stage(self, stage: TrainingStage) -> Result<T> {
        self.map_err(|e| e.at_stage(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = JobCheckError::data("missing column");
        assert_eq!(error.to_string(), "Data error: missing column");

        let error = JobCheckError::artifact("bad checksum");
        assert_eq!(error.to_string(), "Artifact error: bad checksum");

        let error = JobCheckError::insufficient_data("Fake", 2, 1);
        assert_eq!(
            error.to_string(),
            "Insufficient data: class Fake needs at least 2 examples, got 1"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = JobCheckError::from(io_error);

        match error {
            JobCheckError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_stage_tagging_keeps_innermost_stage() {
        let error = JobCheckError::ModelState(ModelStateError::EmptyVocabulary("x".into()))
            .at_stage(TrainingStage::Fit)
            .at_stage(TrainingStage::Train);

        assert_eq!(error.stage(), Some(TrainingStage::Fit));
        assert!(error.to_string().starts_with("Training failed during fit"));
    }

    #[test]
    fn test_stage_context_on_ok_is_passthrough() {
        let value: Result<u32> = Ok(7);
        assert_eq!(value.stage(TrainingStage::Split).unwrap(), 7);
    }
}
