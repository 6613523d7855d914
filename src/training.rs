//! Model training: per-family trainers and the end-to-end batch pipeline.

pub mod pipeline;
pub mod trainer;

pub use pipeline::{ModelSummary, TrainingPipeline, TrainingReport, evaluate_stored_model};
pub use trainer::ModelTrainer;
