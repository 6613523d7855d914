//! Online prediction over trained artifacts.
//!
//! [`PredictionService`] loads the vocabulary and a classifier once and then
//! answers single-record predictions. An optional [`PredictionSink`] receives
//! each successful prediction without blocking the caller.

pub mod log;
pub mod service;

pub use log::{
    DEFAULT_QUEUE_CAPACITY, JsonlPredictionLog, MAX_DESCRIPTION_CHARS, MAX_FIELD_CHARS,
    PredictionLogEntry, PredictionSink,
};
pub use service::{PredictError, PredictionResult, PredictionService, ServiceUnavailable};
