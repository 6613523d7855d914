//! Artifact persistence.
//!
//! Trained models are written as checksummed envelopes (see [`artifact`])
//! into an [`ArtifactStore`]. Two backends are provided:
//!
//! - [`FileArtifactStore`]: one file per key in a directory, written atomically
//! - [`MemoryArtifactStore`]: a map behind a lock, for tests and embedding
//!
//! # Example
//!
//! ```
//! use jobcheck::storage::{ArtifactStore, MemoryArtifactStore};
//!
//! # fn main() -> jobcheck::error::Result<()> {
//! let store = MemoryArtifactStore::new();
//! store.put("best_model", b"...")?;
//! assert!(store.contains("best_model"));
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod file;
pub mod memory;
pub mod traits;

pub use artifact::{
    ArtifactHeader, ArtifactKind, VocabularyArtifact, decode, encode, load_classifier,
    load_vocabulary, read_header, save_classifier, save_vocabulary,
};
pub use file::FileArtifactStore;
pub use memory::MemoryArtifactStore;
pub use traits::{ArtifactStore, validate_key};

/// Well-known artifact keys.
pub mod keys {
    /// The fitted vocabulary and its normalizer options.
    pub const VOCABULARY: &str = "tfidf_vectorizer";
    /// The logistic regression classifier.
    pub const LINEAR_MODEL: &str = "logistic_regression_model";
    /// The random forest classifier.
    pub const FOREST_MODEL: &str = "random_forest_model";
    /// The classifier selected by evaluation.
    pub const BEST_MODEL: &str = "best_model";
    /// JSON summary of the training run.
    pub const TRAINING_REPORT: &str = "training_report.json";

    /// Keys that hold classifier envelopes.
    pub const CLASSIFIERS: [&str; 3] = [LINEAR_MODEL, FOREST_MODEL, BEST_MODEL];
}
