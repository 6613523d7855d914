//! Feature extraction: TF-IDF vocabulary and sparse vectors.

pub mod config;
pub mod tokenizer;
pub mod vector;
pub mod vocabulary;

pub use config::{DocumentFrequency, VectorizerConfig};
pub use tokenizer::{TOKEN_PATTERN, TermExtractor};
pub use vector::FeatureVector;
pub use vocabulary::VocabularyModel;
