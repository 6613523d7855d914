//! Text analysis for job postings.
//!
//! This module provides the deterministic cleaning pipeline applied to
//! posting text before vectorization: markup stripping, case folding,
//! punctuation removal, whitespace collapsing, and stop word filtering.

pub mod html;
pub mod normalizer;
pub mod stop_words;

// Re-export commonly used types
pub use html::HtmlStripper;
pub use normalizer::{NormalizerOptions, TextNormalizer, is_punctuation, merge_fields};
pub use stop_words::StopWords;
