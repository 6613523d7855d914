//! Text normalization shared by training and serving.
//!
//! [`TextNormalizer`] is the only place posting text is cleaned. Corpus
//! preprocessing and [`PredictionService`](crate::serving::PredictionService)
//! both call into it, and the options used at training time are persisted
//! with the vocabulary artifact so serving replays them exactly.
//!
//! The steps run in a fixed order:
//!
//! ```text
//! HTML strip → case-fold → punctuation strip → whitespace collapse → stop words
//! ```
//!
//! # Examples
//!
//! ```
//! use jobcheck::analysis::TextNormalizer;
//!
//! let normalizer = TextNormalizer::new();
//! let cleaned = normalizer.normalize("<p>Software Engineer needed, apply NOW!!!</p>");
//! assert_eq!(cleaned, "software engineer needed apply");
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::html::HtmlStripper;
use crate::analysis::stop_words::StopWords;
use crate::dataset::RawRecord;

/// ASCII punctuation and symbols plus every Unicode punctuation category.
const PUNCTUATION_PATTERN: &str = r"[[:punct:]\p{P}]";

static PUNCTUATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(PUNCTUATION_PATTERN).expect("punctuation pattern should be valid")
});

/// Independently toggleable normalization steps.
///
/// Whitespace collapsing is not optional: it always runs after the
/// character-level steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerOptions {
    /// Strip markup, keeping inner text.
    pub remove_html: bool,
    /// Case-fold: NFKC compatibility folding, then lowercase. Folding maps
    /// styled letters such as mathematical capitals onto their plain forms.
    pub lowercase: bool,
    /// Strip punctuation characters.
    pub remove_punctuation: bool,
    /// Drop English stop words.
    pub remove_stopwords: bool,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            remove_html: true,
            lowercase: true,
            remove_punctuation: true,
            remove_stopwords: true,
        }
    }
}

impl NormalizerOptions {
    /// All optional steps disabled; only whitespace is collapsed.
    pub fn none() -> Self {
        Self {
            remove_html: false,
            lowercase: false,
            remove_punctuation: false,
            remove_stopwords: false,
        }
    }
}

/// Check whether `c` is stripped by the punctuation step.
pub fn is_punctuation(c: char) -> bool {
    PUNCTUATION_REGEX.is_match(c.encode_utf8(&mut [0; 4]))
}

/// Deterministic text → text cleaner.
#[derive(Clone, Debug)]
pub struct TextNormalizer {
    options: NormalizerOptions,
    stop_words: StopWords,
    html: &'static HtmlStripper,
}

impl TextNormalizer {
    /// Create a normalizer with the default options and English stop words.
    pub fn new() -> Self {
        Self::with_options(NormalizerOptions::default())
    }

    /// Create a normalizer with explicit options.
    pub fn with_options(options: NormalizerOptions) -> Self {
        Self::with_stop_words(options, StopWords::english())
    }

    /// Create a normalizer with explicit options and a custom stop word set.
    pub fn with_stop_words(options: NormalizerOptions, stop_words: StopWords) -> Self {
        TextNormalizer {
            options,
            stop_words,
            html: HtmlStripper::shared(),
        }
    }

    /// The options this normalizer applies.
    pub fn options(&self) -> NormalizerOptions {
        self.options
    }

    /// The stop word set this normalizer filters with.
    pub fn stop_words(&self) -> &StopWords {
        &self.stop_words
    }

    /// Normalize `text`.
    pub fn normalize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut text = if self.options.remove_html {
            self.html.strip(text)
        } else {
            text.to_string()
        };

        if self.options.lowercase {
            text = text.nfkc().collect::<String>().to_lowercase();
        }

        if self.options.remove_punctuation {
            text = PUNCTUATION_REGEX.replace_all(&text, "").into_owned();
        }

        let collapsed = collapse_whitespace(&text);

        if self.options.remove_stopwords {
            self.remove_stop_words(&collapsed)
        } else {
            collapsed
        }
    }

    /// Normalize optional text; `None` is treated as the empty string.
    pub fn normalize_opt(&self, text: Option<&str>) -> String {
        self.normalize(text.unwrap_or_default())
    }

    /// Merge the text fields of a posting and normalize the result.
    ///
    /// This is the exact derivation used for both training rows and
    /// prediction requests.
    pub fn normalize_fields(
        &self,
        description: &str,
        requirements: Option<&str>,
        benefits: Option<&str>,
    ) -> String {
        let merged = merge_fields(description, requirements, benefits);
        self.normalize(&merged)
    }

    /// Normalize a raw record's merged text.
    pub fn normalize_record(&self, record: &RawRecord) -> String {
        self.normalize_fields(
            &record.description,
            record.requirements.as_deref(),
            record.benefits.as_deref(),
        )
    }

    fn remove_stop_words(&self, text: &str) -> String {
        let mut output = String::with_capacity(text.len());
        for token in text.split_word_bounds() {
            if token.chars().all(char::is_whitespace) || self.stop_words.contains(token) {
                continue;
            }
            if !output.is_empty() {
                output.push(' ');
            }
            output.push_str(token);
        }
        output
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Join the posting fields with single spaces; missing fields are empty.
pub fn merge_fields(description: &str, requirements: Option<&str>, benefits: Option<&str>) -> String {
    format!(
        "{} {} {}",
        description,
        requirements.unwrap_or_default(),
        benefits.unwrap_or_default()
    )
}

/// Collapse runs of whitespace into single spaces and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !output.is_empty() {
            output.push(' ');
        }
        output.push_str(word);
    }
    output
}
