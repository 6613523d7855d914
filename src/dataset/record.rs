//! Posting records and binary labels.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{JobCheckError, Result};

/// Binary posting label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    /// Legitimate posting (class index 0).
    Real,
    /// Fraudulent posting (class index 1).
    Fake,
}

impl Label {
    /// Both labels in class-index order.
    pub const ALL: [Label; 2] = [Label::Real, Label::Fake];

    /// The class index of this label.
    pub fn index(self) -> usize {
        match self {
            Label::Real => 0,
            Label::Fake => 1,
        }
    }

    /// Map a class index to a label.
    pub fn from_index(index: usize) -> Option<Label> {
        match index {
            0 => Some(Label::Real),
            1 => Some(Label::Fake),
            _ => None,
        }
    }

    /// Human readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Real => "Real",
            Label::Fake => "Fake",
        }
    }

    /// Parse a label from a dataset cell (`0`/`1`, `true`/`false`, `real`/`fake`).
    pub fn parse(value: &str) -> Option<Label> {
        let value = value.trim();
        if value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("fake") {
            Some(Label::Fake)
        } else if value == "0"
            || value.eq_ignore_ascii_case("false")
            || value.eq_ignore_ascii_case("real")
        {
            Some(Label::Real)
        } else {
            None
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> u8 {
        label.index() as u8
    }
}

impl TryFrom<u8> for Label {
    type Error = JobCheckError;

    fn try_from(value: u8) -> Result<Label> {
        Label::from_index(value as usize)
            .ok_or_else(|| JobCheckError::data(format!("label must be 0 or 1, got {value}")))
    }
}

/// A job posting as read from a data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Posting description. Missing values read as the empty string.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Candidate requirements.
    #[serde(default)]
    pub requirements: Option<String>,
    /// Offered benefits.
    #[serde(default)]
    pub benefits: Option<String>,
    /// Ground truth label, present only in training corpora.
    #[serde(default, alias = "fraudulent")]
    pub label: Option<Label>,
}

impl RawRecord {
    /// Create an unlabeled record with only a description.
    pub fn new<S: Into<String>>(description: S) -> Self {
        RawRecord {
            description: description.into(),
            ..Default::default()
        }
    }

    /// Set the requirements text.
    pub fn with_requirements<S: Into<String>>(mut self, requirements: S) -> Self {
        self.requirements = Some(requirements.into());
        self
    }

    /// Set the benefits text.
    pub fn with_benefits<S: Into<String>>(mut self, benefits: S) -> Self {
        self.benefits = Some(benefits.into());
        self
    }

    /// Set the label.
    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
