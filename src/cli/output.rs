//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::classifier::{ModelMetadata, TrainingStats};
use crate::cli::args::{JobCheckArgs, OutputFormat};
use crate::error::Result;
use crate::evaluation::EvaluationReport;
use crate::serving::PredictionResult;
use crate::training::TrainingReport;

/// Types with a human-readable rendering.
pub trait HumanOutput {
    fn human(&self) -> String;
}

/// Result structure for text normalization.
#[derive(Debug, Serialize, Deserialize)]
pub struct NormalizationResult {
    pub original: String,
    pub cleaned: String,
    pub tokens: usize,
}

/// Result structure for evaluating a stored model.
#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub model: String,
    pub records: usize,
    pub target_accuracy: f64,
    pub target_met: bool,
    pub report: EvaluationReport,
}

/// One stored artifact.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub key: String,
    pub size_bytes: u64,
    /// Envelope format version; `None` for files outside the envelope.
    pub version: Option<u16>,
}

/// Summary of the stored vocabulary.
#[derive(Debug, Serialize, Deserialize)]
pub struct VocabularySummary {
    pub terms: usize,
    pub fingerprint: u32,
    pub documents: usize,
    pub ngram_range: (usize, usize),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<Vec<String>>,
}

/// Summary of one stored classifier.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifierSummary {
    pub key: String,
    pub metadata: ModelMetadata,
    pub stats: TrainingStats,
}

/// Result structure for artifact inspection.
#[derive(Debug, Serialize, Deserialize)]
pub struct InspectionResult {
    pub directory: String,
    pub artifacts: Vec<ArtifactEntry>,
    pub vocabulary: Option<VocabularySummary>,
    pub classifiers: Vec<ClassifierSummary>,
}

/// Output a result in the selected format.
pub fn output_result<T: Serialize + HumanOutput>(result: &T, args: &JobCheckArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            print!("{}", result.human());
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

fn output_json<T: Serialize>(result: &T, args: &JobCheckArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

impl HumanOutput for TrainingReport {
    fn human(&self) -> String {
        self.render()
    }
}

impl HumanOutput for PredictionResult {
    fn human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Prediction: {} ({:.2}% confidence)", self.label, self.confidence);
        let _ = writeln!(
            out,
            "P(Real) = {:.4}, P(Fake) = {:.4}",
            self.probability_real, self.probability_fake
        );
        if self.low_information {
            let _ = writeln!(out, "Warning: no known terms in input; result is unreliable");
        }
        out
    }
}

impl HumanOutput for NormalizationResult {
    fn human(&self) -> String {
        format!("{}\n", self.cleaned)
    }
}

impl HumanOutput for EvaluationResult {
    fn human(&self) -> String {
        let mut out = self.report.render();
        let status = if self.target_met { "reached" } else { "not reached" };
        let _ = writeln!(
            out,
            "Evaluated {} records; target accuracy {:.0}%: {}",
            self.records,
            self.target_accuracy * 100.0,
            status
        );
        out
    }
}

impl HumanOutput for InspectionResult {
    fn human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Artifacts in {}:", self.directory);
        for artifact in &self.artifacts {
            let version = artifact
                .version
                .map(|v| format!("v{v}"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "  {:<32}{:>10}  {}",
                artifact.key,
                format_bytes(artifact.size_bytes),
                version
            );
        }

        if let Some(vocabulary) = &self.vocabulary {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "Vocabulary: {} terms from {} documents, n-grams {}..={}, fingerprint {:08x}",
                vocabulary.terms,
                vocabulary.documents,
                vocabulary.ngram_range.0,
                vocabulary.ngram_range.1,
                vocabulary.fingerprint
            );
            if let Some(terms) = &vocabulary.vocabulary {
                for term in terms {
                    let _ = writeln!(out, "  {term}");
                }
            }
        }

        for classifier in &self.classifiers {
            let metadata = &classifier.metadata;
            let _ = writeln!(out);
            let _ = writeln!(out, "{} ({})", classifier.key, metadata.name);
            let _ = writeln!(out, "  trained at:   {}", metadata.trained_at.to_rfc3339());
            let _ = writeln!(out, "  examples:     {}", metadata.training_examples);
            let _ = writeln!(out, "  seed:         {}", metadata.seed);
            let _ = writeln!(
                out,
                "  training:     {} iterations, {} ms{}",
                classifier.stats.iterations,
                classifier.stats.training_time_ms,
                if classifier.stats.converged { ", converged" } else { "" }
            );
            for (name, value) in &metadata.hyperparameters {
                let _ = writeln!(out, "  {name:<14}{value}");
            }
        }
        out
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Label;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_prediction_human_output() {
        let result = PredictionResult {
            label: Label::Fake,
            prediction: 1,
            confidence: 91.25,
            probability_real: 0.0875,
            probability_fake: 0.9125,
            low_information: true,
        };
        let text = result.human();
        assert!(text.starts_with("Prediction: Fake (91.25% confidence)"));
        assert!(text.contains("unreliable"));
    }

    #[test]
    fn test_evaluation_human_output() {
        let report = EvaluationReport::from_predictions(
            "Logistic Regression",
            &[Label::Real, Label::Fake],
            &[Label::Real, Label::Fake],
        )
        .unwrap();
        let result = EvaluationResult {
            model: "best_model".into(),
            records: 2,
            target_accuracy: 0.9,
            target_met: true,
            report,
        };
        let text = result.human();
        assert!(text.contains("Logistic Regression"));
        assert!(text.contains("target accuracy 90%: reached"));
    }
}
