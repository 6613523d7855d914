//! Holdout evaluation and model selection.

use std::fmt::Write as _;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::dataset::Label;
use crate::error::{JobCheckError, Result};
use crate::feature::FeatureVector;

/// Default accuracy the selected model is expected to reach.
pub const DEFAULT_TARGET_ACCURACY: f64 = 0.90;

/// Precision, recall and F1 for a single class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// True examples of this class in the test set.
    pub support: usize,
}

/// Metrics for one model on the holdout set.
///
/// Aggregate precision, recall and F1 are support-weighted averages of the
/// per-class values. The confusion matrix is indexed `[true][predicted]`,
/// both ordered `[Real, Fake]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub model_name: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion_matrix: [[usize; 2]; 2],
    pub per_class: [ClassMetrics; 2],
    /// Test-set size.
    pub support: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn harmonic_mean(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

impl EvaluationReport {
    /// Compute a report from true and predicted labels.
    pub fn from_predictions(model_name: &str, truth: &[Label], predicted: &[Label]) -> Result<Self> {
        if truth.len() != predicted.len() {
            return Err(JobCheckError::data(format!(
                "{} true labels but {} predictions",
                truth.len(),
                predicted.len()
            )));
        }
        if truth.is_empty() {
            return Err(JobCheckError::data("cannot evaluate on an empty test set"));
        }

        let mut matrix = [[0usize; 2]; 2];
        for (t, p) in truth.iter().zip(predicted) {
            matrix[t.index()][p.index()] += 1;
        }

        let total = truth.len();
        let mut per_class = [ClassMetrics::default(); 2];
        for class in 0..2 {
            let true_positive = matrix[class][class];
            let predicted_count = matrix[0][class] + matrix[1][class];
            let support = matrix[class][0] + matrix[class][1];
            let precision = ratio(true_positive, predicted_count);
            let recall = ratio(true_positive, support);
            per_class[class] = ClassMetrics {
                precision,
                recall,
                f1: harmonic_mean(precision, recall),
                support,
            };
        }

        let weighted = |metric: fn(&ClassMetrics) -> f64| {
            per_class
                .iter()
                .map(|m| metric(m) * m.support as f64)
                .sum::<f64>()
                / total as f64
        };

        Ok(EvaluationReport {
            model_name: model_name.to_string(),
            accuracy: ratio(matrix[0][0] + matrix[1][1], total),
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            confusion_matrix: matrix,
            per_class,
            support: total,
        })
    }

    /// Metrics for `label`.
    pub fn class(&self, label: Label) -> &ClassMetrics {
        &self.per_class[label.index()]
    }

    /// Per-class breakdown in the layout of a classification report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.model_name);
        let _ = writeln!(
            out,
            "{:<12}{:>10}{:>10}{:>10}{:>10}",
            "", "precision", "recall", "f1-score", "support"
        );
        for label in Label::ALL {
            let m = self.class(label);
            let _ = writeln!(
                out,
                "{:<12}{:>10.4}{:>10.4}{:>10.4}{:>10}",
                label.as_str(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            );
        }
        let _ = writeln!(
            out,
            "{:<12}{:>10.4}{:>10.4}{:>10.4}{:>10}",
            "weighted", self.precision, self.recall, self.f1, self.support
        );
        let _ = writeln!(out, "accuracy: {:.4}", self.accuracy);
        let _ = writeln!(out, "confusion matrix (rows true, columns predicted):");
        let _ = writeln!(out, "{:<12}{:>8}{:>8}", "", "Real", "Fake");
        for label in Label::ALL {
            let row = self.confusion_matrix[label.index()];
            let _ = writeln!(out, "{:<12}{:>8}{:>8}", label.as_str(), row[0], row[1]);
        }
        out
    }
}

/// Evaluates classifiers against a holdout set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluator {
    target_accuracy: f64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_ACCURACY)
    }
}

impl Evaluator {
    /// Create an evaluator with the given target accuracy.
    pub fn new(target_accuracy: f64) -> Self {
        Evaluator { target_accuracy }
    }

    /// The target accuracy.
    pub fn target_accuracy(&self) -> f64 {
        self.target_accuracy
    }

    /// Predict every test vector and score the predictions.
    pub fn evaluate(
        &self,
        model_name: &str,
        model: &dyn Classifier,
        features: &[FeatureVector],
        labels: &[Label],
    ) -> Result<EvaluationReport> {
        let predicted = model.predict_batch(features)?;
        let report = EvaluationReport::from_predictions(model_name, labels, &predicted)?;
        info!(
            "{}: accuracy {:.4}, precision {:.4}, recall {:.4}, f1 {:.4}",
            report.model_name, report.accuracy, report.precision, report.recall, report.f1
        );
        Ok(report)
    }

    /// Check the report against the target accuracy, warning when it falls short.
    pub fn meets_target(&self, report: &EvaluationReport) -> bool {
        meets_target(report, self.target_accuracy)
    }
}

/// Check `report` against `target_accuracy`, warning when it falls short.
pub fn meets_target(report: &EvaluationReport, target_accuracy: f64) -> bool {
    let met = report.accuracy >= target_accuracy;
    if met {
        info!(
            "{} meets the target accuracy ({:.4} >= {:.2})",
            report.model_name, report.accuracy, target_accuracy
        );
    } else {
        warn!(
            "{} accuracy {:.4} is below the target {:.2}",
            report.model_name, report.accuracy, target_accuracy
        );
    }
    met
}

/// Index of the best report: highest F1, then highest accuracy, then
/// earliest in `reports`.
pub fn best_index(reports: &[EvaluationReport]) -> Result<usize> {
    if reports.is_empty() {
        return Err(JobCheckError::data("no evaluation reports to compare"));
    }

    let mut best = 0;
    for (i, report) in reports.iter().enumerate().skip(1) {
        let current = &reports[best];
        if report.f1 > current.f1 || (report.f1 == current.f1 && report.accuracy > current.accuracy) {
            best = i;
        }
    }
    Ok(best)
}

/// The best report by [`best_index`].
pub fn compare(reports: &[EvaluationReport]) -> Result<&EvaluationReport> {
    best_index(reports).map(|i| &reports[i])
}

/// Fixed-width comparison table.
pub fn render_comparison(reports: &[EvaluationReport]) -> String {
    let width = reports
        .iter()
        .map(|r| r.model_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Model".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:>9}  {:>9}  {:>9}  {:>9}",
        "Model", "Accuracy", "Precision", "Recall", "F1"
    );
    let _ = writeln!(out, "{}", "-".repeat(width + 4 * 11));
    for r in reports {
        let _ = writeln!(
            out,
            "{:<width$}  {:>9.4}  {:>9.4}  {:>9.4}  {:>9.4}",
            r.model_name, r.accuracy, r.precision, r.recall, r.f1
        );
    }
    out
}
