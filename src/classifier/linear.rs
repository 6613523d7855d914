//! Logistic regression trained by mini-batch gradient descent.

use std::time::Instant;

use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::classifier::model::TrainingStats;
use crate::classifier::{Classifier, ClassifierKind, Probabilities, check_dimension, check_training_set};
use crate::dataset::Label;
use crate::error::{JobCheckError, Result};
use crate::feature::FeatureVector;

/// Hyperparameters for [`LinearClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearConfig {
    /// Step size for each mini-batch update.
    pub learning_rate: f64,
    /// L2 regularization strength.
    pub l2: f64,
    /// Examples per gradient step.
    pub batch_size: usize,
    /// Maximum number of epochs.
    pub max_iter: usize,
    /// Minimum epoch loss improvement that resets the patience counter.
    pub tol: f64,
    /// Epochs without sufficient improvement before stopping.
    pub n_iter_no_change: usize,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            l2: 1e-4,
            batch_size: 64,
            max_iter: 1000,
            tol: 1e-4,
            n_iter_no_change: 5,
        }
    }
}

impl LinearConfig {
    /// Check the configuration values.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(JobCheckError::config("learning_rate must be positive"));
        }
        if !(self.l2 >= 0.0 && self.l2.is_finite()) {
            return Err(JobCheckError::config("l2 must be non-negative"));
        }
        if self.batch_size == 0 || self.max_iter == 0 || self.n_iter_no_change == 0 {
            return Err(JobCheckError::config(
                "batch_size, max_iter and n_iter_no_change must be positive",
            ));
        }
        if self.tol < 0.0 {
            return Err(JobCheckError::config("tol must be non-negative"));
        }
        Ok(())
    }
}

/// Binary logistic regression over sparse TF-IDF features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    weights: Vec<f64>,
    bias: f64,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Per-example log-loss computed from the margin, stable for large |z|.
fn log_loss(z: f64, y: f64) -> f64 {
    // ln(1 + e^z) - y*z
    let softplus = if z > 0.0 { z + (-z).exp().ln_1p() } else { z.exp().ln_1p() };
    softplus - y * z
}

impl LinearClassifier {
    /// Create a classifier from explicit parameters.
    pub fn from_parameters(weights: Vec<f64>, bias: f64) -> Self {
        LinearClassifier { weights, bias }
    }

    /// Train on `features` and `labels`.
    ///
    /// Training never fails on non-convergence: the returned stats report
    /// whether the loss settled before `max_iter` epochs.
    pub fn fit(
        config: &LinearConfig,
        features: &[FeatureVector],
        labels: &[Label],
        seed: u64,
    ) -> Result<(Self, TrainingStats)> {
        config.validate()?;
        let dimension = check_training_set(features, labels)?;
        let start = Instant::now();

        let targets: Vec<f64> = labels.iter().map(|l| l.index() as f64).collect();
        let mut model = LinearClassifier {
            weights: vec![0.0; dimension],
            bias: 0.0,
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..features.len()).collect();
        let mut gradient = vec![0.0; dimension];
        let mut touched: Vec<usize> = Vec::new();

        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0;
        let mut converged = false;
        let mut epochs = 0;
        let mut loss = f64::INFINITY;

        for _ in 0..config.max_iter {
            epochs += 1;
            order.shuffle(&mut rng);

            for batch in order.chunks(config.batch_size) {
                let scale = config.learning_rate / batch.len() as f64;
                let mut bias_gradient = 0.0;

                for &i in batch {
                    let error = sigmoid(model.margin(&features[i])) - targets[i];
                    bias_gradient += error;
                    for (j, value) in features[i].iter() {
                        if gradient[j] == 0.0 {
                            touched.push(j);
                        }
                        gradient[j] += error * value;
                    }
                }

                if config.l2 > 0.0 {
                    let decay = 1.0 - config.learning_rate * config.l2;
                    model.weights.iter_mut().for_each(|w| *w *= decay);
                }
                for &j in &touched {
                    model.weights[j] -= scale * gradient[j];
                    gradient[j] = 0.0;
                }
                touched.clear();
                model.bias -= scale * bias_gradient;
            }

            loss = model.objective(features, &targets, config.l2);
            if !loss.is_finite() {
                return Err(JobCheckError::inference(format!(
                    "logistic regression diverged at epoch {epochs}"
                )));
            }

            if loss > best_loss - config.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            best_loss = best_loss.min(loss);

            if no_improvement >= config.n_iter_no_change {
                converged = true;
                break;
            }
        }

        debug!(
            "Logistic regression: {} epochs, loss {:.6}, converged: {}",
            epochs, loss, converged
        );

        let stats = TrainingStats {
            iterations: epochs,
            converged,
            final_loss: Some(loss),
            training_time_ms: start.elapsed().as_millis() as u64,
        };
        Ok((model, stats))
    }

    fn margin(&self, features: &FeatureVector) -> f64 {
        features.dot(&self.weights) + self.bias
    }

    /// Mean log-loss plus the L2 penalty.
    fn objective(&self, features: &[FeatureVector], targets: &[f64], l2: f64) -> f64 {
        let data_loss: f64 = features
            .iter()
            .zip(targets)
            .map(|(x, &y)| log_loss(self.margin(x), y))
            .sum::<f64>()
            / features.len() as f64;
        let penalty = 0.5 * l2 * self.weights.iter().map(|w| w * w).sum::<f64>();
        data_loss + penalty
    }

    /// Learned weights, one per vocabulary term.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Learned intercept.
    pub fn bias(&self) -> f64 {
        self.bias
    }
}

impl Classifier for LinearClassifier {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Probabilities> {
        check_dimension(self.weights.len(), features)?;
        let p_fake = sigmoid(self.margin(features));
        if !p_fake.is_finite() {
            return Err(JobCheckError::inference("non-finite probability"));
        }
        Ok([1.0 - p_fake, p_fake])
    }

    fn dimension(&self) -> usize {
        self.weights.len()
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Linear
    }
}
