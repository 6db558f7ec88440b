//! Multinomial logistic regression trained by batch gradient descent.
//!
//! Inputs are z-score standardized with statistics captured at fit time.
//! Training has no random component, so refitting identical data yields
//! identical weights.

use serde::{Deserialize, Serialize};

/// Softmax classifier over integer class labels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionClassifier {
    classes: Vec<u8>,
    /// One weight row per class, bias first.
    weights: Vec<Vec<f64>>,
    feature_means: Vec<f64>,
    feature_stds: Vec<f64>,
}

impl LogisticRegressionClassifier {
    /// Gradient descent step size.
    pub const LEARNING_RATE: f64 = 0.1;
    /// Full-batch passes over the training data.
    pub const EPOCHS: usize = 300;
    /// L2 penalty applied to non-bias weights.
    pub const REGULARIZATION: f64 = 0.01;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, features: &[Vec<f64>], labels: &[u8]) {
        let mut classes = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        self.classes = classes;
        self.weights.clear();
        self.feature_means.clear();
        self.feature_stds.clear();

        if features.is_empty() {
            return;
        }

        let n = features.len() as f64;
        let n_features = features[0].len();

        // Constant features keep std 1 so the z-score stays finite.
        let mut means = vec![0.0; n_features];
        for row in features {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in means.iter_mut() {
            *mean /= n;
        }

        let mut stds = vec![0.0; n_features];
        for row in features {
            for (j, value) in row.iter().enumerate() {
                let delta = value - means[j];
                stds[j] += delta * delta;
            }
        }
        for std in stds.iter_mut() {
            *std = (*std / n).sqrt();
            if *std == 0.0 {
                *std = 1.0;
            }
        }

        let rows: Vec<Vec<f64>> =
            features.iter().map(|row| standardize(row, &means, &stds)).collect();
        let targets: Vec<usize> = labels
            .iter()
            .map(|label| self.classes.binary_search(label).unwrap_or(0))
            .collect();

        let n_classes = self.classes.len();
        let mut weights = vec![vec![0.0; n_features + 1]; n_classes];

        for _ in 0..Self::EPOCHS {
            let mut gradients = vec![vec![0.0; n_features + 1]; n_classes];

            for (row, &target) in rows.iter().zip(&targets) {
                let proba = softmax(&logits(&weights, row));
                for (class, grad_row) in gradients.iter_mut().enumerate() {
                    let error = proba[class] - if class == target { 1.0 } else { 0.0 };
                    grad_row[0] += error;
                    for (slot, value) in grad_row[1..].iter_mut().zip(row) {
                        *slot += error * value;
                    }
                }
            }

            for (weight_row, grad_row) in weights.iter_mut().zip(&gradients) {
                for (j, (weight, grad)) in weight_row.iter_mut().zip(grad_row).enumerate() {
                    let mut step = grad / n;
                    // Bias carries no penalty.
                    if j > 0 {
                        step += Self::REGULARIZATION * *weight;
                    }
                    *weight -= Self::LEARNING_RATE * step;
                }
            }
        }

        self.weights = weights;
        self.feature_means = means;
        self.feature_stds = stds;
    }

    /// Most probable class and its probability. Probability ties resolve
    /// to the lower class label.
    pub fn predict_with_confidence(&self, row: &[f64]) -> (u8, f64) {
        if self.weights.is_empty() {
            return (0, 0.0);
        }

        let standardized = standardize(row, &self.feature_means, &self.feature_stds);
        let proba = softmax(&logits(&self.weights, &standardized));

        let mut best = 0;
        for (index, mass) in proba.iter().enumerate() {
            if *mass > proba[best] {
                best = index;
            }
        }
        match (self.classes.get(best), proba.get(best)) {
            (Some(class), Some(mass)) => (*class, *mass),
            _ => (0, 0.0),
        }
    }
}

fn standardize(row: &[f64], means: &[f64], stds: &[f64]) -> Vec<f64> {
    row.iter().enumerate().map(|(j, value)| (value - means[j]) / stds[j]).collect()
}

fn logits(weights: &[Vec<f64>], row: &[f64]) -> Vec<f64> {
    weights
        .iter()
        .map(|weight_row| {
            weight_row[0] + weight_row[1..].iter().zip(row).map(|(w, x)| w * x).sum::<f64>()
        })
        .collect()
}

/// Softmax with max subtraction to avoid overflow.
fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
