//! Logistic regression classifier over encoded result features.

use serde::{Deserialize, Serialize};

use crate::ml::gbdt_stump::{argmax, softmax};

mod train;
pub use train::{LogRegOptions, train_logreg};

/// Softmax logistic regression model with per-feature standardization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRegModel {
    pub feature_len: usize,
    pub n_classes: usize,
    /// Row-major `[n_classes][feature_len]`.
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
    pub feature_mean: Vec<f32>,
    pub feature_std: Vec<f32>,
}

impl LogRegModel {
    /// Validate the model dimensions.
    pub fn validate(&self) -> Result<(), String> {
        if self.n_classes == 0 {
            return Err("No classes defined".to_string());
        }
        if self.weights.len() != self.n_classes * self.feature_len {
            return Err("weights length mismatch".to_string());
        }
        if self.bias.len() != self.n_classes {
            return Err("bias length mismatch".to_string());
        }
        if self.feature_mean.len() != self.feature_len || self.feature_std.len() != self.feature_len
        {
            return Err("standardization length mismatch".to_string());
        }
        Ok(())
    }

    /// Compute class probabilities for a single feature vector.
    ///
    /// Missing trailing features are treated as zero.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        let x = self.standardize(features);
        let mut logits = vec![0.0f32; self.n_classes];
        for (c, logit) in logits.iter_mut().enumerate() {
            let base = c * self.feature_len;
            let mut sum = self.bias[c];
            for (i, value) in x.iter().enumerate() {
                sum += self.weights[base + i] * value;
            }
            *logit = sum;
        }
        softmax(&logits)
    }

    /// Return the argmax class index for the given feature vector.
    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        argmax(&self.predict_proba(features))
    }

    pub(crate) fn standardize(&self, features: &[f32]) -> Vec<f32> {
        (0..self.feature_len)
            .map(|i| {
                let value = features.get(i).copied().unwrap_or(0.0);
                (value - self.feature_mean[i]) / self.feature_std[i]
            })
            .collect()
    }
}
