//! Relevance classifiers and the manager that retrains them.
//!
//! Every classifier variant trains on the same in-memory [`TrainDataset`] and
//! predicts a class index per feature vector. [`ClassifierManager`] owns the
//! active classifier, splits the labeled dataset, fits, and scores.

mod classifier;
pub mod forest;
pub mod gbdt_stump;
pub mod logreg;
mod manager;
pub mod metrics;

pub use classifier::{Algorithm, Classifier, TrainOptions};
pub use manager::{ClassifierManager, RetrainOutcome, TrainedClassifier};
pub use metrics::ScoreSnapshot;

/// In-memory dataset used for training and evaluation.
#[derive(Debug, Clone, Default)]
pub struct TrainDataset {
    /// Number of `f32` values in each feature vector.
    pub feature_len: usize,
    /// Number of classes; labels in `y` are `0..n_classes`.
    pub n_classes: usize,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Class indices aligned with `x`.
    pub y: Vec<usize>,
}

impl TrainDataset {
    pub fn validate(&self) -> Result<(), String> {
        if self.x.len() != self.y.len() {
            return Err("Mismatched X/Y lengths".to_string());
        }
        if self.x.is_empty() {
            return Err("Empty dataset".to_string());
        }
        if self.n_classes < 2 {
            return Err("Need at least 2 classes".to_string());
        }
        if self.feature_len == 0 {
            return Err("Feature vectors are empty".to_string());
        }
        // Split nodes store feature indices as u32.
        if u32::try_from(self.feature_len).is_err() {
            return Err(format!("Feature width {} is too large", self.feature_len));
        }
        if self.x.iter().any(|row| row.len() != self.feature_len) {
            return Err("Inconsistent feature row length".to_string());
        }
        if self.y.iter().any(|&label| label >= self.n_classes) {
            return Err("Label index out of range".to_string());
        }
        Ok(())
    }
}
