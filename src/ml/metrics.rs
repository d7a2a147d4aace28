//! Evaluation metrics for the relevance classifier.

use serde::{Deserialize, Serialize};

use super::Algorithm;
use crate::dataset::Label;

#[derive(Debug, Clone)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&v| v as u64).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`, or 0 when nothing was predicted for the class.
    pub precision: f32,
    /// `TP / (TP + FN)`, or 0 when the class never occurs.
    pub recall: f32,
    /// Harmonic mean of precision and recall, or 0 when both are 0.
    pub f1: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f32;
        let mut fp = 0f32;
        let mut fn_ = 0f32;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f32;
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += cm.get(i, class_idx) as f32;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        stats.push(PerClassStats {
            precision,
            recall,
            f1: f1_score(precision, recall),
            support,
        });
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let mut correct = 0u64;
    for class_idx in 0..cm.n_classes {
        correct += cm.get(class_idx, class_idx) as u64;
    }
    let total = cm.total();
    if total == 0 {
        0.0
    } else {
        (correct as f32) / (total as f32)
    }
}

fn f1_score(precision: f32, recall: f32) -> f32 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Scores from one retrain, measured on the held-out partition.
///
/// Precision, recall and F1 are reported for [`Label::Relevant`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    /// 1-based labeling round; 0 until the snapshot is recorded in a history.
    #[serde(default)]
    pub round: usize,
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub algorithm: Algorithm,
    pub train_size: usize,
    pub test_size: usize,
}

impl ScoreSnapshot {
    /// All-zero snapshot reported when a retrain could not run.
    pub fn degenerate(algorithm: Algorithm) -> Self {
        Self {
            round: 0,
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
            algorithm,
            train_size: 0,
            test_size: 0,
        }
    }

    /// Build a snapshot from a binary confusion matrix.
    pub fn from_confusion(
        cm: &ConfusionMatrix,
        algorithm: Algorithm,
        train_size: usize,
    ) -> Self {
        let per_class = precision_recall_by_class(cm);
        let positive = per_class
            .get(Label::Relevant.index())
            .copied()
            .unwrap_or(PerClassStats {
                precision: 0.0,
                recall: 0.0,
                f1: 0.0,
                support: 0,
            });
        Self {
            round: 0,
            accuracy: accuracy(cm),
            precision: positive.precision,
            recall: positive.recall,
            f1: positive.f1,
            algorithm,
            train_size,
            test_size: cm.total() as usize,
        }
    }
}
