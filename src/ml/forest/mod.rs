//! Bagged decision-tree ensemble (random forest).
//!
//! Each tree is grown on a bootstrap resample with a random feature subset
//! per split. Predictions average the leaf class distributions of all trees.

mod train;

pub use train::{ForestOptions, train_forest};

use serde::{Deserialize, Serialize};

use crate::ml::gbdt_stump::argmax;

/// One node of a flattened decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Terminal node holding class probabilities.
    Leaf { proba: Vec<f32> },
    /// Internal node routing `feature <= threshold` to `left`.
    Split {
        feature_index: u32,
        threshold: f32,
        left: u32,
        right: u32,
    },
}

/// Decision tree stored as a node arena; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walk the tree and return the leaf distribution for `features`.
    pub fn predict_proba(&self, features: &[f32]) -> &[f32] {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { proba } => return proba,
                TreeNode::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature_index as usize).copied().unwrap_or(0.0);
                    idx = if value <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left as usize).max(walk(nodes, *right as usize))
                }
            }
        }
        walk(&self.nodes, 0)
    }

    fn validate(&self, feature_len: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { proba } if proba.len() != n_classes => {
                    return Err(format!("Leaf {idx} has {} classes", proba.len()));
                }
                TreeNode::Split {
                    feature_index,
                    left,
                    right,
                    ..
                } => {
                    if *feature_index as usize >= feature_len {
                        return Err(format!("Node {idx} splits beyond width {feature_len}"));
                    }
                    // Children are always pushed after their parent, which rules out cycles.
                    if *left as usize <= idx
                        || *right as usize <= idx
                        || *left as usize >= self.nodes.len()
                        || *right as usize >= self.nodes.len()
                    {
                        return Err(format!("Node {idx} has invalid children"));
                    }
                }
                TreeNode::Leaf { .. } => {}
            }
        }
        Ok(())
    }
}

/// Random forest classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub feature_len: usize,
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    pub fn validate(&self) -> Result<(), String> {
        if self.n_classes < 2 {
            return Err("Model must contain at least 2 classes".to_string());
        }
        if self.trees.is_empty() {
            return Err("Forest has no trees".to_string());
        }
        for tree in &self.trees {
            tree.validate(self.feature_len, self.n_classes)?;
        }
        Ok(())
    }

    /// Average class probabilities over all trees.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0f32; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in out.iter_mut().zip(tree.predict_proba(features)) {
                *acc += p;
            }
        }
        let n = self.trees.len().max(1) as f32;
        for v in &mut out {
            *v /= n;
        }
        out
    }

    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        argmax(&self.predict_proba(features))
    }
}
