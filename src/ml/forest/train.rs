use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{DecisionTree, ForestModel, TreeNode};
use crate::ml::TrainDataset;

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestOptions {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Maximum depth of each tree (root has depth 0).
    pub max_depth: usize,
    /// Nodes with fewer rows than this become leaves.
    pub min_samples_split: usize,
    /// Features tried per split; `0` means `round(sqrt(d))`.
    pub max_features: usize,
    /// Seed for bootstrap sampling and feature subsets.
    pub seed: u64,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: 8,
            min_samples_split: 2,
            max_features: 0,
            seed: 42,
        }
    }
}

/// Train a random forest with Gini-impurity splits.
pub fn train_forest(
    dataset: &TrainDataset,
    options: &ForestOptions,
) -> Result<ForestModel, String> {
    dataset.validate()?;
    let n = dataset.x.len();
    let d = dataset.feature_len;
    let max_features = if options.max_features == 0 {
        ((d as f64).sqrt().round() as usize).max(1)
    } else {
        options.max_features.min(d)
    };

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut trees = Vec::with_capacity(options.n_trees.max(1));
    for _ in 0..options.n_trees.max(1) {
        let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
        let mut grower = TreeGrower {
            dataset,
            options,
            max_features,
            rng: &mut rng,
            nodes: Vec::new(),
        };
        grower.grow(bootstrap, 0);
        trees.push(DecisionTree {
            nodes: grower.nodes,
        });
    }

    let model = ForestModel {
        feature_len: d,
        n_classes: dataset.n_classes,
        trees,
    };
    model.validate()?;
    Ok(model)
}

struct TreeGrower<'a> {
    dataset: &'a TrainDataset,
    options: &'a ForestOptions,
    max_features: usize,
    rng: &'a mut StdRng,
    nodes: Vec<TreeNode>,
}

struct SplitChoice {
    feature_index: usize,
    threshold: f32,
    impurity: f64,
}

impl TreeGrower<'_> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> u32 {
        let node_idx = self.nodes.len();
        let counts = self.class_counts(&indices);
        self.nodes.push(TreeNode::Leaf {
            proba: to_proba(&counts),
        });

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if pure || depth >= self.options.max_depth || indices.len() < self.options.min_samples_split
        {
            return node_idx as u32;
        }
        let parent_impurity = gini(&counts);
        let Some(choice) = self.best_split(&indices) else {
            return node_idx as u32;
        };
        if choice.impurity >= parent_impurity - 1e-9 {
            return node_idx as u32;
        }

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.dataset.x[i][choice.feature_index] <= choice.threshold);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[node_idx] = TreeNode::Split {
            feature_index: choice.feature_index as u32,
            threshold: choice.threshold,
            left,
            right,
        };
        node_idx as u32
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.dataset.n_classes];
        for &i in indices {
            counts[self.dataset.y[i]] += 1;
        }
        counts
    }

    fn best_split(&mut self, indices: &[usize]) -> Option<SplitChoice> {
        let d = self.dataset.feature_len;
        let features = rand::seq::index::sample(&mut *self.rng, d, self.max_features);
        let mut best: Option<SplitChoice> = None;
        for feature_index in features.iter() {
            if let Some(choice) = self.best_split_for_feature(indices, feature_index)
                && best
                    .as_ref()
                    .is_none_or(|current| choice.impurity < current.impurity)
            {
                best = Some(choice);
            }
        }
        best
    }

    /// Scan sorted values of one feature, scoring each midpoint threshold by
    /// the weighted Gini impurity of the two children.
    fn best_split_for_feature(&self, indices: &[usize], feature_index: usize) -> Option<SplitChoice> {
        let n_classes = self.dataset.n_classes;
        let mut rows: Vec<(OrderedFloat<f32>, usize)> = indices
            .iter()
            .map(|&i| (OrderedFloat(self.dataset.x[i][feature_index]), self.dataset.y[i]))
            .collect();
        rows.sort_unstable();

        let total = rows.len();
        let mut right = vec![0usize; n_classes];
        for &(_, y) in &rows {
            right[y] += 1;
        }
        let mut left = vec![0usize; n_classes];
        let mut best: Option<SplitChoice> = None;
        for pos in 0..total.saturating_sub(1) {
            let (value, y) = rows[pos];
            left[y] += 1;
            right[y] -= 1;
            let next = rows[pos + 1].0;
            if value == next {
                continue;
            }
            let n_left = (pos + 1) as f64;
            let n_right = (total - pos - 1) as f64;
            let impurity = (n_left * gini(&left) + n_right * gini(&right)) / total as f64;
            if best.as_ref().is_none_or(|current| impurity < current.impurity) {
                best = Some(SplitChoice {
                    feature_index,
                    threshold: (value.0 + next.0) / 2.0,
                    impurity,
                });
            }
        }
        best
    }
}

fn gini(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn to_proba(counts: &[usize]) -> Vec<f32> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![1.0 / counts.len().max(1) as f32; counts.len()];
    }
    counts
        .iter()
        .map(|&c| c as f32 / total as f32)
        .collect()
}
