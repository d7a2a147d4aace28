use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use super::LogRegModel;
use crate::ml::TrainDataset;
use crate::ml::gbdt_stump::softmax;

/// Training options for the logistic regression head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogRegOptions {
    pub epochs: usize,
    pub learning_rate: f32,
    pub l2: f32,
    pub batch_size: usize,
    pub seed: u64,
    pub balance_classes: bool,
}

impl Default for LogRegOptions {
    fn default() -> Self {
        Self {
            epochs: 200,
            learning_rate: 0.1,
            l2: 1e-4,
            batch_size: 16,
            seed: 42,
            balance_classes: true,
        }
    }
}

pub fn train_logreg(
    dataset: &TrainDataset,
    options: &LogRegOptions,
) -> Result<LogRegModel, String> {
    dataset.validate()?;
    let classes = dataset.n_classes;
    let dim = dataset.feature_len;
    let (feature_mean, feature_std) = standardization(&dataset.x, dim);

    let mut model = LogRegModel {
        feature_len: dim,
        n_classes: classes,
        weights: vec![0.0f32; classes * dim],
        bias: vec![0.0f32; classes],
        feature_mean,
        feature_std,
    };
    let xs: Vec<Vec<f32>> = dataset.x.iter().map(|row| model.standardize(row)).collect();

    let mut rng = StdRng::seed_from_u64(options.seed);
    for w in &mut model.weights {
        *w = (rng.random::<f32>() - 0.5) * 0.01;
    }

    let mut indices: Vec<usize> = (0..xs.len()).collect();
    let batch_size = options.batch_size.max(1);
    let lr = options.learning_rate;
    let l2 = options.l2.max(0.0);

    let class_weights = if options.balance_classes {
        let mut counts = vec![0f32; classes];
        for &y in &dataset.y {
            if y < classes {
                counts[y] += 1.0;
            }
        }
        let total: f32 = counts.iter().sum();
        counts
            .into_iter()
            .map(|count| {
                if count == 0.0 {
                    0.0
                } else {
                    total / (classes as f32 * count)
                }
            })
            .collect()
    } else {
        vec![1.0; classes]
    };

    for _epoch in 0..options.epochs {
        indices.shuffle(&mut rng);
        for chunk in indices.chunks(batch_size) {
            let mut grad_w = vec![0.0f32; model.weights.len()];
            let mut grad_b = vec![0.0f32; model.bias.len()];
            let mut batch_weight = 0.0f32;
            for &idx in chunk {
                let x = &xs[idx];
                let y = dataset.y[idx];
                let weight = class_weights[y];
                if weight == 0.0 {
                    continue;
                }
                let mut logits = vec![0.0f32; classes];
                for (c, logit) in logits.iter_mut().enumerate() {
                    let base = c * dim;
                    let mut sum = model.bias[c];
                    for i in 0..dim {
                        sum += model.weights[base + i] * x[i];
                    }
                    *logit = sum;
                }
                let probs = softmax(&logits);
                for c in 0..classes {
                    let diff = probs[c] - if c == y { 1.0 } else { 0.0 };
                    let base = c * dim;
                    for i in 0..dim {
                        grad_w[base + i] += diff * x[i] * weight;
                    }
                    grad_b[c] += diff * weight;
                }
                batch_weight += weight;
            }
            if batch_weight == 0.0 {
                continue;
            }
            let inv = 1.0 / batch_weight;
            for c in 0..classes {
                let base = c * dim;
                for i in 0..dim {
                    let idx = base + i;
                    let l2_term = l2 * model.weights[idx];
                    model.weights[idx] -= lr * (grad_w[idx] * inv + l2_term);
                }
                model.bias[c] -= lr * grad_b[c] * inv;
            }
        }
    }

    model.validate()?;
    Ok(model)
}

/// Per-feature mean and standard deviation; constant features get `std = 1`.
fn standardization(x: &[Vec<f32>], dim: usize) -> (Vec<f32>, Vec<f32>) {
    let n = x.len().max(1) as f32;
    let mut mean = vec![0.0f32; dim];
    for row in x {
        for (i, &v) in row.iter().take(dim).enumerate() {
            mean[i] += v;
        }
    }
    for m in &mut mean {
        *m /= n;
    }
    let mut var = vec![0.0f32; dim];
    for row in x {
        for (i, &v) in row.iter().take(dim).enumerate() {
            let d = v - mean[i];
            var[i] += d * d;
        }
    }
    let std = var
        .into_iter()
        .map(|v| {
            let s = (v / n).sqrt();
            if s > 1e-6 { s } else { 1.0 }
        })
        .collect();
    (mean, std)
}
