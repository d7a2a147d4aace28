use serde::{Deserialize, Serialize};

use super::model::{GbdtStumpModel, Stump, softmax};
use crate::ml::TrainDataset;

/// Training hyperparameters for stump boosting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbdtOptions {
    /// Number of boosting rounds.
    pub rounds: usize,
    /// Shrinkage applied to every stump output.
    pub learning_rate: f32,
    /// Histogram bins per feature for split search, clamped to `2..=256`.
    pub bins: usize,
}

impl Default for GbdtOptions {
    fn default() -> Self {
        Self {
            rounds: 100,
            learning_rate: 0.1,
            bins: 32,
        }
    }
}

/// Fit one stump per class per round on the softmax residuals.
///
/// Logits start at the log class priors, so a model with zero rounds
/// predicts the majority class.
pub fn train_gbdt_stump(
    dataset: &TrainDataset,
    options: &GbdtOptions,
) -> Result<GbdtStumpModel, String> {
    dataset.validate()?;
    let n_classes = dataset.n_classes;
    let matrix = BinnedMatrix::build(&dataset.x, dataset.feature_len, options.bins);

    let init_raw = log_priors(&dataset.y, n_classes);
    let mut logits = vec![init_raw.clone(); dataset.x.len()];
    let mut stumps = Vec::with_capacity(options.rounds);
    for _ in 0..options.rounds {
        let probs: Vec<Vec<f32>> = logits.iter().map(|row| softmax(row)).collect();
        let round: Vec<Stump> = (0..n_classes)
            .map(|class_idx| {
                let residuals: Vec<f32> = dataset
                    .y
                    .iter()
                    .zip(&probs)
                    .map(|(&label, p)| f32::from(u8::from(label == class_idx)) - p[class_idx])
                    .collect();
                fit_stump(&matrix, &dataset.x, &residuals)
            })
            .collect();
        for (row, features) in logits.iter_mut().zip(&dataset.x) {
            for (logit, stump) in row.iter_mut().zip(&round) {
                *logit += options.learning_rate * stump.predict(features);
            }
        }
        stumps.push(round);
    }

    let model = GbdtStumpModel {
        feature_len: dataset.feature_len,
        n_classes,
        learning_rate: options.learning_rate,
        init_raw,
        stumps,
    };
    model.validate()?;
    Ok(model)
}

fn log_priors(y: &[usize], n_classes: usize) -> Vec<f32> {
    let mut counts = vec![0usize; n_classes];
    for &label in y {
        if let Some(count) = counts.get_mut(label) {
            *count += 1;
        }
    }
    let total = y.len().max(1) as f32;
    counts
        .into_iter()
        .map(|count| (count as f32 / total).max(1e-6).ln())
        .collect()
}

/// Features quantized into equal-width bins over their observed range.
struct BinnedMatrix {
    bins: usize,
    /// `(min, max)` per feature; constant features get a unit-width range.
    ranges: Vec<(f32, f32)>,
    /// Column-major bin indices.
    columns: Vec<Vec<u8>>,
}

impl BinnedMatrix {
    fn build(x: &[Vec<f32>], feature_len: usize, bins: usize) -> Self {
        let bins = bins.clamp(2, 256);
        let ranges: Vec<(f32, f32)> = (0..feature_len)
            .map(|j| {
                let (min, max) = x
                    .iter()
                    .filter_map(|row| row.get(j).copied().filter(|v| v.is_finite()))
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    });
                if !min.is_finite() {
                    (0.0, 1.0)
                } else if min == max {
                    (min, min + 1.0)
                } else {
                    (min, max)
                }
            })
            .collect();
        let scale = (bins - 1) as f32;
        let columns = ranges
            .iter()
            .enumerate()
            .map(|(j, &(min, max))| {
                x.iter()
                    .map(|row| {
                        let v = row.get(j).copied().unwrap_or(0.0);
                        let t = ((v - min) / (max - min)).clamp(0.0, 1.0);
                        (t * scale).round() as u8
                    })
                    .collect()
            })
            .collect();
        Self {
            bins,
            ranges,
            columns,
        }
    }

    /// Upper edge of `split_bin` in feature units.
    fn threshold(&self, feature_idx: usize, split_bin: usize) -> f32 {
        let (min, max) = self.ranges[feature_idx];
        min + ((split_bin + 1) as f32 / self.bins as f32) * (max - min)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BinStats {
    count: u32,
    sum: f64,
    sum_sq: f64,
}

impl BinStats {
    fn push(&mut self, r: f64) {
        self.count += 1;
        self.sum += r;
        self.sum_sq += r * r;
    }

    fn merged(self, other: BinStats) -> BinStats {
        BinStats {
            count: self.count + other.count,
            sum: self.sum + other.sum,
            sum_sq: self.sum_sq + other.sum_sq,
        }
    }

    fn minus(self, other: BinStats) -> BinStats {
        BinStats {
            count: self.count - other.count,
            sum: self.sum - other.sum,
            sum_sq: self.sum_sq - other.sum_sq,
        }
    }

    /// Squared error around the mean.
    fn sse(self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_sq - self.sum * self.sum / self.count as f64
        }
    }
}

/// Lowest-SSE `(score, split_bin)` for one feature column.
fn best_bin_split(column: &[u8], residuals: &[f32], bins: usize) -> Option<(f64, usize)> {
    let mut histogram = vec![BinStats::default(); bins];
    for (&b, &r) in column.iter().zip(residuals) {
        histogram[b as usize].push(r as f64);
    }
    let total = histogram
        .iter()
        .fold(BinStats::default(), |acc, stats| acc.merged(*stats));

    let mut left = BinStats::default();
    let mut best: Option<(f64, usize)> = None;
    for (split_bin, stats) in histogram.iter().enumerate().take(bins - 1) {
        left = left.merged(*stats);
        let right = total.minus(left);
        if left.count == 0 || right.count == 0 {
            continue;
        }
        let score = left.sse() + right.sse();
        if best.is_none_or(|(current, _)| score < current) {
            best = Some((score, split_bin));
        }
    }
    best
}

fn fit_stump(matrix: &BinnedMatrix, x: &[Vec<f32>], residuals: &[f32]) -> Stump {
    let mut best: Option<(f64, usize, usize)> = None;
    for (feature_idx, column) in matrix.columns.iter().enumerate() {
        if let Some((score, split_bin)) = best_bin_split(column, residuals, matrix.bins)
            && best.is_none_or(|(current, _, _)| score < current)
        {
            best = Some((score, feature_idx, split_bin));
        }
    }
    let (feature_idx, split_bin) = best.map_or((0, 0), |(_, f, b)| (f, b));
    let threshold = matrix.threshold(feature_idx, split_bin);

    let mut left = BinStats::default();
    let mut right = BinStats::default();
    for (row, &r) in x.iter().zip(residuals) {
        let value = row.get(feature_idx).copied().unwrap_or(0.0);
        if value <= threshold {
            left.push(r as f64);
        } else {
            right.push(r as f64);
        }
    }
    Stump {
        feature_index: feature_idx as u32,
        threshold,
        left_value: mean(left),
        right_value: mean(right),
    }
}

fn mean(stats: BinStats) -> f32 {
    if stats.count == 0 {
        0.0
    } else {
        (stats.sum / stats.count as f64) as f32
    }
}
