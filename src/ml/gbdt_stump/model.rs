use serde::{Deserialize, Serialize};

/// One-split weak learner: `left_value` when the feature is at or below the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stump {
    pub feature_index: u32,
    pub threshold: f32,
    pub left_value: f32,
    pub right_value: f32,
}

impl Stump {
    /// Missing features read as 0.
    pub fn predict(&self, features: &[f32]) -> f32 {
        let value = features
            .get(self.feature_index as usize)
            .copied()
            .unwrap_or(0.0);
        if value <= self.threshold {
            self.left_value
        } else {
            self.right_value
        }
    }
}

/// Boosted stump ensemble producing one logit per class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtStumpModel {
    pub feature_len: usize,
    pub n_classes: usize,
    pub learning_rate: f32,
    /// Starting logits (log class priors).
    pub init_raw: Vec<f32>,
    /// `stumps[round][class]`.
    pub stumps: Vec<Vec<Stump>>,
}

impl GbdtStumpModel {
    pub fn validate(&self) -> Result<(), String> {
        if self.n_classes < 2 {
            return Err(format!("Model needs at least 2 classes, has {}", self.n_classes));
        }
        if self.init_raw.len() != self.n_classes {
            return Err(format!(
                "Expected {} initial logits, found {}",
                self.n_classes,
                self.init_raw.len()
            ));
        }
        for (round_idx, round) in self.stumps.iter().enumerate() {
            if round.len() != self.n_classes {
                return Err(format!(
                    "Round {round_idx} has {} stumps for {} classes",
                    round.len(),
                    self.n_classes
                ));
            }
            if let Some(stump) = round
                .iter()
                .find(|stump| stump.feature_index as usize >= self.feature_len)
            {
                return Err(format!(
                    "Round {round_idx} splits on feature {} beyond width {}",
                    stump.feature_index, self.feature_len
                ));
            }
        }
        Ok(())
    }

    /// Per-class logits after every boosting round.
    pub fn predict_raw(&self, features: &[f32]) -> Vec<f32> {
        self.stumps
            .iter()
            .fold(self.init_raw.clone(), |mut logits, round| {
                for (logit, stump) in logits.iter_mut().zip(round) {
                    *logit += self.learning_rate * stump.predict(features);
                }
                logits
            })
    }

    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        softmax(&self.predict_raw(features))
    }

    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        argmax(&self.predict_raw(features))
    }
}

/// Softmax shifted by the max logit; degenerate input yields a uniform distribution.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let Some(max) = logits.iter().copied().reduce(f32::max) else {
        return Vec::new();
    };
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    if total > 0.0 && total.is_finite() {
        exps.into_iter().map(|e| e / total).collect()
    } else {
        vec![1.0 / logits.len() as f32; logits.len()]
    }
}

/// Index of the largest value. Ties go to the lowest index, so an
/// undecided binary model predicts class 0.
pub fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best_idx, best), (idx, &v)| {
            if v > best { (idx, v) } else { (best_idx, best) }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_on_first(left: f32, right: f32) -> Stump {
        Stump {
            feature_index: 0,
            threshold: 0.5,
            left_value: left,
            right_value: right,
        }
    }

    #[test]
    fn stump_threshold_is_inclusive_on_the_left() {
        let stump = split_on_first(-1.0, 2.0);
        assert_eq!(stump.predict(&[0.5]), -1.0);
        assert_eq!(stump.predict(&[0.51]), 2.0);
        assert_eq!(stump.predict(&[]), -1.0);
    }

    #[test]
    fn rounds_accumulate_scaled_stump_outputs() {
        let model = GbdtStumpModel {
            feature_len: 1,
            n_classes: 2,
            learning_rate: 0.5,
            init_raw: vec![0.0, 0.0],
            stumps: vec![
                vec![split_on_first(1.0, -1.0), split_on_first(-1.0, 1.0)],
                vec![split_on_first(1.0, -1.0), split_on_first(-1.0, 1.0)],
            ],
        };
        model.validate().unwrap();
        assert_eq!(model.predict_raw(&[0.9]), vec![-1.0, 1.0]);
        assert_eq!(model.predict_class_index(&[0.1]), 0);
        assert_eq!(model.predict_class_index(&[0.9]), 1);
    }

    #[test]
    fn validate_rejects_out_of_range_feature() {
        let model = GbdtStumpModel {
            feature_len: 1,
            n_classes: 2,
            learning_rate: 0.1,
            init_raw: vec![0.0, 0.0],
            stumps: vec![vec![
                split_on_first(0.0, 0.0),
                Stump {
                    feature_index: 3,
                    ..split_on_first(0.0, 0.0)
                },
            ]],
        };
        assert!(model.validate().unwrap_err().contains("feature 3"));
    }

    #[test]
    fn softmax_and_argmax_agree() {
        let probs = softmax(&[1.0, 3.0]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert_eq!(argmax(&probs), 1);
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert!(softmax(&[]).is_empty());
    }
}
