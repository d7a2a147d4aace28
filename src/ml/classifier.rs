use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::TrainDataset;
use super::forest::{ForestModel, ForestOptions, train_forest};
use super::gbdt_stump::{GbdtOptions, GbdtStumpModel, train_gbdt_stump};
use super::logreg::{LogRegModel, LogRegOptions, train_logreg};
use crate::error::InvalidInputError;

/// Closed set of classifier algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    RandomForest,
    GbdtStump,
    LogReg,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [
        Algorithm::RandomForest,
        Algorithm::GbdtStump,
        Algorithm::LogReg,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Algorithm::RandomForest => "random_forest",
            Algorithm::GbdtStump => "gbdt_stump",
            Algorithm::LogReg => "logreg",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Algorithm {
    type Err = InvalidInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Algorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.tag() == wanted)
            .ok_or_else(|| InvalidInputError::UnknownAlgorithm(s.to_string()))
    }
}

/// Hyperparameters for every variant, so switching algorithms keeps settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    pub forest: ForestOptions,
    pub gbdt: GbdtOptions,
    pub logreg: LogRegOptions,
}

/// A trained model of one of the supported algorithms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Classifier {
    RandomForest(ForestModel),
    GbdtStump(GbdtStumpModel),
    LogReg(LogRegModel),
}

impl Classifier {
    /// Fit `algorithm` on `dataset`.
    pub fn fit(
        algorithm: Algorithm,
        dataset: &TrainDataset,
        options: &TrainOptions,
    ) -> Result<Self, String> {
        match algorithm {
            Algorithm::RandomForest => train_forest(dataset, &options.forest).map(Self::RandomForest),
            Algorithm::GbdtStump => train_gbdt_stump(dataset, &options.gbdt).map(Self::GbdtStump),
            Algorithm::LogReg => train_logreg(dataset, &options.logreg).map(Self::LogReg),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Classifier::RandomForest(_) => Algorithm::RandomForest,
            Classifier::GbdtStump(_) => Algorithm::GbdtStump,
            Classifier::LogReg(_) => Algorithm::LogReg,
        }
    }

    /// Width of the feature vectors the model was trained on.
    pub fn feature_len(&self) -> usize {
        match self {
            Classifier::RandomForest(model) => model.feature_len,
            Classifier::GbdtStump(model) => model.feature_len,
            Classifier::LogReg(model) => model.feature_len,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Classifier::RandomForest(model) => model.validate(),
            Classifier::GbdtStump(model) => model.validate(),
            Classifier::LogReg(model) => model.validate(),
        }
    }

    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        match self {
            Classifier::RandomForest(model) => model.predict_proba(features),
            Classifier::GbdtStump(model) => model.predict_proba(features),
            Classifier::LogReg(model) => model.predict_proba(features),
        }
    }

    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        match self {
            Classifier::RandomForest(model) => model.predict_class_index(features),
            Classifier::GbdtStump(model) => model.predict_class_index(features),
            Classifier::LogReg(model) => model.predict_class_index(features),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_tags_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.tag().parse::<Algorithm>().unwrap(), algorithm);
        }
        assert_eq!("Random-Forest".parse::<Algorithm>().unwrap(), Algorithm::RandomForest);
    }

    #[test]
    fn unknown_algorithm_is_invalid_input() {
        let err = "ML Models".parse::<Algorithm>().unwrap_err();
        assert_eq!(err, InvalidInputError::UnknownAlgorithm("ML Models".to_string()));
    }

    #[test]
    fn every_variant_fits_and_reports_width() {
        let dataset = TrainDataset {
            feature_len: 3,
            n_classes: 2,
            x: vec![
                vec![0.0, 0.0, 1.0],
                vec![0.1, 1.0, 0.0],
                vec![0.9, 0.0, 1.0],
                vec![1.0, 1.0, 0.0],
            ],
            y: vec![0, 0, 1, 1],
        };
        for algorithm in Algorithm::ALL {
            let model = Classifier::fit(algorithm, &dataset, &TrainOptions::default()).unwrap();
            assert_eq!(model.algorithm(), algorithm);
            assert_eq!(model.feature_len(), 3);
            model.validate().unwrap();
            let proba = model.predict_proba(&[0.5, 0.5, 0.5]);
            assert_eq!(proba.len(), 2);
            assert!(model.predict_class_index(&[0.5, 0.5, 0.5]) < 2);
        }
    }
}
