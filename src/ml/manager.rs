use tracing::{debug, info, warn};

use super::metrics::{ConfusionMatrix, ScoreSnapshot};
use super::{Algorithm, Classifier, TrainDataset};
use crate::config::TrainingSettings;
use crate::dataset::{DatasetStore, Example, Label, stratified_split};
use crate::error::{InsufficientDataError, ModelNotTrainedError};
use crate::features::{FeatureEncoder, FeatureVector};

/// Result of a retrain request.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrainOutcome {
    /// A new classifier replaced the active one.
    Trained(ScoreSnapshot),
    /// The dataset could not support a fit; the previous classifier, if any, stays active.
    Skipped {
        reason: InsufficientDataError,
        snapshot: ScoreSnapshot,
    },
}

impl RetrainOutcome {
    pub fn snapshot(&self) -> &ScoreSnapshot {
        match self {
            RetrainOutcome::Trained(snapshot) => snapshot,
            RetrainOutcome::Skipped { snapshot, .. } => snapshot,
        }
    }

    pub(crate) fn snapshot_mut(&mut self) -> &mut ScoreSnapshot {
        match self {
            RetrainOutcome::Trained(snapshot) => snapshot,
            RetrainOutcome::Skipped { snapshot, .. } => snapshot,
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self, RetrainOutcome::Trained(_))
    }

    pub fn insufficient_data(&self) -> Option<&InsufficientDataError> {
        match self {
            RetrainOutcome::Trained(_) => None,
            RetrainOutcome::Skipped { reason, .. } => Some(reason),
        }
    }
}

/// The active classifier together with the scores of the fit that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedClassifier {
    pub classifier: Classifier,
    pub snapshot: ScoreSnapshot,
}

/// Owns the active classifier and the settings used to retrain it.
///
/// Changing the algorithm never retrains on its own; callers decide when the
/// next fit happens.
#[derive(Debug, Clone)]
pub struct ClassifierManager {
    settings: TrainingSettings,
    active: Option<TrainedClassifier>,
}

impl ClassifierManager {
    pub fn new(settings: TrainingSettings) -> Self {
        Self {
            settings,
            active: None,
        }
    }

    /// Restore a previously exported classifier as the active one.
    pub fn with_classifier(settings: TrainingSettings, trained: TrainedClassifier) -> Self {
        Self {
            settings,
            active: Some(trained),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.settings.algorithm
    }

    pub fn settings(&self) -> &TrainingSettings {
        &self.settings
    }

    /// Select the algorithm used by the next retrain.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        if algorithm != self.settings.algorithm {
            info!("Classifier algorithm set to {algorithm}");
        }
        self.settings.algorithm = algorithm;
    }

    /// True until a retrain succeeds.
    pub fn is_empty(&self) -> bool {
        self.active.is_none()
    }

    pub fn active(&self) -> Option<&TrainedClassifier> {
        self.active.as_ref()
    }

    pub(crate) fn set_active_round(&mut self, round: usize) {
        if let Some(active) = self.active.as_mut() {
            active.snapshot.round = round;
        }
    }

    /// Fit the selected algorithm on every labeled example in `store`.
    ///
    /// Examples are re-encoded with the current vocabulary, so vectors from
    /// different labeling rounds always share one width.
    pub fn retrain(&mut self, store: &DatasetStore, encoder: &FeatureEncoder) -> RetrainOutcome {
        let algorithm = self.settings.algorithm;
        let labeled: Vec<(&Example, Label)> = store.labeled().collect();

        let required = self.settings.min_examples.max(2);
        if labeled.len() < required {
            return self.skip(InsufficientDataError::TooFewExamples {
                found: labeled.len(),
                required,
            });
        }
        let first = labeled[0].1;
        if labeled.iter().all(|(_, label)| *label == first) {
            return self.skip(InsufficientDataError::SingleClass { label: first });
        }
        store.is_imbalanced(self.settings.imbalance_ratio);

        let keys: Vec<(&str, Label)> = labeled
            .iter()
            .map(|(example, label)| (example.link.as_str(), *label))
            .collect();
        let split = stratified_split(&keys, &self.settings.split_seed, self.settings.test_fraction);
        let vectors: Vec<FeatureVector> = labeled
            .iter()
            .map(|(example, _)| encode_example(encoder, example))
            .collect();

        let train = build_dataset(encoder.feature_len(), &split.train, &vectors, &labeled);
        let classifier = match Classifier::fit(algorithm, &train, &self.settings.options) {
            Ok(classifier) => classifier,
            Err(message) => return self.skip(InsufficientDataError::Rejected(message)),
        };

        let eval_rows = if split.test.is_empty() {
            debug!("Test partition is empty; scoring on the training partition");
            &split.train
        } else {
            &split.test
        };
        let mut cm = ConfusionMatrix::new(Label::ALL.len());
        for &idx in eval_rows {
            cm.add(labeled[idx].1.index(), classifier.predict_class_index(&vectors[idx]));
        }
        let snapshot = ScoreSnapshot::from_confusion(&cm, algorithm, split.train.len());
        info!(
            "Retrained {algorithm} on {} examples (test {}): accuracy={:.3} precision={:.3} recall={:.3} f1={:.3}",
            snapshot.train_size,
            snapshot.test_size,
            snapshot.accuracy,
            snapshot.precision,
            snapshot.recall,
            snapshot.f1
        );
        self.active = Some(TrainedClassifier {
            classifier,
            snapshot: snapshot.clone(),
        });
        RetrainOutcome::Trained(snapshot)
    }

    /// Predict one label per example, in order.
    pub fn predict(
        &self,
        examples: &[Example],
        encoder: &FeatureEncoder,
    ) -> Result<Vec<Label>, ModelNotTrainedError> {
        let trained = self.active.as_ref().ok_or(ModelNotTrainedError)?;
        let classifier = &trained.classifier;
        Ok(examples
            .iter()
            .map(|example| {
                let vector = fit_width(encode_example(encoder, example), classifier.feature_len());
                Label::from_index(classifier.predict_class_index(&vector))
                    .unwrap_or(Label::Irrelevant)
            })
            .collect())
    }

    /// Probability of [`Label::Relevant`] per example, in order.
    pub fn predict_proba(
        &self,
        examples: &[Example],
        encoder: &FeatureEncoder,
    ) -> Result<Vec<f32>, ModelNotTrainedError> {
        let trained = self.active.as_ref().ok_or(ModelNotTrainedError)?;
        let classifier = &trained.classifier;
        Ok(examples
            .iter()
            .map(|example| {
                let vector = fit_width(encode_example(encoder, example), classifier.feature_len());
                classifier
                    .predict_proba(&vector)
                    .get(Label::Relevant.index())
                    .copied()
                    .unwrap_or(0.0)
            })
            .collect())
    }

    fn skip(&self, reason: InsufficientDataError) -> RetrainOutcome {
        warn!("Retrain skipped: {reason}");
        RetrainOutcome::Skipped {
            reason,
            snapshot: ScoreSnapshot::degenerate(self.settings.algorithm),
        }
    }
}

fn encode_example(encoder: &FeatureEncoder, example: &Example) -> FeatureVector {
    encoder.encode(
        &example.title,
        &example.description,
        &example.query,
        example.position,
    )
}

/// Vocabulary only grows at the end, so a wider vector keeps the trained
/// prefix intact and a narrower one is padded with absent words.
fn fit_width(mut vector: FeatureVector, width: usize) -> FeatureVector {
    vector.resize(width, 0.0);
    vector
}

fn build_dataset(
    feature_len: usize,
    rows: &[usize],
    vectors: &[FeatureVector],
    labeled: &[(&Example, Label)],
) -> TrainDataset {
    TrainDataset {
        feature_len,
        n_classes: Label::ALL.len(),
        x: rows.iter().map(|&idx| vectors[idx].clone()).collect(),
        y: rows.iter().map(|&idx| labeled[idx].1.index()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apple_store() -> DatasetStore {
        let mut store = DatasetStore::new();
        let rows = [
            ("https://www.apple.com", "Apple Inc", "Official site of Apple", Label::Relevant),
            ("https://pie.example/recipe", "Apple Pie Recipe", "Bake a classic pie", Label::Irrelevant),
            ("https://www.apple.com/retail", "Apple Store Locations", "Find an Apple Store", Label::Relevant),
        ];
        for (position, (link, title, description, label)) in rows.into_iter().enumerate() {
            store.upsert(Example::new(link, title, description, "apple", position).with_label(label));
        }
        store
    }

    #[test]
    fn predict_before_training_fails() {
        let manager = ClassifierManager::new(TrainingSettings::default());
        let encoder = FeatureEncoder::default();
        let result = manager.predict(apple_store().all_examples(), &encoder);
        assert_eq!(result, Err(ModelNotTrainedError));
        assert!(manager.is_empty());
    }

    #[test]
    fn single_class_returns_degenerate_snapshot() {
        let mut store = DatasetStore::new();
        for i in 0..4 {
            store.upsert(
                Example::new(format!("https://x{i}.example"), "t", "d", "q", i)
                    .with_label(Label::Irrelevant),
            );
        }
        let mut manager = ClassifierManager::new(TrainingSettings::default());
        let outcome = manager.retrain(&store, &FeatureEncoder::default());
        assert!(!outcome.is_trained());
        assert_eq!(
            outcome.insufficient_data(),
            Some(&InsufficientDataError::SingleClass {
                label: Label::Irrelevant
            })
        );
        let snapshot = outcome.snapshot();
        assert_eq!((snapshot.precision, snapshot.recall, snapshot.f1), (0.0, 0.0, 0.0));
        assert!(manager.is_empty());
    }

    #[test]
    fn one_example_is_insufficient() {
        let mut store = DatasetStore::new();
        store.upsert(Example::new("https://a.example", "A", "", "a", 0).with_label(Label::Relevant));
        let mut manager = ClassifierManager::new(TrainingSettings::default());
        let outcome = manager.retrain(&store, &FeatureEncoder::default());
        assert!(matches!(
            outcome.insufficient_data(),
            Some(InsufficientDataError::TooFewExamples { found: 1, .. })
        ));
    }

    #[test]
    fn apple_scenario_trains_and_predicts() {
        let store = apple_store();
        let encoder = FeatureEncoder::default();
        for algorithm in Algorithm::ALL {
            let mut manager = ClassifierManager::new(TrainingSettings::default());
            manager.set_algorithm(algorithm);
            let outcome = manager.retrain(&store, &encoder);
            assert!(outcome.is_trained(), "{algorithm} should train");
            assert!(!manager.is_empty());
            let fourth = Example::new("https://www.apple.com/iphone", "Apple iPhone", "", "apple", 3);
            let labels = manager.predict(&[fourth], &encoder).unwrap();
            assert_eq!(labels.len(), 1);
        }
    }

    #[test]
    fn skipped_retrain_keeps_previous_classifier() {
        let encoder = FeatureEncoder::default();
        let mut manager = ClassifierManager::new(TrainingSettings::default());
        assert!(manager.retrain(&apple_store(), &encoder).is_trained());
        let before = manager.active().cloned();
        let outcome = manager.retrain(&DatasetStore::new(), &encoder);
        assert!(!outcome.is_trained());
        assert_eq!(manager.active().cloned(), before);
    }

    #[test]
    fn prediction_tolerates_vocabulary_growth() {
        let store = apple_store();
        let mut encoder = FeatureEncoder::default();
        let mut manager = ClassifierManager::new(TrainingSettings::default());
        manager.retrain(&store, &encoder);
        encoder.register_words("store~recipe");
        let labels = manager.predict(store.all_examples(), &encoder).unwrap();
        assert_eq!(labels.len(), 3);
        let proba = manager.predict_proba(store.all_examples(), &encoder).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn wide_vocabulary_keeps_learned_word_column() {
        let mut encoder = FeatureEncoder::default();
        for i in 0..65_536 {
            encoder.register_word(&format!("w{i}"));
        }
        let mut store = DatasetStore::new();
        for i in 0..16 {
            let (title, label) = if i % 2 == 0 {
                ("a w65535", Label::Relevant)
            } else {
                ("a zzz", Label::Irrelevant)
            };
            store.upsert(Example::new(format!("https://w{i}.example"), title, "", "q", 0).with_label(label));
        }
        let mut settings = TrainingSettings {
            test_fraction: 0.0,
            ..TrainingSettings::default()
        };
        settings.options.forest.n_trees = 3;
        settings.options.forest.max_features = encoder.feature_len();
        let mut manager = ClassifierManager::new(settings);
        let outcome = manager.retrain(&store, &encoder);
        assert_eq!(outcome.snapshot().accuracy, 1.0);
        let labels = manager.predict(store.all_examples(), &encoder).unwrap();
        let expected: Vec<Label> = store.labeled().map(|(_, label)| label).collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn set_algorithm_does_not_retrain() {
        let mut manager = ClassifierManager::new(TrainingSettings::default());
        manager.retrain(&apple_store(), &FeatureEncoder::default());
        manager.set_algorithm(Algorithm::LogReg);
        let active = manager.active().unwrap();
        assert_eq!(active.classifier.algorithm(), Algorithm::RandomForest);
        assert_eq!(manager.algorithm(), Algorithm::LogReg);
    }
}
