//! Snapshot exports: dataset CSV, binary model artifact, score history.
//!
//! Every export overwrites the file at its fixed name inside the target
//! directory, so repeated calls without state changes produce identical files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::{DATASET_FILE_NAME, DatasetStore, write_dataset};
use crate::error::{ExportModelError, ModelNotTrainedError, PersistenceError};
use crate::evaluation::EvaluationTracker;
use crate::features::{BASE_FEATURE_LEN, FeatureEncoder, Vocabulary};
use crate::ml::{Algorithm, Classifier, ClassifierManager, ScoreSnapshot, TrainedClassifier};

/// File name of the binary model artifact.
pub const MODEL_FILE_NAME: &str = "model.bin";
/// File name of the JSON score history.
pub const HISTORY_FILE_NAME: &str = "score_history.json";
/// Leading bytes of every model artifact.
pub const MODEL_MAGIC: &[u8; 8] = b"SLMODEL\0";
/// Current model artifact format version.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Self-contained trained model: the classifier plus the vocabulary prefix
/// needed to rebuild its feature encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub algorithm: Algorithm,
    pub feature_len: usize,
    pub vocabulary: Vec<String>,
    pub classifier: Classifier,
    pub snapshot: ScoreSnapshot,
}

impl ModelArtifact {
    /// Capture the active classifier of `manager`.
    pub fn capture(
        manager: &ClassifierManager,
        encoder: &FeatureEncoder,
    ) -> Result<Self, ModelNotTrainedError> {
        let trained = manager.active().ok_or(ModelNotTrainedError)?;
        let feature_len = trained.classifier.feature_len();
        let words = encoder.vocabulary().words();
        let vocab_len = feature_len.saturating_sub(BASE_FEATURE_LEN).min(words.len());
        Ok(Self {
            algorithm: trained.classifier.algorithm(),
            feature_len,
            vocabulary: words[..vocab_len].to_vec(),
            classifier: trained.classifier.clone(),
            snapshot: trained.snapshot.clone(),
        })
    }

    /// Feature encoder matching the vocabulary the model was trained with.
    pub fn encoder(&self) -> FeatureEncoder {
        FeatureEncoder::with_vocabulary(Vocabulary::from_words(&self.vocabulary))
    }

    pub fn into_trained(self) -> TrainedClassifier {
        TrainedClassifier {
            classifier: self.classifier,
            snapshot: self.snapshot,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistenceError> {
        let payload = bincode::serialize(self).map_err(PersistenceError::Encode)?;
        let mut bytes = Vec::with_capacity(MODEL_MAGIC.len() + 4 + payload.len());
        bytes.extend_from_slice(MODEL_MAGIC);
        bytes.extend_from_slice(&MODEL_FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8], origin: &Path) -> Result<Self, PersistenceError> {
        let header_len = MODEL_MAGIC.len() + 4;
        if bytes.len() < header_len || &bytes[..MODEL_MAGIC.len()] != MODEL_MAGIC {
            return Err(PersistenceError::BadMagic(origin.to_path_buf()));
        }
        let mut version_bytes = [0u8; 4];
        version_bytes.copy_from_slice(&bytes[MODEL_MAGIC.len()..header_len]);
        let version = u32::from_le_bytes(version_bytes);
        if version != MODEL_FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: version,
                expected: MODEL_FORMAT_VERSION,
            });
        }
        let artifact: Self =
            bincode::deserialize(&bytes[header_len..]).map_err(PersistenceError::Decode)?;
        artifact.classifier.validate().map_err(|message| {
            PersistenceError::Decode(Box::new(bincode::ErrorKind::Custom(message)))
        })?;
        Ok(artifact)
    }
}

/// Write `search_dataset.csv` into `dir`.
pub fn export_dataset(store: &DatasetStore, dir: &Path) -> Result<PathBuf, PersistenceError> {
    let path = dir.join(DATASET_FILE_NAME);
    write_dataset(store.all_examples(), &path)?;
    Ok(path)
}

/// Write `model.bin` into `dir`.
pub fn export_model(
    manager: &ClassifierManager,
    encoder: &FeatureEncoder,
    dir: &Path,
) -> Result<PathBuf, ExportModelError> {
    let artifact = ModelArtifact::capture(manager, encoder)?;
    let path = dir.join(MODEL_FILE_NAME);
    write_file(&path, &artifact.to_bytes()?)?;
    info!("Exported {} model to {}", artifact.algorithm, path.display());
    Ok(path)
}

/// Read a model artifact written by [`export_model`].
pub fn load_model(path: &Path) -> Result<ModelArtifact, PersistenceError> {
    let bytes = std::fs::read(path).map_err(|source| PersistenceError::io(path, source))?;
    ModelArtifact::from_bytes(&bytes, path)
}

/// Write `score_history.json` into `dir`.
pub fn export_history(tracker: &EvaluationTracker, dir: &Path) -> Result<PathBuf, PersistenceError> {
    #[derive(Serialize)]
    struct HistoryFile<'a> {
        snapshots: Vec<&'a ScoreSnapshot>,
        series: crate::evaluation::ScoreSeries,
    }
    let file = HistoryFile {
        snapshots: tracker.history().collect(),
        series: tracker.series(),
    };
    let path = dir.join(HISTORY_FILE_NAME);
    write_file(&path, &serde_json::to_vec_pretty(&file)?)?;
    Ok(path)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| PersistenceError::io(parent, source))?;
    }
    std::fs::write(path, bytes).map_err(|source| PersistenceError::io(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingSettings;
    use crate::dataset::{Example, Label, load_dataset};
    use tempfile::tempdir;

    fn trained() -> (DatasetStore, FeatureEncoder, ClassifierManager) {
        let mut store = DatasetStore::new();
        let mut encoder = FeatureEncoder::default();
        encoder.register_words("official~recipe");
        for (i, (title, label)) in [
            ("Apple Inc official", Label::Relevant),
            ("Apple Pie Recipe", Label::Irrelevant),
            ("Apple official store", Label::Relevant),
            ("Apple crumble recipe", Label::Irrelevant),
        ]
        .into_iter()
        .enumerate()
        {
            store.upsert(
                Example::new(format!("https://r{i}.example"), title, "", "apple", i)
                    .with_label(label),
            );
        }
        let mut manager = ClassifierManager::new(TrainingSettings::default());
        assert!(manager.retrain(&store, &encoder).is_trained());
        (store, encoder, manager)
    }

    #[test]
    fn export_model_requires_training() {
        let dir = tempdir().unwrap();
        let manager = ClassifierManager::new(TrainingSettings::default());
        let err = export_model(&manager, &FeatureEncoder::default(), dir.path()).unwrap_err();
        assert!(matches!(err, ExportModelError::NotTrained(_)));
    }

    #[test]
    fn model_export_is_idempotent_and_loadable() {
        let (_, encoder, manager) = trained();
        let dir = tempdir().unwrap();
        let path = export_model(&manager, &encoder, dir.path()).unwrap();
        let first = std::fs::read(&path).unwrap();
        export_model(&manager, &encoder, dir.path()).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);

        let artifact = load_model(&path).unwrap();
        assert_eq!(artifact.vocabulary, vec!["official", "recipe"]);
        assert_eq!(&artifact.classifier, &manager.active().unwrap().classifier);
        assert_eq!(artifact.encoder().feature_len(), artifact.feature_len);
    }

    #[test]
    fn load_rejects_foreign_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.bin");
        std::fs::write(&path, b"not a model").unwrap();
        assert!(matches!(load_model(&path), Err(PersistenceError::BadMagic(_))));

        let mut bytes = MODEL_MAGIC.to_vec();
        bytes.extend_from_slice(&99u32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            load_model(&path),
            Err(PersistenceError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn dataset_export_round_trips_links_and_labels() {
        let (store, _, _) = trained();
        let dir = tempdir().unwrap();
        let path = export_dataset(&store, dir.path()).unwrap();
        let loaded = load_dataset(&path).unwrap();
        let expected: Vec<(String, Option<Label>)> = store
            .all_examples()
            .iter()
            .map(|e| (e.link.clone(), e.label))
            .collect();
        let actual: Vec<(String, Option<Label>)> =
            loaded.iter().map(|e| (e.link.clone(), e.label)).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn history_export_writes_json() {
        let (_, _, manager) = trained();
        let mut tracker = EvaluationTracker::default();
        tracker.record(manager.active().unwrap().snapshot.clone());
        let dir = tempdir().unwrap();
        let path = export_history(&tracker, dir.path()).unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(value["snapshots"].as_array().unwrap().len(), 1);
        assert_eq!(value["series"]["rounds"][0], 1);
    }
}
