//! Error taxonomy shared by the learning core.
//!
//! The feature encoder and dataset store never fail on well-formed input, so
//! every error here originates in validation, training, or persistence.

use std::path::PathBuf;

use thiserror::Error;

use crate::dataset::Label;

/// Malformed caller input (annotations, algorithm tags, uploaded tables).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInputError {
    #[error("expected {expected} annotations but received {found}")]
    AnnotationCount { expected: usize, found: usize },
    #[error("invalid annotation character {found:?} at index {index} (expected '0' or '1')")]
    AnnotationChar { index: usize, found: char },
    #[error("unknown classifier algorithm {0:?}")]
    UnknownAlgorithm(String),
    #[error("unknown object type {0:?}")]
    UnknownObjectType(String),
    #[error("header does not match object type {object}: expected {expected:?}")]
    HeaderMismatch {
        object: String,
        expected: Vec<String>,
    },
    #[error("not enough fields on line {line} (expected at least {required})")]
    MissingFields { line: usize, required: usize },
    #[error("uploaded table contains no queries")]
    NoQueries,
    #[error("required field {0} is empty")]
    EmptyField(&'static str),
}

/// Prediction or model export requested before any successful retrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no classifier has been trained yet")]
pub struct ModelNotTrainedError;

/// Retrain skipped because the dataset cannot support a fit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsufficientDataError {
    #[error("need at least {required} labeled examples, found {found}")]
    TooFewExamples { found: usize, required: usize },
    #[error("all labeled examples belong to class {label}")]
    SingleClass { label: Label },
    #[error("training rejected the dataset: {0}")]
    Rejected(String),
}

/// Failures reading or writing exported artifacts.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode model artifact: {0}")]
    Encode(bincode::Error),
    #[error("failed to decode model artifact: {0}")]
    Decode(bincode::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed dataset file on line {line}: {message}")]
    Csv { line: usize, message: String },
    #[error("{0} is not a searchlab model artifact")]
    BadMagic(PathBuf),
    #[error("unsupported model format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Model export failure: either nothing to export or the write itself failed.
#[derive(Debug, Error)]
pub enum ExportModelError {
    #[error(transparent)]
    NotTrained(#[from] ModelNotTrainedError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Aggregate error surfaced by [`crate::session::Session`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
    #[error(transparent)]
    NotTrained(#[from] ModelNotTrainedError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<ExportModelError> for SessionError {
    fn from(error: ExportModelError) -> Self {
        match error {
            ExportModelError::NotTrained(err) => Self::NotTrained(err),
            ExportModelError::Persistence(err) => Self::Persistence(err),
        }
    }
}
