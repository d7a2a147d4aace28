//! Active-learning core for labeling search-engine results.
//!
//! A [`session::Session`] turns labeled result batches into a growing dataset,
//! retrains a classifier after every round and exports the dataset, model and
//! score history on request.

/// Application directory resolution (`.searchlab`).
pub mod app_dirs;
/// TOML session configuration.
pub mod config;
/// Labeled examples, CSV snapshots and the train/test split.
pub mod dataset;
/// Error types shared across modules.
pub mod error;
/// Score history across retrain rounds.
pub mod evaluation;
/// Text normalization, vocabulary and feature vectors.
pub mod features;
/// Logging setup for the CLI and embedding hosts.
pub mod logging;
/// Classifier algorithms, training and metrics.
pub mod ml;
/// Dataset, model and history exports.
pub mod persist;
/// Object types for uploaded query tables.
pub mod schema;
/// The labeling session and its result batches.
pub mod session;
