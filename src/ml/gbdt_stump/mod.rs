//! Gradient-boosted decision-stump classifier.
//!
//! Softmax boosting over single-split trees. Training is fully deterministic,
//! so two fits on the same rows produce identical stumps.

mod model;
mod train;

pub use model::{GbdtStumpModel, Stump, argmax, softmax};
pub use train::{GbdtOptions, train_gbdt_stump};
