//! Labeled search-result dataset.
//!
//! Examples are keyed by link and kept in insertion order. Re-labeling a link
//! overwrites it in place; nothing is ever removed.

mod export;
mod loader;
mod split;

pub use export::{DATASET_FILE_NAME, DATASET_HEADER, write_dataset};
pub use loader::{load_dataset, parse_dataset};
pub use split::{Split, stratified_split};

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::InvalidInputError;

/// Binary relevance label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Irrelevant,
    Relevant,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Irrelevant, Label::Relevant];

    /// Class index used by the classifiers (`0` or `1`).
    pub fn index(self) -> usize {
        match self {
            Label::Irrelevant => 0,
            Label::Relevant => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Label::Irrelevant),
            1 => Some(Label::Relevant),
            _ => None,
        }
    }

    /// Parse a single annotation character.
    pub fn from_char(index: usize, c: char) -> Result<Self, InvalidInputError> {
        match c {
            '0' => Ok(Label::Irrelevant),
            '1' => Ok(Label::Relevant),
            found => Err(InvalidInputError::AnnotationChar { index, found }),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// One search result with its text, rank, and optional label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub link: String,
    pub title: String,
    pub description: String,
    pub query: String,
    pub position: usize,
    pub label: Option<Label>,
}

impl Example {
    pub fn new(
        link: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        query: impl Into<String>,
        position: usize,
    ) -> Self {
        Self {
            link: link.into(),
            title: title.into(),
            description: description.into(),
            query: query.into(),
            position,
            label: None,
        }
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }
}

/// Insertion-ordered, link-keyed example collection.
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    examples: Vec<Example>,
    index: HashMap<String, usize>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from examples in order, later duplicates overwriting earlier ones.
    pub fn from_examples(examples: impl IntoIterator<Item = Example>) -> Self {
        let mut store = Self::new();
        for example in examples {
            store.upsert(example);
        }
        store
    }

    /// Insert a new example or overwrite the existing one with the same link.
    ///
    /// Overwrites keep the example's slot, so reporting order never changes.
    pub fn upsert(&mut self, example: Example) {
        match self.index.get(&example.link) {
            Some(&slot) => {
                debug!("Updating example {}", example.link);
                self.examples[slot] = example;
            }
            None => {
                self.index.insert(example.link.clone(), self.examples.len());
                self.examples.push(example);
            }
        }
    }

    pub fn all_examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn get(&self, link: &str) -> Option<&Example> {
        self.index.get(link).map(|&slot| &self.examples[slot])
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Examples that carry a label, in insertion order.
    pub fn labeled(&self) -> impl Iterator<Item = (&Example, Label)> {
        self.examples
            .iter()
            .filter_map(|example| example.label.map(|label| (example, label)))
    }

    /// Count labeled examples per class. Classes with no examples are omitted.
    pub fn class_count(&self) -> BTreeMap<Label, usize> {
        let mut counts = BTreeMap::new();
        for (_, label) in self.labeled() {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }

    /// Whether the majority class outnumbers the minority by more than `max_ratio`.
    ///
    /// A missing class counts as imbalanced once anything is labeled.
    pub fn is_imbalanced(&self, max_ratio: f32) -> bool {
        let counts = self.class_count();
        let majority = counts.values().copied().max().unwrap_or(0);
        if majority == 0 {
            return false;
        }
        let minority = Label::ALL
            .iter()
            .map(|label| counts.get(label).copied().unwrap_or(0))
            .min()
            .unwrap_or(0);
        let imbalanced = minority == 0 || majority as f32 / minority as f32 > max_ratio;
        if imbalanced {
            warn!("Class imbalance detected: {counts:?}");
        }
        imbalanced
    }
}
