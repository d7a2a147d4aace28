use std::collections::HashSet;

use tracing::{debug, warn};

use super::normalize::normalize_text;

/// Distinguishing words used for word-presence features.
///
/// Words keep their registration order: index `i` in the vocabulary is feature
/// `BASE_FEATURE_LEN + i`, so appending never changes the meaning of earlier
/// features. Nothing is ever removed. `max_words` caps growth for long-running
/// hosts; the default is unbounded.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    words: Vec<String>,
    index: HashSet<String>,
    max_words: Option<usize>,
}

impl Vocabulary {
    pub fn new(max_words: Option<usize>) -> Self {
        Self {
            words: Vec::new(),
            index: HashSet::new(),
            max_words,
        }
    }

    /// Rebuild a vocabulary from a stored word list (e.g. a model artifact).
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocab = Self::new(None);
        for word in words {
            vocab.register(word.as_ref());
        }
        vocab
    }

    /// Register a word. Returns `true` when the vocabulary grew.
    ///
    /// The word is normalized first; empty tokens and duplicates are ignored.
    pub fn register(&mut self, word: &str) -> bool {
        let word = normalize_text(word);
        if word.is_empty() || self.index.contains(&word) {
            return false;
        }
        if let Some(max) = self.max_words
            && self.words.len() >= max
        {
            warn!("Vocabulary cap of {max} words reached; ignoring {word:?}");
            return false;
        }
        debug!("Registered vocabulary word {word:?}");
        self.index.insert(word.clone());
        self.words.push(word);
        true
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains(word)
    }
}
