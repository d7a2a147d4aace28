//! Feature encoding for search results.
//!
//! A result is reduced to a fixed block of base features (position and
//! query/text overlap) followed by one word-presence feature per registered
//! vocabulary word. Encoding is pure given the current vocabulary and never
//! fails: empty text produces a valid baseline vector.

mod normalize;
mod vocabulary;

pub use normalize::{normalize_text, tokens};
pub use vocabulary::Vocabulary;

use std::collections::HashSet;

/// Number of base features preceding the vocabulary block.
pub const BASE_FEATURE_LEN: usize = 6;
/// Maximum number of results considered per query.
pub const MAX_RESULTS_PER_QUERY: usize = 10;
/// Delimiter used by the labeling UI for new vocabulary words.
pub const WORD_DELIMITER: char = '~';

const LENGTH_SQUASH: f32 = 10.0;
const TITLE_PRESENCE: f32 = 1.0;
const DESCRIPTION_PRESENCE: f32 = 0.5;

/// Dense feature vector for a single result.
pub type FeatureVector = Vec<f32>;

/// Turns raw result text into feature vectors.
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    vocabulary: Vocabulary,
}

impl FeatureEncoder {
    pub fn new(max_words: Option<usize>) -> Self {
        Self {
            vocabulary: Vocabulary::new(max_words),
        }
    }

    pub fn with_vocabulary(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Current vector length: base features plus one slot per vocabulary word.
    pub fn feature_len(&self) -> usize {
        BASE_FEATURE_LEN + self.vocabulary.len()
    }

    /// Add a word to the vocabulary, widening every future encoding.
    pub fn register_word(&mut self, word: &str) -> bool {
        self.vocabulary.register(word)
    }

    /// Register each `~`-separated word; empty pieces are skipped.
    pub fn register_words(&mut self, delimited: &str) -> usize {
        delimited
            .split(WORD_DELIMITER)
            .filter(|word| self.register_word(word))
            .count()
    }

    /// Encode one result.
    pub fn encode(
        &self,
        title: &str,
        description: &str,
        query: &str,
        position: usize,
    ) -> FeatureVector {
        let title = normalize_text(title);
        let description = normalize_text(description);
        let query = normalize_text(query);

        let title_tokens: HashSet<&str> = tokens(&title).collect();
        let description_tokens: HashSet<&str> = tokens(&description).collect();
        let query_tokens: Vec<&str> = tokens(&query).collect();

        let mut features = Vec::with_capacity(self.feature_len());
        features.push(position_feature(position));
        features.push(overlap_fraction(&query_tokens, &title_tokens));
        features.push(overlap_fraction(&query_tokens, &description_tokens));
        features.push(phrase_match(&title, &query));
        features.push(squash(tokens(&title).count()));
        features.push(squash(tokens(&description).count()));

        for word in self.vocabulary.words() {
            let mut value = 0.0;
            if title_tokens.contains(word.as_str()) {
                value += TITLE_PRESENCE;
            }
            if description_tokens.contains(word.as_str()) {
                value += DESCRIPTION_PRESENCE;
            }
            features.push(value);
        }
        features
    }
}

fn position_feature(position: usize) -> f32 {
    let last = (MAX_RESULTS_PER_QUERY - 1) as f32;
    (position as f32 / last).clamp(0.0, 1.0)
}

fn overlap_fraction(query_tokens: &[&str], text_tokens: &HashSet<&str>) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let hits = query_tokens
        .iter()
        .filter(|token| text_tokens.contains(*token))
        .count();
    hits as f32 / query_tokens.len() as f32
}

fn phrase_match(title: &str, query: &str) -> f32 {
    let query: Vec<&str> = tokens(query).collect();
    if query.is_empty() {
        return 0.0;
    }
    let title: Vec<&str> = tokens(title).collect();
    if title.windows(query.len()).any(|window| window == query.as_slice()) {
        1.0
    } else {
        0.0
    }
}

fn squash(count: usize) -> f32 {
    let count = count as f32;
    count / (count + LENGTH_SQUASH)
}
