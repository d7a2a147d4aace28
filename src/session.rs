//! One labeling session: the active-learning loop around a single dataset.
//!
//! A session owns its encoder, dataset, classifier and score history. Hosts
//! serving several users create one session each; [`SharedSession`] is the
//! lock-wrapped handle for hosts that hand a session across threads.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::dataset::{DatasetStore, Example, Label};
use crate::error::{InvalidInputError, SessionError};
use crate::evaluation::EvaluationTracker;
use crate::features::{FeatureEncoder, MAX_RESULTS_PER_QUERY, normalize_text};
use crate::ml::{Algorithm, ClassifierManager, RetrainOutcome};
use crate::persist;
use crate::schema::ObjectSchemaRegistry;

/// Session handle for hosts that share one session between threads.
pub type SharedSession = Arc<Mutex<Session>>;

/// Raw search result as delivered by a search collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub link: String,
    pub title: String,
    pub description: String,
}

impl SearchResult {
    pub fn new(
        link: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            link: link.into(),
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Results of one query as shown to the labeler, in rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBatch {
    query: String,
    results: Vec<SearchResult>,
}

impl ResultBatch {
    /// Keep the first [`MAX_RESULTS_PER_QUERY`] absolute links, with
    /// normalized title and description text.
    pub fn from_results(
        query: impl Into<String>,
        results: impl IntoIterator<Item = SearchResult>,
    ) -> Self {
        let query = query.into();
        let mut kept = Vec::new();
        for result in results {
            if kept.len() >= MAX_RESULTS_PER_QUERY {
                break;
            }
            if result.link.starts_with('/') {
                debug!("Skipping relative link {}", result.link);
                continue;
            }
            if let Err(err) = Url::parse(&result.link) {
                warn!("Skipping result with invalid link {:?}: {err}", result.link);
                continue;
            }
            kept.push(SearchResult {
                link: result.link,
                title: normalize_text(&result.title),
                description: normalize_text(&result.description),
            });
        }
        Self {
            query,
            results: kept,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Unlabeled examples for the batch; the position is the kept rank.
    pub fn examples(&self) -> Vec<Example> {
        self.results
            .iter()
            .enumerate()
            .map(|(position, result)| {
                Example::new(
                    result.link.clone(),
                    result.title.clone(),
                    result.description.clone(),
                    self.query.clone(),
                    position,
                )
            })
            .collect()
    }
}

/// State of one labeling session.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    config: SessionConfig,
    encoder: FeatureEncoder,
    store: DatasetStore,
    manager: ClassifierManager,
    tracker: EvaluationTracker,
    schemas: ObjectSchemaRegistry,
    queries: VecDeque<String>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let id = Uuid::new_v4();
        info!(
            "Session {id} started with {} classifier",
            config.training.algorithm
        );
        Self {
            id,
            encoder: FeatureEncoder::new(config.vocabulary.max_words),
            store: DatasetStore::new(),
            manager: ClassifierManager::new(config.training.clone()),
            tracker: EvaluationTracker::new(config.history.max_snapshots),
            schemas: ObjectSchemaRegistry::builtin(),
            queries: VecDeque::new(),
            config,
        }
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn dataset(&self) -> &DatasetStore {
        &self.store
    }

    pub fn classifier(&self) -> &ClassifierManager {
        &self.manager
    }

    pub fn history(&self) -> &EvaluationTracker {
        &self.tracker
    }

    pub fn schemas(&self) -> &ObjectSchemaRegistry {
        &self.schemas
    }

    pub fn schemas_mut(&mut self) -> &mut ObjectSchemaRegistry {
        &mut self.schemas
    }

    /// Suggested labels for a batch; all `None` until a classifier exists.
    pub fn present(&self, batch: &ResultBatch) -> Vec<Option<Label>> {
        let examples = batch.examples();
        match self.manager.predict(&examples, &self.encoder) {
            Ok(labels) => labels.into_iter().map(Some).collect(),
            Err(_) => vec![None; examples.len()],
        }
    }

    /// Record one labeling round and retrain.
    ///
    /// `annotation` holds one `'0'`/`'1'` per result in the batch and is
    /// validated in full before anything is stored. `words` are new
    /// vocabulary words separated by `~`.
    pub fn submit_labels(
        &mut self,
        batch: &ResultBatch,
        annotation: &str,
        words: &str,
    ) -> Result<RetrainOutcome, SessionError> {
        let labels = parse_annotation(annotation, batch.len())?;
        let added = self.encoder.register_words(words);
        if added > 0 {
            debug!("Registered {added} vocabulary words");
        }
        for (example, label) in batch.examples().into_iter().zip(labels) {
            self.store.upsert(example.with_label(label));
        }
        let outcome = self.retrain();
        if self.config.export.auto_export
            && let Err(err) = persist::export_dataset(&self.store, &self.config.export.out_dir)
        {
            warn!("Automatic dataset export failed: {err}");
        }
        Ok(outcome)
    }

    /// Add previously exported examples, e.g. when resuming from a CSV snapshot.
    pub fn restore_examples(&mut self, examples: impl IntoIterator<Item = Example>) -> usize {
        let before = self.store.len();
        for example in examples {
            self.store.upsert(example);
        }
        self.store.len() - before
    }

    pub fn register_words(&mut self, words: &str) -> usize {
        self.encoder.register_words(words)
    }

    /// Retrain on the current dataset and record the resulting snapshot.
    pub fn retrain(&mut self) -> RetrainOutcome {
        let mut outcome = self.manager.retrain(&self.store, &self.encoder);
        let round = self.tracker.record(outcome.snapshot().clone());
        outcome.snapshot_mut().round = round;
        if outcome.is_trained() {
            self.manager.set_active_round(round);
        }
        outcome
    }

    /// Select a classifier algorithm, retraining right away when examples exist.
    pub fn switch_algorithm(&mut self, algorithm: Algorithm) -> Option<RetrainOutcome> {
        self.manager.set_algorithm(algorithm);
        self.config.training.algorithm = algorithm;
        if self.store.is_empty() {
            return None;
        }
        Some(self.retrain())
    }

    /// Parse the algorithm tag and switch to it.
    pub fn switch_algorithm_tag(&mut self, tag: &str) -> Result<Option<RetrainOutcome>, SessionError> {
        let algorithm = tag.parse::<Algorithm>()?;
        Ok(self.switch_algorithm(algorithm))
    }

    pub fn enqueue_queries(&mut self, queries: impl IntoIterator<Item = String>) {
        self.queries.extend(
            queries
                .into_iter()
                .map(|query| query.trim().to_string())
                .filter(|query| !query.is_empty()),
        );
    }

    /// Parse an uploaded attribute table for `object` and queue its rows.
    pub fn enqueue_upload(&mut self, object: &str, text: &str) -> Result<usize, SessionError> {
        let queries = self.schemas.parse_query_table(object, text)?;
        let count = queries.len();
        self.enqueue_queries(queries);
        Ok(count)
    }

    pub fn next_query(&mut self) -> Option<String> {
        self.queries.pop_front()
    }

    pub fn pending_queries(&self) -> usize {
        self.queries.len()
    }

    pub fn export_dataset(&self) -> Result<PathBuf, SessionError> {
        Ok(persist::export_dataset(&self.store, self.out_dir())?)
    }

    pub fn export_model(&self) -> Result<PathBuf, SessionError> {
        Ok(persist::export_model(&self.manager, &self.encoder, self.out_dir())?)
    }

    pub fn export_history(&self) -> Result<PathBuf, SessionError> {
        Ok(persist::export_history(&self.tracker, self.out_dir())?)
    }

    fn out_dir(&self) -> &Path {
        &self.config.export.out_dir
    }
}

/// Join the non-empty trimmed form fields into one query.
pub fn build_manual_query<I, S>(fields: I) -> Result<String, InvalidInputError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parts: Vec<String> = fields
        .into_iter()
        .map(|field| field.as_ref().trim().to_string())
        .filter(|field| !field.is_empty())
        .collect();
    if parts.is_empty() {
        return Err(InvalidInputError::EmptyField("query"));
    }
    Ok(parts.join(" "))
}

fn parse_annotation(annotation: &str, expected: usize) -> Result<Vec<Label>, InvalidInputError> {
    let found = annotation.chars().count();
    if found != expected {
        return Err(InvalidInputError::AnnotationCount { expected, found });
    }
    annotation
        .chars()
        .enumerate()
        .map(|(index, c)| Label::from_char(index, c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn session_in(dir: &Path) -> Session {
        let mut config = SessionConfig::default();
        config.export.out_dir = dir.to_path_buf();
        Session::new(config)
    }

    fn apple_batch() -> ResultBatch {
        ResultBatch::from_results(
            "apple",
            [
                SearchResult::new("https://www.apple.com", "Apple Inc.", "Official site of Apple"),
                SearchResult::new("/search?q=apple", "Related", ""),
                SearchResult::new("https://pie.example/recipe", "Apple Pie Recipe!", "Bake a pie"),
                SearchResult::new("not a url", "Broken", ""),
                SearchResult::new("https://www.apple.com/retail", "Apple Store", "Find a store"),
            ],
        )
    }

    #[test]
    fn batch_drops_relative_and_invalid_links() {
        let batch = apple_batch();
        let links: Vec<&str> = batch.results().iter().map(|r| r.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://www.apple.com",
                "https://pie.example/recipe",
                "https://www.apple.com/retail"
            ]
        );
        assert_eq!(batch.results()[0].title, "apple inc");
        assert_eq!(batch.examples()[2].position, 2);
    }

    #[test]
    fn batch_keeps_at_most_ten_results() {
        let results = (0..15).map(|i| SearchResult::new(format!("https://r{i}.example"), "t", "d"));
        let batch = ResultBatch::from_results("q", results);
        assert_eq!(batch.len(), MAX_RESULTS_PER_QUERY);
        assert_eq!(batch.results()[9].link, "https://r9.example");
    }

    #[test]
    fn apple_round_trains_and_exports() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());
        let batch = apple_batch();
        assert_eq!(session.present(&batch), vec![None, None, None]);

        let outcome = session.submit_labels(&batch, "101", "official~store").unwrap();
        assert!(outcome.is_trained());
        assert_eq!(session.history().len(), 1);
        let counts = session.dataset().class_count();
        assert_eq!(counts.get(&Label::Relevant), Some(&2));
        assert_eq!(counts.get(&Label::Irrelevant), Some(&1));
        assert!(dir.path().join(crate::dataset::DATASET_FILE_NAME).exists());

        let next = ResultBatch::from_results(
            "apple",
            [SearchResult::new("https://www.apple.com/iphone", "Apple iPhone", "")],
        );
        let suggested = session.present(&next);
        assert_eq!(suggested.len(), 1);
        assert!(suggested[0].is_some());

        assert!(session.export_model().unwrap().exists());
        assert!(session.export_history().unwrap().exists());
    }

    #[test]
    fn bad_annotation_changes_nothing() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());
        let batch = apple_batch();
        let err = session.submit_labels(&batch, "10", "").unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidInput(InvalidInputError::AnnotationCount {
                expected: 3,
                found: 2
            })
        ));
        let err = session.submit_labels(&batch, "1x0", "word").unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidInput(InvalidInputError::AnnotationChar { index: 1, found: 'x' })
        ));
        assert!(session.dataset().is_empty());
        assert!(session.encoder().vocabulary().is_empty());
        assert!(session.history().is_empty());
    }

    #[test]
    fn relabeling_overwrites_previous_label() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());
        let batch = apple_batch();
        session.submit_labels(&batch, "101", "").unwrap();
        session.submit_labels(&batch, "100", "").unwrap();
        assert_eq!(session.dataset().len(), 3);
        assert_eq!(
            session.dataset().get("https://www.apple.com/retail").and_then(|e| e.label),
            Some(Label::Irrelevant)
        );
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn outcomes_carry_their_round_number() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());
        let batch = apple_batch();
        let first = session.submit_labels(&batch, "111", "").unwrap();
        assert!(!first.is_trained());
        assert_eq!(first.snapshot().round, 1);

        let second = session.submit_labels(&batch, "101", "").unwrap();
        assert!(second.is_trained());
        assert_eq!(second.snapshot().round, 2);
        assert_eq!(session.history().latest().map(|s| s.round), Some(2));
        assert_eq!(session.classifier().active().map(|t| t.snapshot.round), Some(2));
    }

    #[test]
    fn switch_algorithm_retrains_only_with_data() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());
        assert_eq!(session.switch_algorithm(Algorithm::LogReg), None);
        assert!(session.history().is_empty());

        session.submit_labels(&apple_batch(), "101", "").unwrap();
        let outcome = session.switch_algorithm(Algorithm::GbdtStump).unwrap();
        assert!(outcome.is_trained());
        assert_eq!(outcome.snapshot().algorithm, Algorithm::GbdtStump);
        assert_eq!(session.history().len(), 2);

        assert!(matches!(
            session.switch_algorithm_tag("ML Models"),
            Err(SessionError::InvalidInput(InvalidInputError::UnknownAlgorithm(_)))
        ));
    }

    #[test]
    fn export_model_before_training_fails() {
        let dir = tempdir().unwrap();
        let session = session_in(dir.path());
        assert!(matches!(session.export_model(), Err(SessionError::NotTrained(_))));
    }

    #[test]
    fn query_queue_is_fifo() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());
        let added = session
            .enqueue_upload("Movie", "Name,Year\nHeat,1995\nAlien,1979\n")
            .unwrap();
        assert_eq!(added, 2);
        session.enqueue_queries(["  ".to_string(), "Up 2009".to_string()]);
        assert_eq!(session.pending_queries(), 3);
        assert_eq!(session.next_query().as_deref(), Some("Heat 1995"));
        assert_eq!(session.next_query().as_deref(), Some("Alien 1979"));
        assert_eq!(session.next_query().as_deref(), Some("Up 2009"));
        assert_eq!(session.next_query(), None);
    }

    #[test]
    fn manual_query_joins_non_empty_fields() {
        assert_eq!(
            build_manual_query([" Grace ", "", "Hopper", "  ", "Yale"]).unwrap(),
            "Grace Hopper Yale"
        );
        assert_eq!(
            build_manual_query(["", " "]),
            Err(InvalidInputError::EmptyField("query"))
        );
    }

    #[test]
    fn shared_session_locks_per_session() {
        let dir = tempdir().unwrap();
        let shared = session_in(dir.path()).into_shared();
        let handle = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                let mut session = shared.lock().unwrap();
                session.enqueue_queries(["from thread".to_string()]);
            })
        };
        handle.join().unwrap();
        assert_eq!(shared.lock().unwrap().pending_queries(), 1);
    }
}
