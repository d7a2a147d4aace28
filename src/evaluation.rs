//! Score history across retrain rounds.
//!
//! History is unbounded by default: a labeling session produces one snapshot
//! per round and lives for one process. `max_snapshots` caps it for hosts
//! that keep sessions alive indefinitely; the oldest entries go first.

use std::collections::VecDeque;

use serde::Serialize;

use crate::ml::ScoreSnapshot;

/// Ordered record of every retrain's scores.
#[derive(Debug, Clone, Default)]
pub struct EvaluationTracker {
    history: VecDeque<ScoreSnapshot>,
    max_snapshots: Option<usize>,
    recorded: usize,
}

/// Per-metric series for charting, aligned by round.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreSeries {
    /// 1-based round numbers of the kept snapshots.
    pub rounds: Vec<usize>,
    pub accuracy: Vec<f32>,
    pub precision: Vec<f32>,
    pub recall: Vec<f32>,
    pub f1: Vec<f32>,
}

impl EvaluationTracker {
    pub fn new(max_snapshots: Option<usize>) -> Self {
        Self {
            history: VecDeque::new(),
            max_snapshots,
            recorded: 0,
        }
    }

    /// Append a snapshot stamped with the next round number and return that round.
    pub fn record(&mut self, mut snapshot: ScoreSnapshot) -> usize {
        self.recorded += 1;
        snapshot.round = self.recorded;
        self.history.push_back(snapshot);
        if let Some(max) = self.max_snapshots {
            while self.history.len() > max {
                self.history.pop_front();
            }
        }
        self.recorded
    }

    /// Kept snapshots, oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &ScoreSnapshot> {
        self.history.iter()
    }

    pub fn latest(&self) -> Option<&ScoreSnapshot> {
        self.history.back()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Total snapshots ever recorded, including evicted ones.
    pub fn rounds_recorded(&self) -> usize {
        self.recorded
    }

    pub fn series(&self) -> ScoreSeries {
        let mut series = ScoreSeries::default();
        for snapshot in &self.history {
            series.rounds.push(snapshot.round);
            series.accuracy.push(snapshot.accuracy);
            series.precision.push(snapshot.precision);
            series.recall.push(snapshot.recall);
            series.f1.push(snapshot.f1);
        }
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::Algorithm;

    fn snapshot(accuracy: f32) -> ScoreSnapshot {
        ScoreSnapshot {
            accuracy,
            ..ScoreSnapshot::degenerate(Algorithm::RandomForest)
        }
    }

    #[test]
    fn history_preserves_insertion_order() {
        let mut tracker = EvaluationTracker::default();
        for acc in [0.1, 0.5, 0.3] {
            tracker.record(snapshot(acc));
        }
        let accs: Vec<f32> = tracker.history().map(|s| s.accuracy).collect();
        assert_eq!(accs, vec![0.1, 0.5, 0.3]);
        assert_eq!(tracker.latest().map(|s| s.accuracy), Some(0.3));
    }

    #[test]
    fn cap_evicts_oldest_and_keeps_round_numbers() {
        let mut tracker = EvaluationTracker::new(Some(2));
        for acc in [0.1, 0.2, 0.3, 0.4] {
            tracker.record(snapshot(acc));
        }
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.rounds_recorded(), 4);
        let series = tracker.series();
        assert_eq!(series.rounds, vec![3, 4]);
        assert_eq!(series.accuracy, vec![0.3, 0.4]);
    }

    #[test]
    fn record_stamps_consecutive_rounds() {
        let mut tracker = EvaluationTracker::new(Some(1));
        assert_eq!(tracker.record(snapshot(0.2)), 1);
        assert_eq!(tracker.record(snapshot(0.4)), 2);
        assert_eq!(tracker.record(snapshot(0.6)), 3);
        let latest = tracker.latest().unwrap();
        assert_eq!(latest.round, 3);
        assert_eq!(latest.accuracy, 0.6);
        assert_eq!(tracker.series().rounds, vec![3]);
    }

    #[test]
    fn empty_series() {
        let tracker = EvaluationTracker::default();
        assert!(tracker.is_empty());
        assert_eq!(tracker.series(), ScoreSeries::default());
    }
}
