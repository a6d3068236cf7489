//! Bounded log of the transitions an interpreter has taken.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Default number of records kept by an interpreter.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Record of one processed event that changed the machine.
///
/// `from` and `to` hold the qualified ids of the active states below the
/// root, outermost first.
///
/// # Example
///
/// ```rust
/// use statewise::core::TransitionRecord;
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     event: "toggle".to_string(),
///     from: vec!["Video.mini".to_string()],
///     to: vec!["Video.full".to_string(), "Video.full.playing".to_string()],
///     timestamp: Utc::now(),
/// };
/// assert_eq!(record.to.last().unwrap(), "Video.full.playing");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Name of the event that was processed
    pub event: String,
    /// Active states before the step
    pub from: Vec<String>,
    /// Active states after the step
    pub to: Vec<String>,
    /// When the step completed
    pub timestamp: DateTime<Utc>,
}

/// Ordered transition records, oldest first, capped at a fixed length.
///
/// # Example
///
/// ```rust
/// use statewise::core::{StateHistory, TransitionRecord};
/// use chrono::Utc;
///
/// let mut history = StateHistory::with_limit(2);
/// for event in ["a", "b", "c"] {
///     history.record(TransitionRecord {
///         event: event.to_string(),
///         from: vec![],
///         to: vec![],
///         timestamp: Utc::now(),
///     });
/// }
///
/// let events: Vec<&str> = history.transitions().map(|r| r.event.as_str()).collect();
/// assert_eq!(events, vec!["b", "c"]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateHistory {
    limit: usize,
    records: VecDeque<TransitionRecord>,
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl StateHistory {
    /// Create an empty history keeping at most `limit` records.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            records: VecDeque::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Append a record, dropping the oldest one when full.
    pub fn record(&mut self, record: TransitionRecord) {
        if self.limit == 0 {
            return;
        }
        if self.records.len() == self.limit {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Active configurations visited, starting with the `from` of the oldest
    /// retained record.
    pub fn get_path(&self) -> Vec<&[String]> {
        let mut path = Vec::new();
        if let Some(first) = self.records.front() {
            path.push(first.from.as_slice());
        }
        for record in &self.records {
            path.push(record.to.as_slice());
        }
        path
    }

    /// Time between the oldest and newest retained record.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.front()?, self.records.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(event: &str, from: &[&str], to: &[&str]) -> TransitionRecord {
        TransitionRecord {
            event: event.to_string(),
            from: from.iter().map(|s| s.to_string()).collect(),
            to: to.iter().map(|s| s.to_string()).collect(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history = StateHistory::default();
        assert!(history.is_empty());
        assert!(history.get_path().is_empty());
        assert!(history.duration().is_none());
        assert_eq!(history.limit(), DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn get_path_returns_visited_configurations() {
        let mut history = StateHistory::default();
        history.record(record("toggle", &["M.mini"], &["M.full", "M.full.playing"]));
        history.record(record(
            "video.ended",
            &["M.full", "M.full.playing"],
            &["M.full", "M.full.stopped"],
        ));

        let path = history.get_path();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0].to_vec(), vec!["M.mini".to_string()]);
        assert_eq!(path[2][1], "M.full.stopped");
    }

    #[test]
    fn oldest_records_are_dropped_at_limit() {
        let mut history = StateHistory::with_limit(2);
        history.record(record("one", &[], &[]));
        history.record(record("two", &[], &[]));
        history.record(record("three", &[], &[]));

        assert_eq!(history.len(), 2);
        assert_eq!(history.transitions().next().unwrap().event, "two");
        assert_eq!(history.last().unwrap().event, "three");
    }

    #[test]
    fn zero_limit_keeps_nothing() {
        let mut history = StateHistory::with_limit(0);
        history.record(record("one", &[], &[]));
        assert!(history.is_empty());
    }

    #[test]
    fn duration_spans_first_to_last() {
        let mut history = StateHistory::default();
        let start = Utc::now();
        let mut first = record("one", &[], &[]);
        first.timestamp = start;
        let mut second = record("two", &[], &[]);
        second.timestamp = start + chrono::Duration::milliseconds(250);

        history.record(first);
        history.record(second);

        assert_eq!(history.duration(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn history_serializes_correctly() {
        let mut history = StateHistory::default();
        history.record(record("toggle", &["M.mini"], &["M.full"]));

        let json = serde_json::to_string(&history).unwrap();
        let back: StateHistory = serde_json::from_str(&json).unwrap();

        assert_eq!(back.len(), 1);
        assert_eq!(back.last(), history.last());
    }
}
