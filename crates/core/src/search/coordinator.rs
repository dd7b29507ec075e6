//! # Search Coordinator
//!
//! Two-state machine (Browse / Search) driven only by the settled query.
//! Keystrokes update the raw query immediately and restart the debounce
//! timer; a transition is computed only when the timer fires or the search
//! is cleared explicitly.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use super::debounce::Debouncer;

/// Current traversal mode
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "term", rename_all = "snake_case")]
pub enum SearchMode {
    /// Unfiltered, offset-paginated traversal
    #[default]
    Browse,
    /// Traversal restricted to names matching the settled term
    Search(String),
}

impl SearchMode {
    pub fn term(&self) -> Option<&str> {
        match self {
            Self::Browse => None,
            Self::Search(term) => Some(term),
        }
    }
}

/// What the aggregator must do after the settled query changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeTransition {
    /// Reset and fetch with this filter
    EnterSearch(String),
    /// Reset and fetch unfiltered from offset 0
    EnterBrowse,
}

/// Raw and settled query text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    /// Updated on every keystroke
    pub raw: String,
    /// Updated only when the debounce timer fires
    pub settled: String,
}

#[derive(Debug, Clone)]
pub struct SearchCoordinator {
    query: QueryState,
    mode: SearchMode,
    debouncer: Debouncer,
    min_len: usize,
}

impl SearchCoordinator {
    pub fn new(delay: Duration, min_len: usize) -> Self {
        Self {
            query: QueryState::default(),
            mode: SearchMode::Browse,
            debouncer: Debouncer::new(delay),
            min_len,
        }
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn mode(&self) -> &SearchMode {
        &self.mode
    }

    /// When the pending keystrokes settle, if any are pending
    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Record a keystroke
    pub fn input(&mut self, raw: impl Into<String>, now: Instant) {
        self.query.raw = raw.into();
        self.debouncer.restart(now);
    }

    /// Settle the raw query if the quiet period has elapsed
    pub fn settle(&mut self, now: Instant) -> Option<ModeTransition> {
        if !self.debouncer.fire_if_due(now) {
            return None;
        }
        self.query.settled = self.query.raw.clone();
        tracing::debug!(settled = %self.query.settled, "Search query settled");
        self.transition()
    }

    /// Explicit clear: applied instantly, no debounce
    pub fn clear(&mut self) -> Option<ModeTransition> {
        self.debouncer.cancel();
        self.query = QueryState::default();
        self.transition()
    }

    fn transition(&mut self) -> Option<ModeTransition> {
        let settled = &self.query.settled;

        if settled.chars().count() >= self.min_len {
            if self.mode.term() == Some(settled.as_str()) {
                return None;
            }
            self.mode = SearchMode::Search(settled.clone());
            return Some(ModeTransition::EnterSearch(settled.clone()));
        }

        if matches!(self.mode, SearchMode::Search(_)) {
            self.mode = SearchMode::Browse;
            return Some(ModeTransition::EnterBrowse);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    fn after(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    #[test]
    fn test_keystrokes_settle_once() {
        let start = Instant::now();
        let mut search = SearchCoordinator::new(DELAY, 3);

        search.input("I", start);
        search.input("Ir", after(start, 100));
        search.input("Iro", after(start, 200));
        assert_eq!(search.query().raw, "Iro");
        assert_eq!(search.query().settled, "");

        assert_eq!(search.settle(after(start, 600)), None);
        assert_eq!(
            search.settle(after(start, 700)),
            Some(ModeTransition::EnterSearch("Iro".to_string()))
        );
        assert_eq!(search.mode(), &SearchMode::Search("Iro".to_string()));
        assert_eq!(search.deadline(), None);
    }

    #[test]
    fn test_short_query_stays_in_browse() {
        let start = Instant::now();
        let mut search = SearchCoordinator::new(DELAY, 3);
        search.input("Ir", start);
        assert_eq!(search.settle(after(start, 500)), None);
        assert_eq!(search.query().settled, "Ir");
        assert_eq!(search.mode(), &SearchMode::Browse);
    }

    #[test]
    fn test_different_term_is_new_search() {
        let start = Instant::now();
        let mut search = SearchCoordinator::new(DELAY, 3);
        search.input("Iron", start);
        search.settle(after(start, 500));

        search.input("Thor", after(start, 1000));
        assert_eq!(
            search.settle(after(start, 1500)),
            Some(ModeTransition::EnterSearch("Thor".to_string()))
        );

        search.input("Thor", after(start, 2000));
        assert_eq!(search.settle(after(start, 2500)), None);
    }

    #[test]
    fn test_shrinking_below_threshold_enters_browse() {
        let start = Instant::now();
        let mut search = SearchCoordinator::new(DELAY, 3);
        search.input("Hulk", start);
        search.settle(after(start, 500));

        search.input("Hu", after(start, 1000));
        assert_eq!(search.mode(), &SearchMode::Search("Hulk".to_string()));
        assert_eq!(search.settle(after(start, 1500)), Some(ModeTransition::EnterBrowse));
        assert_eq!(search.mode(), &SearchMode::Browse);
    }

    #[test]
    fn test_clear_is_instant() {
        let start = Instant::now();
        let mut search = SearchCoordinator::new(DELAY, 3);
        search.input("Storm", start);
        search.settle(after(start, 500));

        search.input("Storm X", after(start, 600));
        assert_eq!(search.clear(), Some(ModeTransition::EnterBrowse));
        assert_eq!(search.query(), &QueryState::default());
        assert_eq!(search.deadline(), None);

        assert_eq!(search.clear(), None);
    }

    #[test]
    fn test_threshold_counts_chars() {
        let start = Instant::now();
        let mut search = SearchCoordinator::new(DELAY, 3);
        search.input("Né", start);
        assert_eq!(search.settle(after(start, 500)), None);
        search.input("Néo", after(start, 600));
        assert!(search.settle(after(start, 1100)).is_some());
    }
}
