//! Search event consumers and the decorators that protect slow ones.
//!
//! A [`SearchListener`] receives every session event on the session's
//! notification dispatcher, never under the accumulator lock. Two
//! decorators batch bursts from many workers:
//!
//! - [`ThrottlingListener`] coalesces add/remove events on a short timer.
//! - [`WaitForSourcesListener`] holds the first paint until every fast
//!   contributor has filled up or finished, or a timeout elapses.

mod buffer;
mod throttle;
mod wait;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::types::{ContributorId, ContributorInfo, FoundItem};

pub use throttle::ThrottlingListener;
pub use wait::WaitForSourcesListener;

/// Per-contributor "results were truncated" flags reported at the end of a search.
pub type HasMoreMap = HashMap<ContributorId, bool>;

/// Consumer of search session events.
///
/// Calls for one session arrive sequentially from a single dispatcher, in
/// the order the accumulator produced them.
pub trait SearchListener<T>: Send + Sync {
    fn search_started(&self, pattern: &str, contributors: &[ContributorInfo]);

    fn elements_added(&self, items: &[Arc<FoundItem<T>>]);

    fn elements_removed(&self, items: &[Arc<FoundItem<T>>]);

    /// The contributor's section is full and its producer is blocked.
    fn contributor_waits(&self, contributor: &ContributorInfo);

    fn contributor_finished(&self, contributor: &ContributorInfo, has_more: bool);

    /// Results from every fast contributor are in; the consumer may freeze
    /// what it shows. Delivered at most once per session, and only by
    /// [`WaitForSourcesListener`].
    fn first_results_ready(&self) {}

    fn search_finished(&self, has_more: &HasMoreMap);

    /// The caller cancelled the session. Nothing else arrives for it, and
    /// decorators drop whatever they still hold.
    fn search_cancelled(&self) {}
}

/// One listener callback captured as a value.
#[derive(Debug)]
pub enum SearchEvent<T> {
    Started {
        pattern: String,
        contributors: Vec<ContributorInfo>,
    },
    Added(Vec<Arc<FoundItem<T>>>),
    Removed(Vec<Arc<FoundItem<T>>>),
    ContributorWaits(ContributorInfo),
    ContributorFinished {
        contributor: ContributorInfo,
        has_more: bool,
    },
    FirstResultsReady,
    Finished(HasMoreMap),
    Cancelled,
}

impl<T> Clone for SearchEvent<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Started {
                pattern,
                contributors,
            } => Self::Started {
                pattern: pattern.clone(),
                contributors: contributors.clone(),
            },
            Self::Added(items) => Self::Added(items.clone()),
            Self::Removed(items) => Self::Removed(items.clone()),
            Self::ContributorWaits(contributor) => Self::ContributorWaits(contributor.clone()),
            Self::ContributorFinished {
                contributor,
                has_more,
            } => Self::ContributorFinished {
                contributor: contributor.clone(),
                has_more: *has_more,
            },
            Self::FirstResultsReady => Self::FirstResultsReady,
            Self::Finished(has_more) => Self::Finished(has_more.clone()),
            Self::Cancelled => Self::Cancelled,
        }
    }
}

impl<T> SearchEvent<T> {
    /// Replay this event onto `listener`.
    pub fn deliver(&self, listener: &dyn SearchListener<T>) {
        match self {
            Self::Started {
                pattern,
                contributors,
            } => listener.search_started(pattern, contributors),
            Self::Added(items) => listener.elements_added(items),
            Self::Removed(items) => listener.elements_removed(items),
            Self::ContributorWaits(contributor) => listener.contributor_waits(contributor),
            Self::ContributorFinished {
                contributor,
                has_more,
            } => listener.contributor_finished(contributor, *has_more),
            Self::FirstResultsReady => listener.first_results_ready(),
            Self::Finished(has_more) => listener.search_finished(has_more),
            Self::Cancelled => listener.search_cancelled(),
        }
    }

    /// Short stable name, used in logs and by the host's JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "search_started",
            Self::Added(_) => "elements_added",
            Self::Removed(_) => "elements_removed",
            Self::ContributorWaits(_) => "contributor_waits",
            Self::ContributorFinished { .. } => "contributor_finished",
            Self::FirstResultsReady => "first_results_ready",
            Self::Finished(_) => "search_finished",
            Self::Cancelled => "search_cancelled",
        }
    }
}

/// Listener that records every callback for later inspection.
pub struct EventCollector<T> {
    events: Mutex<Vec<SearchEvent<T>>>,
}

impl<T> Default for EventCollector<T> {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

impl<T> EventCollector<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: SearchEvent<T>) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<SearchEvent<T>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<SearchEvent<T>> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Number of recorded events of the given [`SearchEvent::kind`].
    pub fn count(&self, kind: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }
}

impl<T: Send + Sync> SearchListener<T> for EventCollector<T> {
    fn search_started(&self, pattern: &str, contributors: &[ContributorInfo]) {
        self.record(SearchEvent::Started {
            pattern: pattern.to_string(),
            contributors: contributors.to_vec(),
        });
    }

    fn elements_added(&self, items: &[Arc<FoundItem<T>>]) {
        self.record(SearchEvent::Added(items.to_vec()));
    }

    fn elements_removed(&self, items: &[Arc<FoundItem<T>>]) {
        self.record(SearchEvent::Removed(items.to_vec()));
    }

    fn contributor_waits(&self, contributor: &ContributorInfo) {
        self.record(SearchEvent::ContributorWaits(contributor.clone()));
    }

    fn contributor_finished(&self, contributor: &ContributorInfo, has_more: bool) {
        self.record(SearchEvent::ContributorFinished {
            contributor: contributor.clone(),
            has_more,
        });
    }

    fn first_results_ready(&self) {
        self.record(SearchEvent::FirstResultsReady);
    }

    fn search_finished(&self, has_more: &HasMoreMap) {
        self.record(SearchEvent::Finished(has_more.clone()));
    }

    fn search_cancelled(&self) {
        self.record(SearchEvent::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]

    use super::*;

    #[test]
    fn collector_records_in_order() {
        let collector = EventCollector::<u32>::new();
        let info = ContributorInfo::new("files", 0);
        collector.search_started("abc", std::slice::from_ref(&info));
        collector.elements_added(&[Arc::new(FoundItem::new(7, 1, info.clone()))]);
        collector.contributor_finished(&info, false);
        collector.search_finished(&HasMoreMap::new());

        let kinds: Vec<&str> = collector.events().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "search_started",
                "elements_added",
                "contributor_finished",
                "search_finished"
            ]
        );
        assert_eq!(collector.count("elements_added"), 1);
    }

    #[test]
    fn take_drains_the_log() {
        let collector = EventCollector::<u32>::new();
        collector.first_results_ready();
        assert_eq!(collector.take().len(), 1);
        assert!(collector.events().is_empty());
    }

    #[test]
    fn deliver_replays_onto_another_listener() {
        let source = EventCollector::<u32>::new();
        let info = ContributorInfo::new("a", 0);
        source.contributor_waits(&info);
        source.contributor_finished(&info, true);

        let replica = EventCollector::<u32>::new();
        for event in source.events() {
            event.deliver(&replica);
        }
        match &replica.events()[1] {
            SearchEvent::ContributorFinished { has_more, .. } => assert!(*has_more),
            other => panic!("unexpected event {}", other.kind()),
        }
    }
}
