//! Trait definition for pluggable result sources.
//!
//! Each source implements [`Contributor`] to produce its items lazily into
//! an [`ItemSink`]. The engine runs every contributor on its own blocking
//! worker, so `fetch` may block, but it should check the cancellation token
//! between items.

use tokio_util::sync::CancellationToken;

use crate::accumulator::{AddOutcome, ResultsAccumulator};
use crate::error::FetchError;
use crate::types::{ContributorInfo, Correction};

/// A pluggable result source.
///
/// All implementations must be `Send + Sync`; a contributor is shared with
/// its worker for the lifetime of one search session.
pub trait Contributor<T>: Send + Sync {
    /// Stable identity, unique within a session.
    fn id(&self) -> &str;

    /// Tie-break weight used when two items have equal priority.
    fn sort_weight(&self) -> i32 {
        0
    }

    /// Whether this contributor produces results for an empty pattern.
    fn supports_empty_pattern(&self) -> bool {
        false
    }

    /// Slow contributors are not waited for before the first paint.
    fn is_slow(&self) -> bool {
        false
    }

    /// Whether weights pushed through [`ItemSink::push_weighted`] are
    /// meaningful priorities. When `false`, [`Contributor::priority`] decides.
    fn supports_weights(&self) -> bool {
        false
    }

    /// Strips contributor-specific control symbols (command prefixes and
    /// the like) from the pattern. Used to decide whether the effective
    /// pattern is empty.
    fn filter_control_symbols(&self, pattern: &str) -> String {
        pattern.to_string()
    }

    /// Priority of an element for `pattern`; higher is better.
    fn priority(&self, _element: &T, _pattern: &str) -> i32 {
        0
    }

    /// Invalid elements are logged and skipped instead of accepted.
    fn is_valid(&self, _element: &T) -> bool {
        true
    }

    /// Produce elements for `pattern` into `sink` until exhausted, until the
    /// sink returns `false`, or until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Return [`FetchError::Cancelled`] to abandon this attempt and be
    /// restarted from scratch, or [`FetchError::Failed`] to give up.
    fn fetch(
        &self,
        pattern: &str,
        cancel: &CancellationToken,
        sink: &mut ItemSink<'_, T>,
    ) -> Result<(), FetchError>;

    /// Snapshot of the attributes the engine keeps after the session starts.
    fn info(&self) -> ContributorInfo {
        ContributorInfo::new(self.id(), self.sort_weight()).slow(self.is_slow())
    }
}

/// An element offered to the sink, with optional weight and correction.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub element: T,
    pub weight: Option<i32>,
    pub correction: Option<Correction>,
}

impl<T> Fetched<T> {
    pub fn new(element: T) -> Self {
        Self {
            element,
            weight: None,
            correction: None,
        }
    }

    pub fn weighted(element: T, weight: i32) -> Self {
        Self {
            element,
            weight: Some(weight),
            correction: None,
        }
    }

    pub fn with_correction(mut self, correction: Correction) -> Self {
        self.correction = Some(correction);
        self
    }
}

/// Receives one contributor's elements and feeds them into the session.
///
/// Every push returns `false` once the producer should stop: its section is
/// full and the session has settled, or the session was cancelled.
pub struct ItemSink<'a, T> {
    accumulator: &'a ResultsAccumulator<T>,
    contributor: &'a dyn Contributor<T>,
    info: &'a ContributorInfo,
    pattern: &'a str,
    session: &'a CancellationToken,
    accepted: usize,
}

impl<'a, T: Send + Sync + 'static> ItemSink<'a, T> {
    pub(crate) fn new(
        accumulator: &'a ResultsAccumulator<T>,
        contributor: &'a dyn Contributor<T>,
        info: &'a ContributorInfo,
        pattern: &'a str,
        session: &'a CancellationToken,
    ) -> Self {
        Self {
            accumulator,
            contributor,
            info,
            pattern,
            session,
            accepted: 0,
        }
    }

    /// Offer an element; priority comes from [`Contributor::priority`].
    pub fn push(&mut self, element: T) -> bool {
        self.offer(Fetched::new(element))
    }

    /// Offer an element with a contributor-computed weight.
    pub fn push_weighted(&mut self, element: T, weight: i32) -> bool {
        self.offer(Fetched::weighted(element, weight))
    }

    pub fn offer(&mut self, fetched: Fetched<T>) -> bool {
        if self.session.is_cancelled() {
            return false;
        }
        if !self.contributor.is_valid(&fetched.element) {
            tracing::warn!(contributor = %self.info.id, "skipping invalid item");
            return true;
        }

        let priority = match fetched.weight {
            Some(weight) if self.contributor.supports_weights() => weight,
            _ => self.contributor.priority(&fetched.element, self.pattern),
        };

        match self.accumulator.add_element(
            &self.info.id,
            fetched.element,
            priority,
            fetched.correction,
        ) {
            AddOutcome::Added | AddOutcome::Skipped => {
                self.accepted += 1;
                true
            }
            AddOutcome::Rejected => {
                self.accumulator.set_source_has_more(&self.info.id, true);
                false
            }
        }
    }

    /// Elements accepted (added or deduplicated away) through this sink.
    pub fn accepted(&self) -> usize {
        self.accepted
    }
}
