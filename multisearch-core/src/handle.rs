//! Caller-side control of a running search session.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::accumulator::ResultsAccumulator;
use crate::listener::{HasMoreMap, SearchListener};
use crate::types::FoundItem;

/// Handle to one search session.
///
/// Dropping the handle does not cancel the session; call
/// [`SearchHandle::cancel`] for that.
pub struct SearchHandle<T> {
    session: CancellationToken,
    completed: CancellationToken,
    accumulator: Option<Arc<ResultsAccumulator<T>>>,
    listener: Option<Arc<dyn SearchListener<T>>>,
}

impl<T> Clone for SearchHandle<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            completed: self.completed.clone(),
            accumulator: self.accumulator.clone(),
            listener: self.listener.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> SearchHandle<T> {
    pub(crate) fn new(
        session: CancellationToken,
        completed: CancellationToken,
        accumulator: Arc<ResultsAccumulator<T>>,
        listener: Arc<dyn SearchListener<T>>,
    ) -> Self {
        Self {
            session,
            completed,
            accumulator: Some(accumulator),
            listener: Some(listener),
        }
    }

    /// A session that completed before it started: nothing to search.
    pub(crate) fn stopped() -> Self {
        let completed = CancellationToken::new();
        completed.cancel();
        Self {
            session: CancellationToken::new(),
            completed,
            accumulator: None,
            listener: None,
        }
    }

    /// Cancel the session.
    ///
    /// No further `elements_added`/`elements_removed` reaches the listener,
    /// blocked producers are released within one poll interval and the
    /// joiner stops without reporting `search_finished`. The first call
    /// also tells the listener through
    /// [`SearchListener::search_cancelled`], so batching decorators drop
    /// what they hold. Idempotent.
    pub fn cancel(&self) {
        let first = !self.session.is_cancelled();
        self.session.cancel();
        if let Some(accumulator) = &self.accumulator {
            accumulator.stop();
        }
        if !first {
            return;
        }
        if let Some(listener) = &self.listener {
            listener.search_cancelled();
        }
        tracing::debug!("search cancelled by caller");
    }

    pub fn is_cancelled(&self) -> bool {
        self.session.is_cancelled()
    }

    /// True once the session delivered its last event, or was cancelled
    /// and its dispatcher stopped.
    pub fn is_finished(&self) -> bool {
        self.completed.is_cancelled()
    }

    /// Resolves when [`SearchHandle::is_finished`] becomes true.
    pub async fn wait(&self) {
        self.completed.cancelled().await;
    }

    /// Items accepted so far, in presentation order.
    pub fn results(&self) -> Vec<Arc<FoundItem<T>>> {
        self.accumulator
            .as_ref()
            .map(|accumulator| accumulator.snapshot())
            .unwrap_or_default()
    }

    /// Current truncation flags per searched contributor.
    pub fn has_more(&self) -> HasMoreMap {
        self.accumulator
            .as_ref()
            .map(|accumulator| accumulator.has_more_map())
            .unwrap_or_default()
    }
}
