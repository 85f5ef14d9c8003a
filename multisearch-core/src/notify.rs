//! Notification executor: moves listener calls off the accumulator lock.
//!
//! Events are queued while the session lock is held, so queue order is lock
//! order, and a single dispatcher task delivers them afterwards. Delivery is
//! gated on the session token at dispatch time.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::listener::{HasMoreMap, SearchEvent, SearchListener};
use crate::types::{ContributorInfo, FoundItem};

/// Sending half of a session's event queue.
pub(crate) struct Notifier<T> {
    tx: mpsc::UnboundedSender<SearchEvent<T>>,
}

impl<T> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Notifier<T> {
    /// Start the dispatcher for one session.
    ///
    /// `completed` is cancelled when the dispatcher exits, whether it
    /// delivered `search_finished`, saw the session cancelled, or the
    /// listener panicked.
    pub(crate) fn spawn(
        runtime: &Handle,
        listener: Arc<dyn SearchListener<T>>,
        session: CancellationToken,
        completed: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(dispatch(rx, listener, session, completed));
        Self { tx }
    }

    /// A notifier whose events are kept for inspection instead of delivered.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<SearchEvent<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SearchEvent<T>) {
        // The dispatcher is gone once the session ended; late events are dropped.
        if self.tx.send(event).is_err() {
            tracing::trace!("event queue closed");
        }
    }

    pub(crate) fn elements_added(&self, items: Vec<Arc<FoundItem<T>>>) {
        if !items.is_empty() {
            self.send(SearchEvent::Added(items));
        }
    }

    pub(crate) fn elements_removed(&self, items: Vec<Arc<FoundItem<T>>>) {
        if !items.is_empty() {
            self.send(SearchEvent::Removed(items));
        }
    }

    pub(crate) fn contributor_waits(&self, contributor: ContributorInfo) {
        self.send(SearchEvent::ContributorWaits(contributor));
    }

    pub(crate) fn contributor_finished(&self, contributor: ContributorInfo, has_more: bool) {
        self.send(SearchEvent::ContributorFinished {
            contributor,
            has_more,
        });
    }

    pub(crate) fn search_finished(&self, has_more: HasMoreMap) {
        self.send(SearchEvent::Finished(has_more));
    }
}

struct CompleteOnDrop(CancellationToken);

impl Drop for CompleteOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

async fn dispatch<T>(
    mut rx: mpsc::UnboundedReceiver<SearchEvent<T>>,
    listener: Arc<dyn SearchListener<T>>,
    session: CancellationToken,
    completed: CancellationToken,
) {
    let _complete = CompleteOnDrop(completed);
    loop {
        let event = tokio::select! {
            biased;
            () = session.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        // Cancellation may have landed while this event was queued.
        if session.is_cancelled() {
            break;
        }
        let last = matches!(event, SearchEvent::Finished(_));
        tracing::trace!(event = event.kind(), "dispatching");
        event.deliver(listener.as_ref());
        if last {
            break;
        }
    }
}
