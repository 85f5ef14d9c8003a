//! Holds the first paint until the fast contributors are done.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;

use super::buffer::EventBuffer;
use super::{HasMoreMap, SearchEvent, SearchListener};
use crate::error::{Result, SearchError};
use crate::types::{ContributorId, ContributorInfo, FoundItem};

/// Buffers everything until each non-slow contributor has reported
/// `contributor_waits` or `contributor_finished`, then flushes at once and
/// signals [`SearchListener::first_results_ready`].
///
/// If that never happens within `timeout`, the same release is forced and
/// the contributors still pending are logged. After the release, events are
/// throttled like [`super::ThrottlingListener`] does. `search_cancelled`
/// drops everything held and suppresses the release.
pub struct WaitForSourcesListener<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    delegate: Arc<dyn SearchListener<T>>,
    throttle: Duration,
    timeout: Duration,
    runtime: Handle,
    state: Mutex<State<T>>,
}

struct State<T> {
    buffer: EventBuffer<T>,
    generation: u64,
    flush_scheduled: bool,
    pending: HashSet<ContributorId>,
    released: bool,
    cancelled: bool,
}

impl<T: Send + Sync + 'static> WaitForSourcesListener<T> {
    /// # Errors
    ///
    /// Returns [`SearchError::Runtime`] when called outside a tokio runtime.
    pub fn new(
        delegate: Arc<dyn SearchListener<T>>,
        throttle: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let runtime =
            Handle::try_current().map_err(|e| SearchError::Runtime(e.to_string()))?;
        Ok(Self::with_runtime(delegate, throttle, timeout, runtime))
    }

    pub fn with_runtime(
        delegate: Arc<dyn SearchListener<T>>,
        throttle: Duration,
        timeout: Duration,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                delegate,
                throttle,
                timeout,
                runtime,
                state: Mutex::new(State {
                    buffer: EventBuffer::default(),
                    generation: 0,
                    flush_scheduled: false,
                    pending: HashSet::new(),
                    released: true,
                    cancelled: false,
                }),
            }),
        }
    }

    fn schedule_flush(&self, state: &mut State<T>) {
        if state.flush_scheduled {
            return;
        }
        state.flush_scheduled = true;
        let generation = state.generation;
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            tokio::time::sleep(inner.throttle).await;
            inner.flush_if_current(generation);
        });
    }

    fn schedule_timeout(&self, generation: u64) {
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            tokio::time::sleep(inner.timeout).await;
            let mut state = inner.lock();
            if state.generation != generation || state.released {
                return;
            }
            let mut pending: Vec<&str> = state.pending.iter().map(ContributorId::as_str).collect();
            pending.sort_unstable();
            tracing::warn!(
                ?pending,
                timeout_ms = inner.timeout.as_millis() as u64,
                "contributors did not finish in time"
            );
            inner.release(&mut state);
        });
    }

    fn buffer(&self, apply: impl FnOnce(&mut EventBuffer<T>)) {
        let mut state = self.inner.lock();
        if state.cancelled {
            return;
        }
        apply(&mut state.buffer);
        if state.released {
            self.schedule_flush(&mut state);
        }
    }

    fn contributor_done(&self, contributor: &ContributorId, event: SearchEvent<T>) {
        let mut state = self.inner.lock();
        if state.cancelled {
            return;
        }
        state.buffer.push_event(event);
        state.pending.remove(contributor);
        if state.released {
            self.schedule_flush(&mut state);
        } else if state.pending.is_empty() {
            tracing::debug!("fast contributors done, releasing first results");
            self.inner.release(&mut state);
        }
    }
}

impl<T> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn release(&self, state: &mut State<T>) {
        state.released = true;
        state.flush_scheduled = false;
        state.buffer.drain().deliver(self.delegate.as_ref());
        self.delegate.first_results_ready();
    }

    fn flush_if_current(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation || !state.flush_scheduled {
            return;
        }
        state.flush_scheduled = false;
        state.buffer.drain().deliver(self.delegate.as_ref());
    }
}

impl<T: Send + Sync + 'static> SearchListener<T> for WaitForSourcesListener<T> {
    fn search_started(&self, pattern: &str, contributors: &[ContributorInfo]) {
        let mut state = self.inner.lock();
        state.buffer.clear();
        state.generation += 1;
        state.flush_scheduled = false;
        state.pending = contributors
            .iter()
            .filter(|contributor| !contributor.slow)
            .map(|contributor| contributor.id.clone())
            .collect();
        state.released = false;
        state.cancelled = false;
        self.inner.delegate.search_started(pattern, contributors);

        if state.pending.is_empty() {
            self.inner.release(&mut state);
        } else {
            self.schedule_timeout(state.generation);
        }
    }

    fn elements_added(&self, items: &[Arc<FoundItem<T>>]) {
        self.buffer(|buffer| buffer.add(items));
    }

    fn elements_removed(&self, items: &[Arc<FoundItem<T>>]) {
        self.buffer(|buffer| buffer.remove(items));
    }

    fn contributor_waits(&self, contributor: &ContributorInfo) {
        self.contributor_done(
            &contributor.id,
            SearchEvent::ContributorWaits(contributor.clone()),
        );
    }

    fn contributor_finished(&self, contributor: &ContributorInfo, has_more: bool) {
        self.contributor_done(
            &contributor.id,
            SearchEvent::ContributorFinished {
                contributor: contributor.clone(),
                has_more,
            },
        );
    }

    fn search_finished(&self, has_more: &HasMoreMap) {
        let mut state = self.inner.lock();
        if state.cancelled {
            return;
        }
        state.generation += 1;
        if state.released {
            state.flush_scheduled = false;
            state.buffer.drain().deliver(self.inner.delegate.as_ref());
        } else {
            self.inner.release(&mut state);
        }
        self.inner.delegate.search_finished(has_more);
    }

    fn search_cancelled(&self) {
        let mut state = self.inner.lock();
        if state.cancelled {
            return;
        }
        state.cancelled = true;
        state.released = true;
        state.generation += 1;
        state.flush_scheduled = false;
        state.pending.clear();
        state.buffer.clear();
        self.inner.delegate.search_cancelled();
    }
}
