//! Timer-based coalescing of add/remove bursts.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;

use super::buffer::EventBuffer;
use super::{HasMoreMap, SearchEvent, SearchListener};
use crate::error::{Result, SearchError};
use crate::types::{ContributorInfo, FoundItem};

/// Buffers events and forwards them to the delegate at most once per
/// `delay`, as one add batch and one remove batch.
///
/// `search_started` discards anything buffered from a previous session;
/// `search_finished` flushes immediately before being forwarded, and
/// `search_cancelled` discards the buffer without flushing. The
/// delegate is always called with the decorator's lock held, so it sees
/// one call at a time.
pub struct ThrottlingListener<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    delegate: Arc<dyn SearchListener<T>>,
    delay: Duration,
    runtime: Handle,
    state: Mutex<State<T>>,
}

struct State<T> {
    buffer: EventBuffer<T>,
    /// Bumped whenever pending timers must be ignored.
    generation: u64,
    flush_scheduled: bool,
    /// Set by `search_cancelled` until the next `search_started`.
    cancelled: bool,
}

impl<T: Send + Sync + 'static> ThrottlingListener<T> {
    /// Wrap `delegate`, scheduling flushes on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Runtime`] when called outside a runtime.
    pub fn new(delegate: Arc<dyn SearchListener<T>>, delay: Duration) -> Result<Self> {
        let runtime =
            Handle::try_current().map_err(|e| SearchError::Runtime(e.to_string()))?;
        Ok(Self::with_runtime(delegate, delay, runtime))
    }

    pub fn with_runtime(
        delegate: Arc<dyn SearchListener<T>>,
        delay: Duration,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                delegate,
                delay,
                runtime,
                state: Mutex::new(State {
                    buffer: EventBuffer::default(),
                    generation: 0,
                    flush_scheduled: false,
                    cancelled: false,
                }),
            }),
        }
    }

    fn buffer(&self, apply: impl FnOnce(&mut EventBuffer<T>)) {
        let mut state = self.inner.lock();
        if state.cancelled {
            return;
        }
        apply(&mut state.buffer);
        if !state.flush_scheduled {
            state.flush_scheduled = true;
            let generation = state.generation;
            let inner = Arc::clone(&self.inner);
            self.inner.runtime.spawn(async move {
                tokio::time::sleep(inner.delay).await;
                inner.flush_if_current(generation);
            });
        }
    }
}

impl<T> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn flush_if_current(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        state.flush_scheduled = false;
        let flush = state.buffer.drain();
        flush.deliver(self.delegate.as_ref());
    }
}

impl<T: Send + Sync + 'static> SearchListener<T> for ThrottlingListener<T> {
    fn search_started(&self, pattern: &str, contributors: &[ContributorInfo]) {
        let mut state = self.inner.lock();
        state.buffer.clear();
        state.generation += 1;
        state.flush_scheduled = false;
        state.cancelled = false;
        self.inner.delegate.search_started(pattern, contributors);
    }

    fn elements_added(&self, items: &[Arc<FoundItem<T>>]) {
        self.buffer(|buffer| buffer.add(items));
    }

    fn elements_removed(&self, items: &[Arc<FoundItem<T>>]) {
        self.buffer(|buffer| buffer.remove(items));
    }

    fn contributor_waits(&self, contributor: &ContributorInfo) {
        self.buffer(|buffer| buffer.push_event(SearchEvent::ContributorWaits(contributor.clone())));
    }

    fn contributor_finished(&self, contributor: &ContributorInfo, has_more: bool) {
        self.buffer(|buffer| {
            buffer.push_event(SearchEvent::ContributorFinished {
                contributor: contributor.clone(),
                has_more,
            })
        });
    }

    fn search_finished(&self, has_more: &HasMoreMap) {
        let mut state = self.inner.lock();
        if state.cancelled {
            return;
        }
        state.generation += 1;
        state.flush_scheduled = false;
        let flush = state.buffer.drain();
        flush.deliver(self.inner.delegate.as_ref());
        self.inner.delegate.search_finished(has_more);
    }

    fn search_cancelled(&self) {
        let mut state = self.inner.lock();
        if state.cancelled {
            return;
        }
        state.cancelled = true;
        state.generation += 1;
        state.flush_scheduled = false;
        state.buffer.clear();
        self.inner.delegate.search_cancelled();
    }
}
