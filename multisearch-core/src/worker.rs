//! Per-contributor worker and the joiner that ends the session.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::accumulator::ResultsAccumulator;
use crate::contributor::{Contributor, ItemSink};
use crate::error::FetchError;
use crate::types::ContributorInfo;

/// Counts running workers down to zero.
pub(crate) struct Countdown {
    remaining: AtomicUsize,
    notify: Notify,
}

impl Countdown {
    pub(crate) fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(count),
            notify: Notify::new(),
        })
    }

    /// A guard that counts down once when dropped, however its owner exits.
    pub(crate) fn guard(self: &Arc<Self>) -> CountdownGuard {
        CountdownGuard(Arc::clone(self))
    }

    fn count_down(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.notify.notify_waiters();
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Resolves once the count reaches zero.
    pub(crate) async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.remaining() == 0 {
                return;
            }
            notified.await;
        }
    }
}

pub(crate) struct CountdownGuard(Arc<Countdown>);

impl Drop for CountdownGuard {
    fn drop(&mut self) {
        self.0.count_down();
    }
}

/// Drives one contributor's production into the shared accumulator.
pub(crate) struct WorkerTask<T> {
    pub(crate) contributor: Arc<dyn Contributor<T>>,
    pub(crate) info: ContributorInfo,
    pub(crate) pattern: Arc<str>,
    pub(crate) accumulator: Arc<ResultsAccumulator<T>>,
    pub(crate) session: CancellationToken,
    pub(crate) max_restarts: u32,
}

impl<T: Send + Sync + 'static> WorkerTask<T> {
    /// Run to completion on a blocking thread. `_done` is released on every
    /// exit path, including a panicking contributor.
    pub(crate) fn run(self, _done: CountdownGuard) {
        let mut restarts = 0u32;
        loop {
            if self.session.is_cancelled() {
                tracing::debug!("session cancelled before fetch");
                return;
            }
            let attempt = self.session.child_token();
            let mut sink = ItemSink::new(
                &self.accumulator,
                self.contributor.as_ref(),
                &self.info,
                &self.pattern,
                &self.session,
            );
            let outcome = self.contributor.fetch(&self.pattern, &attempt, &mut sink);
            let accepted = sink.accepted();

            match outcome {
                Ok(()) => {
                    tracing::debug!(accepted, "contributor exhausted");
                    break;
                }
                Err(FetchError::Cancelled) if self.session.is_cancelled() => return,
                Err(FetchError::Cancelled) => {
                    restarts += 1;
                    if restarts > self.max_restarts {
                        tracing::warn!(restarts, "contributor keeps cancelling, giving up");
                        break;
                    }
                    tracing::debug!(restarts, "contributor cancelled its fetch, restarting");
                }
                Err(FetchError::Failed(reason)) => {
                    tracing::warn!(%reason, accepted, "contributor failed");
                    break;
                }
            }
        }

        if self.session.is_cancelled() {
            return;
        }
        self.accumulator.source_finished(&self.info.id);
    }
}

/// Wait for every worker, or for cancellation, then end the session.
pub(crate) async fn join_workers<T: Send + Sync + 'static>(
    countdown: Arc<Countdown>,
    accumulator: Arc<ResultsAccumulator<T>>,
    session: CancellationToken,
) {
    tokio::select! {
        biased;
        () = session.cancelled() => {
            tracing::debug!(running = countdown.remaining(), "search cancelled");
        }
        () = countdown.wait() => {
            accumulator.stop();
            let has_more = accumulator.has_more_map();
            let truncated = has_more.values().filter(|more| **more).count();
            tracing::info!(
                results = accumulator.snapshot().len(),
                truncated,
                "search finished"
            );
            accumulator.notifier().search_finished(has_more);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use std::time::Duration;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn countdown_resolves_after_every_guard_drops() {
        let countdown = Countdown::new(3);
        let guards: Vec<CountdownGuard> = (0..3).map(|_| countdown.guard()).collect();

        let waiter = {
            let countdown = Arc::clone(&countdown);
            tokio::spawn(async move { countdown.wait().await })
        };
        for guard in guards {
            tokio::time::sleep(Duration::from_millis(5)).await;
            drop(guard);
        }
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("countdown reached zero")
            .unwrap();
        assert_eq!(countdown.remaining(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn guard_counts_down_when_worker_panics() {
        let countdown = Countdown::new(1);
        let guard = countdown.guard();
        let result = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            panic!("contributor blew up");
        })
        .await;
        assert!(result.is_err());
        tokio::time::timeout(Duration::from_secs(1), countdown.wait())
            .await
            .expect("released by unwinding");
    }

    #[tokio::test]
    async fn zero_count_resolves_immediately() {
        Countdown::new(0).wait().await;
    }
}
