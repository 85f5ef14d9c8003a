//! Session entry point: fans a pattern out to contributors.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::accumulator::ResultsAccumulator;
use crate::config::{ResultLayout, SearchConfig};
use crate::contributor::Contributor;
use crate::equality::{compose, EqualityProvider};
use crate::error::{Result, SearchError};
use crate::handle::SearchHandle;
use crate::listener::{HasMoreMap, SearchListener};
use crate::notify::Notifier;
use crate::types::{ContributorInfo, FoundItem};
use crate::worker::{join_workers, Countdown, WorkerTask};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// A contributor paired with the number of items it may contribute.
pub type ContributorLimit<T> = (Arc<dyn Contributor<T>>, usize);

/// Starts search sessions against a fixed listener and equality chain.
///
/// Each session gets its own accumulator, one blocking worker per
/// contributor, a joiner task and a notification dispatcher, all hosted on
/// the searcher's tokio runtime.
pub struct Searcher<T> {
    config: SearchConfig,
    listener: Arc<dyn SearchListener<T>>,
    equality: Arc<dyn EqualityProvider<T>>,
    runtime: Handle,
}

impl<T: Send + Sync + 'static> Searcher<T> {
    /// Create a searcher on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for an invalid configuration and
    /// [`SearchError::Runtime`] when called outside a runtime.
    pub fn new(config: SearchConfig, listener: Arc<dyn SearchListener<T>>) -> Result<Self> {
        let runtime =
            Handle::try_current().map_err(|e| SearchError::Runtime(e.to_string()))?;
        Self::with_runtime(config, listener, runtime)
    }

    pub fn with_runtime(
        config: SearchConfig,
        listener: Arc<dyn SearchListener<T>>,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            listener,
            equality: Arc::new(compose(Vec::new())),
            runtime,
        })
    }

    /// Replace the deduplication chain. Order is priority: the first
    /// provider with an opinion decides.
    pub fn with_equality_providers(mut self, providers: Vec<Arc<dyn EqualityProvider<T>>>) -> Self {
        self.equality = Arc::new(compose(providers));
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Start a new session.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidRequest`] for a zero limit or a
    /// contributor id listed twice.
    pub fn search(
        &self,
        contributors: Vec<ContributorLimit<T>>,
        pattern: &str,
    ) -> Result<SearchHandle<T>> {
        self.start(contributors, pattern, Vec::new())
    }

    /// Continue a finished search for more results of one contributor.
    ///
    /// `already_found` seeds the new session: the contributor's own items
    /// keep their place on top of its new limit, items of other contributors
    /// only take part in deduplication.
    ///
    /// # Errors
    ///
    /// With the grouped layout, naming more than one contributor is
    /// rejected with [`SearchError::InvalidRequest`].
    pub fn find_more_items(
        &self,
        already_found: Vec<Arc<FoundItem<T>>>,
        contributors: Vec<ContributorLimit<T>>,
        pattern: &str,
    ) -> Result<SearchHandle<T>> {
        if self.config.layout == ResultLayout::Grouped && contributors.len() > 1 {
            return Err(SearchError::InvalidRequest(format!(
                "find_more_items expands one contributor at a time, got {}",
                contributors.len()
            )));
        }
        self.start(contributors, pattern, already_found)
    }

    fn start(
        &self,
        contributors: Vec<ContributorLimit<T>>,
        pattern: &str,
        seed: Vec<Arc<FoundItem<T>>>,
    ) -> Result<SearchHandle<T>> {
        let mut seen = HashSet::new();
        for (contributor, limit) in &contributors {
            if *limit == 0 {
                return Err(SearchError::InvalidRequest(format!(
                    "limit for contributor {} must be greater than 0",
                    contributor.id()
                )));
            }
            if !seen.insert(contributor.id().to_string()) {
                return Err(SearchError::InvalidRequest(format!(
                    "contributor {} listed more than once",
                    contributor.id()
                )));
            }
        }

        let requested = contributors.len();
        let contributors: Vec<ContributorLimit<T>> = contributors
            .into_iter()
            .filter(|(contributor, _)| {
                contributor.supports_empty_pattern()
                    || !contributor.filter_control_symbols(pattern).trim().is_empty()
            })
            .collect();

        let session_id = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
        let span = tracing::info_span!(
            "search_session",
            session = session_id,
            pattern_len = pattern.chars().count(),
            contributors = contributors.len(),
        );
        let _entered = span.enter();

        let infos: Vec<ContributorInfo> = contributors
            .iter()
            .map(|(contributor, _)| contributor.info())
            .collect();

        if contributors.is_empty() {
            tracing::debug!(requested, "no contributor accepts this pattern");
            self.listener.search_started(pattern, &infos);
            self.listener.search_finished(&HasMoreMap::new());
            return Ok(SearchHandle::stopped());
        }
        if contributors.len() < requested {
            tracing::debug!(
                dropped = requested - contributors.len(),
                "contributors skipped for empty pattern"
            );
        }

        self.listener.search_started(pattern, &infos);

        let session = CancellationToken::new();
        let completed = CancellationToken::new();
        let notifier = Notifier::spawn(
            &self.runtime,
            Arc::clone(&self.listener),
            session.clone(),
            completed.clone(),
        );
        let limits: Vec<(ContributorInfo, usize)> = infos
            .iter()
            .cloned()
            .zip(contributors.iter().map(|(_, limit)| *limit))
            .collect();
        let accumulator = Arc::new(ResultsAccumulator::new(
            self.config.layout,
            &limits,
            seed,
            Arc::clone(&self.equality),
            notifier,
            session.clone(),
            self.config.poll_interval(),
        ));

        let countdown = Countdown::new(contributors.len());
        let pattern: Arc<str> = Arc::from(pattern);
        for ((contributor, _), info) in contributors.into_iter().zip(infos) {
            let worker_span = tracing::debug_span!(parent: &span, "contributor", id = %info.id);
            let task = WorkerTask {
                contributor,
                info,
                pattern: Arc::clone(&pattern),
                accumulator: Arc::clone(&accumulator),
                session: session.clone(),
                max_restarts: self.config.max_fetch_restarts,
            };
            let done = countdown.guard();
            self.runtime.spawn_blocking(move || {
                let _entered = worker_span.enter();
                task.run(done);
            });
        }

        self.runtime.spawn(
            join_workers(countdown, Arc::clone(&accumulator), session.clone())
                .instrument(span.clone()),
        );
        tracing::info!("search started");

        Ok(SearchHandle::new(
            session,
            completed,
            accumulator,
            Arc::clone(&self.listener),
        ))
    }
}
