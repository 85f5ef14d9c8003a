//! One host search run: build the pipeline, search, optionally expand a source.

use std::io::Write;
use std::sync::Arc;

use multisearch_core::{
    Contributor, ContributorLimit, EqualityProvider, HasMoreMap, KeyEqualityProvider,
    SearchHandle, SearchListener, Searcher, ThrottlingListener, WaitForSourcesListener,
};
use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogContributor;
use crate::config::{HostConfig, ListenerMode};
use crate::error::{HostError, Result};
use crate::output::JsonLinesListener;

/// What to search for.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub pattern: String,
    /// Source to expand with a follow-up `find_more_items` call.
    pub more: Option<String>,
}

/// Outcome of a run, for the caller's logs and exit status.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Accepted entries of the last session, in presentation order.
    pub results: Vec<String>,
    pub has_more: HasMoreMap,
    pub cancelled: bool,
}

/// Wrap `output` in the decorator selected by `mode`.
///
/// # Errors
///
/// Returns [`HostError::Search`] when no tokio runtime is available.
pub fn build_listener<T: Send + Sync + 'static>(
    mode: ListenerMode,
    output: Arc<dyn SearchListener<T>>,
    config: &HostConfig,
) -> Result<Arc<dyn SearchListener<T>>> {
    let listener: Arc<dyn SearchListener<T>> = match mode {
        ListenerMode::Direct => output,
        ListenerMode::Throttled => Arc::new(ThrottlingListener::new(
            output,
            config.search.throttle_delay(),
        )?),
        ListenerMode::WaitForSources => Arc::new(WaitForSourcesListener::new(
            output,
            config.search.throttle_delay(),
            config.search.wait_timeout(),
        )?),
    };
    Ok(listener)
}

/// Case-insensitive text equality across sources.
pub fn text_equality() -> Arc<dyn EqualityProvider<String>> {
    Arc::new(KeyEqualityProvider::new(|text: &String| {
        Some(text.trim().to_lowercase())
    }))
}

fn contributors(config: &HostConfig) -> Vec<ContributorLimit<String>> {
    config
        .sources
        .iter()
        .map(|source| {
            let contributor: Arc<dyn Contributor<String>> =
                Arc::new(CatalogContributor::from_config(source));
            (contributor, source.limit)
        })
        .collect()
}

/// Run one search, writing every event to `out` as NDJSON.
///
/// Cancelling `cancel` cancels the running session; the summary then
/// reports `cancelled` and whatever was accepted so far.
///
/// # Errors
///
/// Returns an error for an invalid configuration, an unknown `more`
/// source, a rejected request, or when the event output failed.
pub async fn run_search<W>(
    config: &HostConfig,
    request: &SearchRequest,
    out: W,
    cancel: CancellationToken,
) -> Result<RunSummary>
where
    W: Write + Send + 'static,
{
    config.validate()?;
    let more = match &request.more {
        Some(id) => Some(config.source(id).ok_or_else(|| {
            HostError::Config(format!("unknown source for --more: {id}"))
        })?),
        None => None,
    };

    let output = Arc::new(JsonLinesListener::new(out));
    let listener = build_listener(
        config.listener,
        Arc::clone(&output) as Arc<dyn SearchListener<String>>,
        config,
    )?;
    let mut searcher = Searcher::new(config.search.clone(), listener)?;
    if config.dedup {
        searcher = searcher.with_equality_providers(vec![text_equality()]);
    }

    let handle = searcher.search(contributors(config), &request.pattern)?;
    let mut cancelled = !wait_or_cancel(&handle, &cancel).await;
    let mut last = handle;

    if let (Some(source), false) = (more, cancelled) {
        tracing::info!(source = %source.id, "expanding source");
        let contributor: Arc<dyn Contributor<String>> =
            Arc::new(CatalogContributor::from_config(source));
        let expanded = searcher.find_more_items(
            last.results(),
            vec![(contributor, source.limit)],
            &request.pattern,
        )?;
        cancelled = !wait_or_cancel(&expanded, &cancel).await;
        last = expanded;
    }

    if let Some(error) = output.take_error() {
        return Err(HostError::Output(error));
    }

    Ok(RunSummary {
        results: last.results().iter().map(|item| item.element.clone()).collect(),
        has_more: last.has_more(),
        cancelled,
    })
}

/// Wait for the session; returns `false` if it had to be cancelled.
async fn wait_or_cancel(handle: &SearchHandle<String>, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = handle.wait() => !handle.is_cancelled(),
        () = cancel.cancelled() => {
            handle.cancel();
            handle.wait().await;
            false
        }
    }
}
