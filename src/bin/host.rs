//! Command-line search host.
//!
//! Runs one search over the configured catalogs and writes every engine
//! event to stdout as newline-delimited JSON. Ctrl-C cancels the session.
//!
//! All tracing output goes to stderr so that stdout stays a clean NDJSON
//! stream.

use multisearch::{HostArgs, HostConfig, run_search};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("multisearch=info,multisearch_core=info")
            }),
        )
        .init();

    let args = HostArgs::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{}", multisearch::cli::USAGE);
        anyhow::anyhow!("{e}")
    })?;
    let config = HostConfig::load(args.config.as_deref())?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, cancelling search");
                cancel.cancel();
            }
        });
    }

    tracing::info!(sources = config.sources.len(), "multisearch-host starting");
    let summary = run_search(&config, &args.request(), std::io::stdout(), cancel)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "search failed");
            anyhow::anyhow!("multisearch-host failed: {e}")
        })?;

    let truncated: Vec<&str> = summary
        .has_more
        .iter()
        .filter(|(_, more)| **more)
        .map(|(id, _)| id.as_str())
        .collect();
    tracing::info!(
        results = summary.results.len(),
        ?truncated,
        cancelled = summary.cancelled,
        "multisearch-host done"
    );
    Ok(())
}
