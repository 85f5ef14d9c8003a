//! Error types for the multisearch-core crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. Search patterns never appear in error
//! messages.

/// Errors returned at the search call boundary.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A request was rejected before any worker was started.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No async runtime was available to host the session tasks.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Outcome of a single contributor fetch attempt that did not run to
/// exhaustion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The contributor abandoned this attempt on its own and wants to be
    /// restarted. Distinct from session cancellation.
    #[error("fetch cancelled by contributor")]
    Cancelled,

    /// The contributor failed. The session continues without it.
    #[error("fetch failed: {0}")]
    Failed(String),
}

/// Convenience type alias for multisearch-core results.
pub type Result<T> = std::result::Result<T, SearchError>;
