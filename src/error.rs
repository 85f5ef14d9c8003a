//! Error types for the multisearch host.

use multisearch_core::SearchError;

/// Top-level error type for the host application.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Bad command line.
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The search engine rejected a request.
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// Event output could not be written.
    #[error("output error: {0}")]
    Output(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_error_converts() {
        let err: HostError = SearchError::InvalidRequest("two contributors".into()).into();
        assert_eq!(err.to_string(), "search error: invalid request: two contributors");
    }

    #[test]
    fn io_error_converts() {
        let err: HostError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
