//! Error types for the sift-retrieval crate.
//!
//! All errors use stable string messages suitable for display to API
//! consumers and programmatic handling. Tenant identifiers may appear in
//! messages; query text never does.

/// Errors that can occur during retrieval orchestration.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Every retrieval branch failed or timed out — nothing to fuse.
    #[error("all retrieval sources failed: {0}")]
    RetrievalFailed(String),

    /// An operation exceeded its deadline budget.
    #[error("deadline exceeded: {0}")]
    Timeout(String),

    /// A circuit breaker rejected the call without attempting it.
    #[error("circuit open: {0}")]
    CircuitOpen(String),

    /// The document store returned an error.
    #[error("document store error: {0}")]
    Store(String),

    /// The generative backend returned an error.
    #[error("generation error: {0}")]
    Generation(String),

    /// Invalid configuration or request parameters.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for sift-retrieval results.
pub type Result<T> = std::result::Result<T, SearchError>;
