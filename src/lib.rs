//! # sift-retrieval
//!
//! Tenant-scoped hybrid retrieval core for Sift.
//!
//! This crate is the orchestration layer between an HTTP surface (not
//! included) and two external collaborators: a document store offering
//! dense and sparse ranked retrieval, and a streaming generative
//! backend. It compiles into the serving binary as a library
//! dependency.
//!
//! ## Design
//!
//! - Fans out dense + sparse retrieval concurrently and merges the
//!   rankings with Reciprocal Rank Fusion
//! - Per-dependency circuit breakers fail fast while a downstream is
//!   unhealthy; one trial call probes recovery after a cooldown
//! - Deadline budgets bound the fan-out (default 800ms) and summary
//!   generation (default 2s); stragglers are cancelled, not awaited
//! - Graceful degradation: a failing retrieval branch degrades result
//!   quality, a failing generation stage degrades to search-only —
//!   only both retrieval branches failing is user-visible
//! - Optional in-memory response cache keyed per tenant
//!
//! ## Tenancy
//!
//! Every request carries an opaque `tenant_id` that is threaded
//! unchanged into each store call. The store filters server-side;
//! this crate never merges results from differently-scoped calls and
//! caches per tenant.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sift_retrieval::{
//!     CircuitBreaker, CircuitBreakerConfig, DocumentStore, SearchConfig, SearchOrchestrator,
//!     SearchRequest,
//! };
//!
//! # async fn example(store: Arc<dyn DocumentStore>) -> sift_retrieval::Result<()> {
//! let breaker = Arc::new(CircuitBreaker::new(
//!     "document-store",
//!     CircuitBreakerConfig::default(),
//! ));
//! let orchestrator = SearchOrchestrator::new(store, breaker, SearchConfig::default())?;
//!
//! let request = SearchRequest::new("tenant-a", "solar panel maintenance");
//! let response = orchestrator.search(&request).await?;
//! for hit in &response.hits {
//!     println!("{}: {:.5}", hit.document_id, hit.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod breaker;
pub mod cache;
pub mod config;
pub mod deadline;
pub mod error;
pub mod fusion;
pub mod generation;
pub mod orchestrator;
pub mod retrieval;
pub mod summary;
pub mod types;

pub use breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::SearchConfig;
pub use deadline::{Bounded, DeadlineGuard};
pub use error::{Result, SearchError};
pub use generation::{Generator, TokenStream};
pub use orchestrator::SearchOrchestrator;
pub use retrieval::DocumentStore;
pub use summary::{SummaryPipeline, SummaryStream};
pub use types::{
    FusedResult, RankedHit, RetrievalSource, ScoredDocument, SearchHit, SearchRequest,
    SearchResponse, SummaryEvent, SummaryResponse, DEFAULT_TOP_K,
};
