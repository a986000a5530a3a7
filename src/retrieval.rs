//! Collaborator contract for the document store.
//!
//! The store owns both retrieval strategies over one document
//! collection: dense (embedding similarity) and sparse (keyword)
//! ranked search. Implementations are expected to filter strictly by
//! `tenant_id` on their side — the orchestrator threads the tenant
//! through unchanged and never re-checks ownership.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ScoredDocument;

/// A vector/keyword document store queried by the orchestrator.
///
/// All implementations must be `Send + Sync`; both query methods are
/// invoked concurrently for the same request and must be safe to
/// execute interleaved.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Ranked similarity search over embedding vectors.
    ///
    /// Returns at most `limit` documents belonging to `tenant_id`,
    /// best first.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`](crate::SearchError::Store) if the
    /// backend cannot be reached or rejects the query.
    async fn query_dense(
        &self,
        tenant_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>>;

    /// Ranked keyword search.
    ///
    /// Same shape and tenant contract as
    /// [`query_dense`](Self::query_dense), with lexical scoring.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`](crate::SearchError::Store) if the
    /// backend cannot be reached or rejects the query.
    async fn query_sparse(
        &self,
        tenant_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>>;
}
