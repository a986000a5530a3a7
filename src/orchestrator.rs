//! Core search orchestrator: breaker-guarded concurrent fan-out to the
//! dense and sparse retrieval branches, rank fusion, truncation.
//!
//! Both branches run concurrently under one deadline budget. A branch
//! that fails — breaker open, sub-deadline exceeded, or store error —
//! contributes an empty list and degrades result quality, never
//! availability; only both branches failing surfaces as an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};

use crate::breaker::CircuitBreaker;
use crate::cache::ResponseCache;
use crate::config::SearchConfig;
use crate::deadline::{Bounded, DeadlineGuard};
use crate::error::{Result, SearchError};
use crate::fusion;
use crate::retrieval::DocumentStore;
use crate::types::{
    RankedHit, RetrievalSource, ScoredDocument, SearchHit, SearchRequest, SearchResponse,
};

/// Orchestrates tenant-scoped hybrid search over a [`DocumentStore`].
pub struct SearchOrchestrator {
    store: Arc<dyn DocumentStore>,
    breaker: Arc<CircuitBreaker>,
    cache: ResponseCache,
    config: SearchConfig,
}

impl SearchOrchestrator {
    /// Create an orchestrator over the given store.
    ///
    /// `breaker` guards the store dependency and is shared across every
    /// request served by this orchestrator (and typically with the
    /// health surface); construct it once at process start.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` is invalid.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        breaker: Arc<CircuitBreaker>,
        config: SearchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let cache = ResponseCache::new(config.cache_ttl_seconds);
        Ok(Self {
            store,
            breaker,
            cache,
            config,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The breaker guarding the document store.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Execute a hybrid search.
    ///
    /// # Pipeline
    ///
    /// 1. Validate the request against the configured bounds
    /// 2. Probe the response cache
    /// 3. Fan out dense + sparse retrieval concurrently, each call
    ///    breaker-guarded and bounded by the search budget
    /// 4. Absorb per-branch failures as empty lists (logged at warn)
    /// 5. Fuse with Reciprocal Rank Fusion, truncate to `top_k`
    /// 6. Attach content and metadata, record wall-clock latency
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for an invalid request and
    /// [`SearchError::RetrievalFailed`] only when **every** branch
    /// failed or timed out. Zero hits from healthy branches is a valid
    /// empty response, not an error.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.validate_request(request)?;
        let started = Instant::now();

        if let Some(hits) = self.cache.get(request).await {
            debug!(tenant = %request.tenant_id, count = hits.len(), "search cache hit");
            return Ok(SearchResponse {
                hits,
                latency_ms: elapsed_ms(started),
            });
        }

        // Over-fetch per source so fusion has overlap to work with;
        // truncation to top_k happens strictly after fusion.
        let limit = request.top_k * self.config.candidate_multiplier;
        let guard = DeadlineGuard::new(Duration::from_millis(self.config.search_budget_ms));
        let outcomes = guard
            .run_bounded(vec![
                self.retrieval_branch(RetrievalSource::Dense, request, limit),
                self.retrieval_branch(RetrievalSource::Sparse, request, limit),
            ])
            .await;

        let mut lists: Vec<Vec<RankedHit>> = Vec::with_capacity(outcomes.len());
        let mut documents: HashMap<String, ScoredDocument> = HashMap::new();
        let mut failures: Vec<String> = Vec::new();

        for (source, outcome) in RetrievalSource::all().iter().copied().zip(outcomes) {
            match outcome {
                Bounded::Completed(Ok(docs)) => {
                    debug!(%source, count = docs.len(), "retrieval branch returned hits");
                    lists.push(ranked_list(source, &docs));
                    for doc in docs {
                        documents.entry(doc.document_id.clone()).or_insert(doc);
                    }
                }
                Bounded::Completed(Err(err)) => {
                    warn!(source = %source, error = %err, "retrieval branch failed");
                    failures.push(format!("{source}: {err}"));
                    lists.push(Vec::new());
                }
                Bounded::TimedOut => {
                    warn!(
                        source = %source,
                        budget_ms = self.config.search_budget_ms,
                        "retrieval branch cancelled at deadline"
                    );
                    failures.push(format!("{source}: deadline exceeded"));
                    lists.push(Vec::new());
                }
            }
        }

        if failures.len() == lists.len() {
            return Err(SearchError::RetrievalFailed(failures.join("; ")));
        }

        let mut fused = fusion::fuse(&lists, self.config.rrf_k);
        fused.truncate(request.top_k);

        let hits: Vec<SearchHit> = fused
            .into_iter()
            .filter_map(|result| {
                documents.get(&result.document_id).map(|doc| SearchHit {
                    document_id: result.document_id,
                    content: doc.content.clone(),
                    score: result.fused_score,
                    metadata: doc.metadata.clone(),
                    sources: result.sources,
                })
            })
            .collect();

        self.cache.insert(request, hits.clone()).await;

        let latency_ms = elapsed_ms(started);
        debug!(
            tenant = %request.tenant_id,
            count = hits.len(),
            latency_ms,
            "hybrid search completed"
        );
        Ok(SearchResponse { hits, latency_ms })
    }

    /// Build one breaker-guarded, deadline-bounded retrieval branch.
    ///
    /// The tenant id is threaded into the store call verbatim; both
    /// branches of a request carry the same tenant, so fusion can never
    /// merge across tenant-scoped calls.
    fn retrieval_branch(
        &self,
        source: RetrievalSource,
        request: &SearchRequest,
        limit: usize,
    ) -> BoxFuture<'static, Result<Vec<ScoredDocument>>> {
        let store = Arc::clone(&self.store);
        let breaker = Arc::clone(&self.breaker);
        let tenant_id = request.tenant_id.clone();
        let query = request.query.clone();
        let budget = Duration::from_millis(self.config.search_budget_ms);

        async move {
            let guarded = breaker.execute(async {
                match source {
                    RetrievalSource::Dense => store.query_dense(&tenant_id, &query, limit).await,
                    RetrievalSource::Sparse => store.query_sparse(&tenant_id, &query, limit).await,
                }
            });
            // The per-call sub-deadline: cancelling the guarded future
            // here drops the breaker permit, which records the timeout
            // as a dependency failure.
            match tokio::time::timeout(budget, guarded).await {
                Ok(result) => result,
                Err(_) => Err(SearchError::Timeout(format!(
                    "{source} retrieval exceeded {}ms",
                    budget.as_millis()
                ))),
            }
        }
        .boxed()
    }

    fn validate_request(&self, request: &SearchRequest) -> Result<()> {
        if request.tenant_id.trim().is_empty() {
            return Err(SearchError::Config("tenant_id must not be empty".into()));
        }
        if request.query.trim().is_empty() {
            return Err(SearchError::Config("query must not be empty".into()));
        }
        if request.top_k == 0 {
            return Err(SearchError::Config("top_k must be greater than 0".into()));
        }
        if request.top_k > self.config.max_top_k {
            return Err(SearchError::Config(format!(
                "top_k must be at most {}",
                self.config.max_top_k
            )));
        }
        Ok(())
    }
}

/// Assign 1-based ranks by list position.
fn ranked_list(source: RetrievalSource, docs: &[ScoredDocument]) -> Vec<RankedHit> {
    docs.iter()
        .enumerate()
        .map(|(i, doc)| RankedHit {
            document_id: doc.document_id.clone(),
            rank: i + 1,
            source,
            raw_score: Some(doc.score),
        })
        .collect()
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
