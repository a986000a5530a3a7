//! Summary pipeline: search, then breaker-guarded streaming
//! summarization of the top hits.
//!
//! Generation is strictly best-effort. Search failures propagate —
//! search is the guaranteed contract — but every generation problem
//! (open breaker, timeout, provider error, mid-stream cut) degrades
//! the response instead of failing the request. Output is streamed
//! through a channel as fragments arrive; partial output already sent
//! is never retracted, only marked incomplete.

use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::breaker::CircuitBreaker;
use crate::deadline::DeadlineGuard;
use crate::error::Result;
use crate::generation::{build_summary_prompt, Generator};
use crate::orchestrator::SearchOrchestrator;
use crate::types::{SearchRequest, SearchResponse, SummaryEvent, SummaryResponse};

/// A boxed stream of [`SummaryEvent`]s: zero or more tokens followed by
/// one terminal event.
pub type SummaryStream = Pin<Box<dyn Stream<Item = SummaryEvent> + Send>>;

/// Wraps a [`SearchOrchestrator`] with a guarded summarization stage.
pub struct SummaryPipeline {
    orchestrator: SearchOrchestrator,
    generator: Arc<dyn Generator>,
    breaker: Arc<CircuitBreaker>,
}

impl SummaryPipeline {
    /// Create a pipeline over an orchestrator and a generative backend.
    ///
    /// `breaker` guards the generative backend — a separate dependency
    /// from the document store, with its own instance shared across
    /// requests.
    pub fn new(
        orchestrator: SearchOrchestrator,
        generator: Arc<dyn Generator>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            orchestrator,
            generator,
            breaker,
        }
    }

    /// The wrapped orchestrator.
    pub fn orchestrator(&self) -> &SearchOrchestrator {
        &self.orchestrator
    }

    /// The breaker guarding the generative backend.
    pub fn generation_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Search, then stream a summary of the top hits.
    ///
    /// Returns the search response immediately along with the event
    /// stream; generation runs in a background task and is cancelled if
    /// the stream is dropped.
    ///
    /// # Errors
    ///
    /// Fails only if the underlying search fails. Generation problems
    /// surface as [`SummaryEvent::Degraded`] or an incomplete
    /// [`SummaryEvent::Done`], never as an error.
    pub async fn search_with_summary_stream(
        &self,
        request: &SearchRequest,
    ) -> Result<(SearchResponse, SummaryStream)> {
        let response = self.orchestrator.search(request).await?;
        let stream = self.spawn_generation(request, &response);
        Ok((response, stream))
    }

    /// Search, then collect the streamed summary into a
    /// [`SummaryResponse`].
    ///
    /// # Errors
    ///
    /// Same as [`search_with_summary_stream`](Self::search_with_summary_stream).
    pub async fn search_with_summary(&self, request: &SearchRequest) -> Result<SummaryResponse> {
        let started = Instant::now();
        let (response, mut stream) = self.search_with_summary_stream(request).await?;

        let mut summary = String::new();
        let mut degraded = false;
        let mut complete = true;
        let mut llm_latency_ms = 0;
        while let Some(event) = stream.next().await {
            match event {
                SummaryEvent::Token { text } => summary.push_str(&text),
                SummaryEvent::Degraded {
                    llm_latency_ms: latency,
                    ..
                } => {
                    degraded = true;
                    complete = false;
                    llm_latency_ms = latency;
                }
                SummaryEvent::Done {
                    complete: was_complete,
                    llm_latency_ms: latency,
                } => {
                    complete = was_complete;
                    llm_latency_ms = latency;
                }
            }
        }

        Ok(SummaryResponse {
            summary: (!summary.is_empty()).then_some(summary),
            degraded,
            complete,
            latency_ms: elapsed_ms(started),
            search_latency_ms: response.latency_ms,
            llm_latency_ms,
            hits: response.hits,
        })
    }

    /// Start the generation stage in a background task and return the
    /// consumer side of its event channel.
    fn spawn_generation(&self, request: &SearchRequest, response: &SearchResponse) -> SummaryStream {
        let (tx, rx) = mpsc::channel::<SummaryEvent>(64);

        if response.hits.is_empty() {
            // Nothing to summarize; skip the backend entirely.
            let _ = tx.try_send(SummaryEvent::Done {
                complete: true,
                llm_latency_ms: 0,
            });
            return Box::pin(ReceiverStream::new(rx));
        }

        let prompt = build_summary_prompt(
            &request.query,
            &response.hits,
            self.orchestrator.config().summary_context_size,
        );
        let generator = Arc::clone(&self.generator);
        let breaker = Arc::clone(&self.breaker);
        let budget = Duration::from_millis(self.orchestrator.config().generation_budget_ms);

        tokio::spawn(run_generation(generator, breaker, prompt, budget, tx));
        Box::pin(ReceiverStream::new(rx))
    }
}

/// Drive one generation call: breaker admission, deadline-bounded
/// connect, then fragment forwarding until the stream ends, the budget
/// expires, or the consumer disconnects.
async fn run_generation(
    generator: Arc<dyn Generator>,
    breaker: Arc<CircuitBreaker>,
    prompt: String,
    budget: Duration,
    tx: mpsc::Sender<SummaryEvent>,
) {
    let started = Instant::now();

    let permit = match breaker.try_acquire() {
        Ok(permit) => permit,
        Err(err) => {
            warn!(error = %err, "generation breaker open, degrading to search-only");
            let _ = tx
                .send(SummaryEvent::Degraded {
                    reason: err.to_string(),
                    llm_latency_ms: 0,
                })
                .await;
            return;
        }
    };

    let guard = DeadlineGuard::new(budget);
    let deadline = guard.deadline();

    let mut stream = match tokio::time::timeout_at(deadline, generator.generate(&prompt)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(err)) => {
            permit.failure();
            warn!(error = %err, "generation failed to start, degrading to search-only");
            let _ = tx
                .send(SummaryEvent::Degraded {
                    reason: err.to_string(),
                    llm_latency_ms: elapsed_ms(started),
                })
                .await;
            return;
        }
        Err(_) => {
            permit.failure();
            warn!(
                budget_ms = budget.as_millis() as u64,
                "generation timed out before producing output"
            );
            let _ = tx
                .send(SummaryEvent::Degraded {
                    reason: "generation timed out before producing output".into(),
                    llm_latency_ms: elapsed_ms(started),
                })
                .await;
            return;
        }
    };

    let mut produced = false;
    loop {
        let next = tokio::select! {
            _ = tokio::time::sleep_until(deadline) => None,
            fragment = stream.next() => Some(fragment),
        };

        match next {
            // Budget expired. Tokens already sent stand; the response is
            // incomplete, not failed.
            None => {
                permit.failure();
                let llm_latency_ms = elapsed_ms(started);
                if produced {
                    let _ = tx
                        .send(SummaryEvent::Done {
                            complete: false,
                            llm_latency_ms,
                        })
                        .await;
                } else {
                    let _ = tx
                        .send(SummaryEvent::Degraded {
                            reason: "generation timed out before producing output".into(),
                            llm_latency_ms,
                        })
                        .await;
                }
                return;
            }
            // Stream ended normally.
            Some(None) => {
                permit.success();
                let _ = tx
                    .send(SummaryEvent::Done {
                        complete: true,
                        llm_latency_ms: elapsed_ms(started),
                    })
                    .await;
                return;
            }
            Some(Some(Ok(text))) => {
                produced = true;
                if tx.send(SummaryEvent::Token { text }).await.is_err() {
                    // Consumer disconnected. The backend was healthy as
                    // far as we observed, so this is not a dependency
                    // failure.
                    permit.success();
                    return;
                }
            }
            Some(Some(Err(err))) => {
                permit.failure();
                warn!(error = %err, "generation stream failed");
                let llm_latency_ms = elapsed_ms(started);
                if produced {
                    let _ = tx
                        .send(SummaryEvent::Done {
                            complete: false,
                            llm_latency_ms,
                        })
                        .await;
                } else {
                    let _ = tx
                        .send(SummaryEvent::Degraded {
                            reason: err.to_string(),
                            llm_latency_ms,
                        })
                        .await;
                }
                return;
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::CircuitBreakerConfig;
    use crate::config::SearchConfig;
    use crate::error::SearchError;
    use crate::retrieval::DocumentStore;
    use crate::types::ScoredDocument;
    use async_trait::async_trait;

    struct EmptyStore;

    #[async_trait]
    impl DocumentStore for EmptyStore {
        async fn query_dense(
            &self,
            _tenant_id: &str,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<ScoredDocument>> {
            Ok(vec![])
        }

        async fn query_sparse(
            &self,
            _tenant_id: &str,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<ScoredDocument>> {
            Ok(vec![])
        }
    }

    struct PanickingGenerator;

    #[async_trait]
    impl Generator for PanickingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<crate::generation::TokenStream> {
            panic!("generator must not be called for empty hit lists");
        }
    }

    fn make_pipeline() -> SummaryPipeline {
        let orchestrator = SearchOrchestrator::new(
            Arc::new(EmptyStore),
            Arc::new(CircuitBreaker::new(
                "document-store",
                CircuitBreakerConfig::default(),
            )),
            SearchConfig::default(),
        )
        .expect("valid config");
        SummaryPipeline::new(
            orchestrator,
            Arc::new(PanickingGenerator),
            Arc::new(CircuitBreaker::new(
                "generator",
                CircuitBreakerConfig::default(),
            )),
        )
    }

    #[tokio::test]
    async fn empty_hits_skip_generation() {
        let pipeline = make_pipeline();
        let response = pipeline
            .search_with_summary(&SearchRequest::new("tenant-a", "query"))
            .await
            .expect("search succeeds");

        assert!(response.hits.is_empty());
        assert!(response.summary.is_none());
        assert!(!response.degraded);
        assert!(response.complete);
        assert_eq!(response.llm_latency_ms, 0);
    }

    #[tokio::test]
    async fn search_failure_propagates() {
        struct FailingStore;

        #[async_trait]
        impl DocumentStore for FailingStore {
            async fn query_dense(
                &self,
                _tenant_id: &str,
                _query: &str,
                _limit: usize,
            ) -> Result<Vec<ScoredDocument>> {
                Err(SearchError::Store("down".into()))
            }

            async fn query_sparse(
                &self,
                _tenant_id: &str,
                _query: &str,
                _limit: usize,
            ) -> Result<Vec<ScoredDocument>> {
                Err(SearchError::Store("down".into()))
            }
        }

        let orchestrator = SearchOrchestrator::new(
            Arc::new(FailingStore),
            Arc::new(CircuitBreaker::new(
                "document-store",
                CircuitBreakerConfig {
                    failure_threshold: 100,
                    cooldown: Duration::from_secs(60),
                },
            )),
            SearchConfig::default(),
        )
        .expect("valid config");
        let pipeline = SummaryPipeline::new(
            orchestrator,
            Arc::new(PanickingGenerator),
            Arc::new(CircuitBreaker::new(
                "generator",
                CircuitBreakerConfig::default(),
            )),
        );

        let result = pipeline
            .search_with_summary(&SearchRequest::new("tenant-a", "query"))
            .await;
        assert!(matches!(result, Err(SearchError::RetrievalFailed(_))));
    }
}
