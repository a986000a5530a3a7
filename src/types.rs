//! Core types for retrieval requests, ranked hits, and fused results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of fused results returned when the caller does not ask
/// for a specific `top_k`.
pub const DEFAULT_TOP_K: usize = 5;

/// The retrieval strategies fused by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetrievalSource {
    /// Similarity search over embedding vectors.
    Dense,
    /// Keyword/lexical ranked search.
    Sparse,
}

impl RetrievalSource {
    /// Returns the lowercase name of this source, as used in logs and
    /// error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dense => "dense",
            Self::Sparse => "sparse",
        }
    }

    /// Returns both source variants in canonical order.
    pub fn all() -> &'static [RetrievalSource] {
        &[Self::Dense, Self::Sparse]
    }
}

impl fmt::Display for RetrievalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tenant-scoped search request.
///
/// `tenant_id` is opaque to this crate and is threaded unchanged into
/// every downstream retrieval call — results are never computed across
/// tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Tenant identifier. Mandatory, never interpreted.
    pub tenant_id: String,
    /// Query text.
    pub query: String,
    /// Number of fused results to return.
    pub top_k: usize,
}

impl SearchRequest {
    /// Create a request with the default `top_k` of [`DEFAULT_TOP_K`].
    pub fn new(tenant_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            query: query.into(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Override the number of results to return.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

/// A document as returned by one retrieval branch of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// Unique document identifier within the tenant.
    pub document_id: String,
    /// Document content for prompt building and display.
    pub content: String,
    /// Opaque caller-supplied metadata.
    pub metadata: serde_json::Value,
    /// The branch's own relevance score. Informational only — fusion
    /// uses rank positions, not raw scores.
    pub score: f64,
}

/// A single entry of one source's ranked list, as consumed by fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedHit {
    /// Document identifier.
    pub document_id: String,
    /// 1-based rank within the source list.
    pub rank: usize,
    /// Which retrieval strategy produced this hit.
    pub source: RetrievalSource,
    /// The source's raw score, if it reported one.
    pub raw_score: Option<f64>,
}

/// A document after rank fusion, before content attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    /// Document identifier.
    pub document_id: String,
    /// Sum of `1/(k + rank)` over every list containing the document.
    pub fused_score: f64,
    /// Sources that contributed, in canonical (dense, sparse) order.
    pub sources: Vec<RetrievalSource>,
}

/// A fused search hit with content and metadata attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Document identifier.
    pub document_id: String,
    /// Document content.
    pub content: String,
    /// Fused relevance score (higher is better).
    pub score: f64,
    /// Opaque caller-supplied metadata.
    pub metadata: serde_json::Value,
    /// Sources that returned this document.
    pub sources: Vec<RetrievalSource>,
}

/// The result of a hybrid search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Fused hits, best first, at most `top_k` of them.
    pub hits: Vec<SearchHit>,
    /// Wall-clock time spent in the search, in milliseconds.
    pub latency_ms: u64,
}

/// The result of a search-with-summary call.
///
/// Generation is best-effort: a degraded or incomplete summary never
/// fails the request as long as the search itself succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    /// Fused hits, identical to what a plain search would return.
    pub hits: Vec<SearchHit>,
    /// Generated summary text, absent when degraded or when there was
    /// nothing to summarize.
    pub summary: Option<String>,
    /// True when the generation stage was skipped because its breaker
    /// was open, it timed out, or it failed before producing output.
    pub degraded: bool,
    /// False when streaming was cut off after partial output.
    pub complete: bool,
    /// Total wall-clock time, in milliseconds.
    pub latency_ms: u64,
    /// Time spent in the search stage, in milliseconds.
    pub search_latency_ms: u64,
    /// Time spent in the generation stage, in milliseconds.
    pub llm_latency_ms: u64,
}

/// A streaming event from the summary pipeline.
///
/// A stream yields zero or more [`SummaryEvent::Token`] events followed
/// by exactly one terminal event — [`SummaryEvent::Degraded`] when no
/// summary was produced, otherwise [`SummaryEvent::Done`].
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryEvent {
    /// A fragment of generated summary text.
    Token {
        /// The text fragment.
        text: String,
    },
    /// Generation was skipped or failed before producing any output.
    Degraded {
        /// Why the summary was skipped.
        reason: String,
        /// Time spent in the generation stage, in milliseconds.
        llm_latency_ms: u64,
    },
    /// Generation finished.
    Done {
        /// False when the stream was cut off after partial output.
        complete: bool,
        /// Time spent in the generation stage, in milliseconds.
        llm_latency_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_source_display() {
        assert_eq!(RetrievalSource::Dense.to_string(), "dense");
        assert_eq!(RetrievalSource::Sparse.to_string(), "sparse");
    }

    #[test]
    fn retrieval_source_all() {
        let all = RetrievalSource::all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], RetrievalSource::Dense);
        assert_eq!(all[1], RetrievalSource::Sparse);
    }

    #[test]
    fn retrieval_source_serde_round_trip() {
        let json = serde_json::to_string(&RetrievalSource::Sparse).expect("serialize");
        let decoded: RetrievalSource = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, RetrievalSource::Sparse);
    }

    #[test]
    fn search_request_defaults_top_k() {
        let request = SearchRequest::new("tenant-a", "solar panels");
        assert_eq!(request.tenant_id, "tenant-a");
        assert_eq!(request.query, "solar panels");
        assert_eq!(request.top_k, DEFAULT_TOP_K);
    }

    #[test]
    fn search_request_with_top_k() {
        let request = SearchRequest::new("tenant-a", "solar panels").with_top_k(20);
        assert_eq!(request.top_k, 20);
    }

    #[test]
    fn search_hit_serde_round_trip() {
        let hit = SearchHit {
            document_id: "doc-1".into(),
            content: "body".into(),
            score: 0.0327,
            metadata: serde_json::json!({"lang": "en"}),
            sources: vec![RetrievalSource::Dense, RetrievalSource::Sparse],
        };
        let json = serde_json::to_string(&hit).expect("serialize");
        let decoded: SearchHit = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded.document_id, "doc-1");
        assert_eq!(decoded.sources.len(), 2);
    }

    #[test]
    fn summary_response_serde_round_trip() {
        let response = SummaryResponse {
            hits: vec![],
            summary: Some("a summary".into()),
            degraded: false,
            complete: true,
            latency_ms: 42,
            search_latency_ms: 12,
            llm_latency_ms: 30,
        };
        let json = serde_json::to_string(&response).expect("serialize");
        let decoded: SummaryResponse = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded.summary.as_deref(), Some("a summary"));
        assert!(decoded.complete);
    }

    #[test]
    fn summary_event_equality() {
        let a = SummaryEvent::Token { text: "hi".into() };
        let b = SummaryEvent::Token { text: "hi".into() };
        assert_eq!(a, b);
        assert_ne!(
            a,
            SummaryEvent::Done {
                complete: true,
                llm_latency_ms: 0
            }
        );
    }
}
