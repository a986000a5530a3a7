//! In-memory cache for search responses.
//!
//! Caches the final fused, truncated hit list keyed by the
//! (tenant, normalised query, top_k) triple. The tenant id is part of
//! the key, so entries can never leak across tenant boundaries. Uses
//! [`moka`] for async-friendly caching with configurable TTL and
//! automatic eviction. A TTL of 0 disables caching entirely.

use std::time::Duration;

use moka::future::Cache;

use crate::types::{SearchHit, SearchRequest};

/// Maximum number of cached responses.
const MAX_CACHE_ENTRIES: u64 = 1_000;

/// Composite cache key: tenant, normalised query, result count.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    /// Tenant id, verbatim — opaque identifiers are never normalised.
    tenant_id: String,
    /// Lowercased, trimmed query string.
    query: String,
    top_k: usize,
}

impl CacheKey {
    fn new(request: &SearchRequest) -> Self {
        Self {
            tenant_id: request.tenant_id.clone(),
            query: request.query.trim().to_lowercase(),
            top_k: request.top_k,
        }
    }
}

/// Tenant-scoped response cache owned by the orchestrator.
///
/// Constructed from `SearchConfig::cache_ttl_seconds`; a zero TTL
/// produces a disabled cache whose probes always miss.
#[derive(Debug)]
pub struct ResponseCache {
    inner: Option<Cache<CacheKey, Vec<SearchHit>>>,
}

impl ResponseCache {
    /// Create a cache with the given TTL in seconds; 0 disables.
    pub fn new(ttl_seconds: u64) -> Self {
        let inner = (ttl_seconds > 0).then(|| {
            Cache::builder()
                .max_capacity(MAX_CACHE_ENTRIES)
                .time_to_live(Duration::from_secs(ttl_seconds))
                .build()
        });
        Self { inner }
    }

    /// True when a TTL was configured.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Look up the cached hits for a request.
    pub async fn get(&self, request: &SearchRequest) -> Option<Vec<SearchHit>> {
        let cache = self.inner.as_ref()?;
        cache.get(&CacheKey::new(request)).await
    }

    /// Store the hits for a request.
    pub async fn insert(&self, request: &SearchRequest, hits: Vec<SearchHit>) {
        if let Some(cache) = self.inner.as_ref() {
            cache.insert(CacheKey::new(request), hits).await;
        }
    }
}
