//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls fusion, deadline budgets, candidate fetch
//! sizes, prompt bounds, and response caching. The defaults match the
//! latency envelope the orchestrator is expected to hold: 800ms for the
//! retrieval fan-out and 2s for summary generation.

use crate::error::SearchError;

/// Configuration for the retrieval orchestrator and summary pipeline.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Smoothing constant for Reciprocal Rank Fusion. Larger values
    /// flatten the influence of rank position.
    pub rrf_k: f64,
    /// Upper bound on `SearchRequest::top_k`.
    pub max_top_k: usize,
    /// Each source is asked for `top_k * candidate_multiplier` hits so
    /// fusion has enough overlap to work with. Truncation to `top_k`
    /// happens strictly after fusion.
    pub candidate_multiplier: usize,
    /// Budget for the retrieval fan-out, in milliseconds. Applied both
    /// per branch and to the fan-out as a whole.
    pub search_budget_ms: u64,
    /// Budget for summary generation, in milliseconds.
    pub generation_budget_ms: u64,
    /// Maximum number of hits included in the summary prompt,
    /// independent of `top_k`.
    pub summary_context_size: usize,
    /// How long to cache search responses, in seconds. 0 disables
    /// caching.
    pub cache_ttl_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60.0,
            max_top_k: 100,
            candidate_multiplier: 2,
            search_budget_ms: 800,
            generation_budget_ms: 2_000,
            summary_context_size: 5,
            cache_ttl_seconds: 0,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is
    /// invalid.
    ///
    /// Checks:
    /// - `rrf_k` must be positive and finite
    /// - `max_top_k` must be greater than 0
    /// - `candidate_multiplier` must be greater than 0
    /// - `search_budget_ms` and `generation_budget_ms` must be greater than 0
    /// - `summary_context_size` must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if !self.rrf_k.is_finite() || self.rrf_k <= 0.0 {
            return Err(SearchError::Config(
                "rrf_k must be positive and finite".into(),
            ));
        }
        if self.max_top_k == 0 {
            return Err(SearchError::Config(
                "max_top_k must be greater than 0".into(),
            ));
        }
        if self.candidate_multiplier == 0 {
            return Err(SearchError::Config(
                "candidate_multiplier must be greater than 0".into(),
            ));
        }
        if self.search_budget_ms == 0 {
            return Err(SearchError::Config(
                "search_budget_ms must be greater than 0".into(),
            ));
        }
        if self.generation_budget_ms == 0 {
            return Err(SearchError::Config(
                "generation_budget_ms must be greater than 0".into(),
            ));
        }
        if self.summary_context_size == 0 {
            return Err(SearchError::Config(
                "summary_context_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = SearchConfig::default();
        assert!((config.rrf_k - 60.0).abs() < f64::EPSILON);
        assert_eq!(config.max_top_k, 100);
        assert_eq!(config.candidate_multiplier, 2);
        assert_eq!(config.search_budget_ms, 800);
        assert_eq!(config.generation_budget_ms, 2_000);
        assert_eq!(config.summary_context_size, 5);
        assert_eq!(config.cache_ttl_seconds, 0);
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn non_positive_rrf_k_rejected() {
        let config = SearchConfig {
            rrf_k: 0.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rrf_k"));
    }

    #[test]
    fn nan_rrf_k_rejected() {
        let config = SearchConfig {
            rrf_k: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_top_k_rejected() {
        let config = SearchConfig {
            max_top_k: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_top_k"));
    }

    #[test]
    fn zero_candidate_multiplier_rejected() {
        let config = SearchConfig {
            candidate_multiplier: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("candidate_multiplier"));
    }

    #[test]
    fn zero_search_budget_rejected() {
        let config = SearchConfig {
            search_budget_ms: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("search_budget_ms"));
    }

    #[test]
    fn zero_generation_budget_rejected() {
        let config = SearchConfig {
            generation_budget_ms: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("generation_budget_ms"));
    }

    #[test]
    fn zero_summary_context_rejected() {
        let config = SearchConfig {
            summary_context_size: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("summary_context_size"));
    }

    #[test]
    fn zero_cache_ttl_is_valid() {
        let config = SearchConfig {
            cache_ttl_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
