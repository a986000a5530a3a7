//! Per-dependency circuit breaker.
//!
//! Tracks consecutive failures for a single downstream dependency and
//! fails fast while the dependency is unhealthy. After a cooldown
//! period, a tripped breaker enters a half-open state where exactly one
//! trial call determines whether to restore or re-trip the circuit.
//!
//! # State Machine
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └────────┘             └────┬─────┘
//!     │                         ▲                      │
//!     │  trial success          │  trial failure       │
//!     └─────────────────────────┴──────────────────────┘
//! ```
//!
//! One breaker instance guards one dependency (e.g. the document store,
//! the generative backend). Instances are created once at process start
//! and shared across concurrent requests via `Arc`; every transition
//! happens under a single lock acquisition, so a burst of concurrent
//! failures cannot observe or produce an inconsistent state.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{Result, SearchError};

/// Circuit breaker state for a guarded dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Dependency is healthy — calls pass through.
    Closed,
    /// Dependency has failed too many times — calls are rejected until
    /// the cooldown expires.
    Open,
    /// Cooldown has elapsed — one trial call is in flight or admissible.
    HalfOpen,
}

/// Configuration for circuit breaker behaviour.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before tripping the circuit to Open.
    pub failure_threshold: u32,
    /// Time to wait in Open state before admitting a trial call.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    /// When the breaker last transitioned to Open.
    opened_at: Option<Instant>,
    /// True while a half-open trial call is outstanding.
    trial_in_flight: bool,
}

/// A point-in-time view of a breaker, for health reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSnapshot {
    /// The dependency this breaker guards.
    pub name: String,
    /// Current circuit state.
    pub state: CircuitState,
    /// Consecutive failures since the last success.
    pub consecutive_failures: u32,
}

/// Failure-tracking state machine guarding one downstream dependency.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a breaker for the named dependency.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// The dependency name this breaker guards.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current circuit state.
    ///
    /// An Open breaker whose cooldown has elapsed still reports Open
    /// until the next [`try_acquire`](Self::try_acquire) promotes it.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consecutive failures since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// A point-in-time view for health reporting.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
        }
    }

    /// Request admission for one call.
    ///
    /// Returns a [`CallPermit`] that must be resolved with
    /// [`success`](CallPermit::success) or [`failure`](CallPermit::failure).
    /// A permit dropped unresolved counts as a failure, so a call
    /// cancelled by a deadline can never wedge a half-open trial.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::CircuitOpen`] while the breaker is Open
    /// within its cooldown, or while a half-open trial is outstanding.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(CallPermit {
                breaker: self,
                is_trial: false,
                resolved: false,
            }),
            CircuitState::Open => {
                let cooldown_elapsed = inner
                    .opened_at
                    .map_or(true, |t| t.elapsed() >= self.config.cooldown);
                if cooldown_elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    Ok(CallPermit {
                        breaker: self,
                        is_trial: true,
                        resolved: false,
                    })
                } else {
                    Err(SearchError::CircuitOpen(self.name.clone()))
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(SearchError::CircuitOpen(self.name.clone()))
                } else {
                    inner.trial_in_flight = true;
                    Ok(CallPermit {
                        breaker: self,
                        is_trial: true,
                        resolved: false,
                    })
                }
            }
        }
    }

    /// Drive an operation through the breaker.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::CircuitOpen`] without polling the
    /// operation when admission is rejected; otherwise the operation's
    /// own result is returned and its outcome recorded.
    pub async fn execute<T, F>(&self, op: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        let permit = self.try_acquire()?;
        match op.await {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(err) => {
                permit.failure();
                Err(err)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_success(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    fn record_failure(&self, was_trial: bool) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if was_trial {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.trial_in_flight = false;
        } else if inner.state == CircuitState::Closed
            && inner.consecutive_failures >= self.config.failure_threshold
        {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// Admission for one call through a [`CircuitBreaker`].
///
/// Resolve with [`success`](Self::success) or [`failure`](Self::failure).
/// Dropping an unresolved permit records a failure — a cancelled call is
/// indistinguishable from a timeout as far as the dependency's health is
/// concerned.
#[must_use = "a dropped permit records a failure"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    is_trial: bool,
    resolved: bool,
}

impl CallPermit<'_> {
    /// Record the guarded call as successful.
    pub fn success(mut self) {
        self.resolved = true;
        self.breaker.record_success();
    }

    /// Record the guarded call as failed.
    pub fn failure(mut self) {
        self.resolved = true;
        self.breaker.record_failure(self.is_trial);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.breaker.record_failure(self.is_trial);
        }
    }
}
