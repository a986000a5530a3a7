//! Deadline-bounded concurrent execution.
//!
//! [`DeadlineGuard`] runs a set of independent async operations under a
//! shared time budget and returns whatever completed in time. Budget
//! expiry cancels stragglers — tasks are aborted and the set is drained
//! before the guard returns, so cancellation side effects (dropped
//! breaker permits, closed connections) have fully propagated. Partial
//! results are a valid, non-error outcome; deciding that "nothing
//! completed" is fatal is the caller's job.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// The outcome of one operation run under a [`DeadlineGuard`].
#[derive(Debug)]
pub enum Bounded<T> {
    /// The operation finished within the budget.
    Completed(T),
    /// The operation was cancelled when the budget expired.
    TimedOut,
}

impl<T> Bounded<T> {
    /// Returns the completed value, discarding the timeout marker.
    pub fn into_completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::TimedOut => None,
        }
    }

    /// True if the operation was cut off by the budget.
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

/// Enforces a time budget over concurrently issued operations.
#[derive(Debug, Clone)]
pub struct DeadlineGuard {
    budget: Duration,
}

impl DeadlineGuard {
    /// Create a guard with the given budget.
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    /// The configured budget.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// The absolute deadline if the budget started now. Useful for
    /// `select!`-style loops that need the same cutoff across several
    /// awaits.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.budget
    }

    /// Run a single operation under the budget.
    ///
    /// On expiry the future is dropped, which cancels the underlying
    /// I/O at its next suspension point.
    pub async fn run_one<T>(&self, op: impl std::future::Future<Output = T>) -> Bounded<T> {
        match tokio::time::timeout(self.budget, op).await {
            Ok(value) => Bounded::Completed(value),
            Err(_) => Bounded::TimedOut,
        }
    }

    /// Run a set of independent operations concurrently under one
    /// shared budget.
    ///
    /// Returns one [`Bounded`] per operation, in input order, as soon
    /// as every operation has completed or the budget has expired —
    /// whichever comes first. Operations still pending at expiry are
    /// aborted and reported as [`Bounded::TimedOut`]; operations that
    /// already completed keep their real results. An operation that
    /// panics is reported as timed out.
    pub async fn run_bounded<T>(&self, ops: Vec<BoxFuture<'static, T>>) -> Vec<Bounded<T>>
    where
        T: Send + 'static,
    {
        let deadline = self.deadline();
        let mut results: Vec<Bounded<T>> = ops.iter().map(|_| Bounded::TimedOut).collect();

        let mut set = JoinSet::new();
        let mut slots: HashMap<tokio::task::Id, usize> = HashMap::new();
        for (index, op) in ops.into_iter().enumerate() {
            let handle = set.spawn(op);
            slots.insert(handle.id(), index);
        }

        loop {
            match tokio::time::timeout_at(deadline, set.join_next_with_id()).await {
                Ok(Some(Ok((id, value)))) => {
                    if let Some(&index) = slots.get(&id) {
                        results[index] = Bounded::Completed(value);
                    }
                }
                Ok(Some(Err(join_err))) => {
                    tracing::warn!(error = %join_err, "bounded operation aborted or panicked");
                }
                Ok(None) => break,
                Err(_) => {
                    // Budget expired: cancel stragglers and wait for their
                    // destructors to run before reporting timeouts.
                    set.abort_all();
                    while set.join_next().await.is_some() {}
                    break;
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn all_operations_complete_within_budget() {
        let guard = DeadlineGuard::new(Duration::from_millis(500));
        let results = guard
            .run_bounded(vec![
                async { 1u32 }.boxed(),
                async { 2u32 }.boxed(),
                async { 3u32 }.boxed(),
            ])
            .await;

        let values: Vec<u32> = results
            .into_iter()
            .filter_map(Bounded::into_completed)
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn slow_operation_times_out_fast_one_survives() {
        let guard = DeadlineGuard::new(Duration::from_millis(80));
        let results = guard
            .run_bounded(vec![
                async {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    "fast"
                }
                .boxed(),
                async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    "slow"
                }
                .boxed(),
            ])
            .await;

        assert!(matches!(results[0], Bounded::Completed("fast")));
        assert!(results[1].is_timed_out());
    }

    #[tokio::test]
    async fn returns_promptly_on_expiry() {
        let guard = DeadlineGuard::new(Duration::from_millis(50));
        let started = std::time::Instant::now();
        let results = guard
            .run_bounded(vec![async {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            .boxed()])
            .await;
        assert!(results[0].is_timed_out());
        // Well under the straggler's own duration.
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancellation_runs_destructors_before_returning() {
        struct SetOnDrop(Arc<AtomicBool>);
        impl Drop for SetOnDrop {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let dropped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&dropped);
        let guard = DeadlineGuard::new(Duration::from_millis(30));
        let results = guard
            .run_bounded(vec![async move {
                let _guard = SetOnDrop(flag);
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            .boxed()])
            .await;

        assert!(results[0].is_timed_out());
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn results_are_position_stable() {
        let guard = DeadlineGuard::new(Duration::from_millis(300));
        let results = guard
            .run_bounded(vec![
                async {
                    tokio::time::sleep(Duration::from_millis(40)).await;
                    "slower"
                }
                .boxed(),
                async { "faster" }.boxed(),
            ])
            .await;

        // Completion order was reversed; output order is input order.
        assert!(matches!(results[0], Bounded::Completed("slower")));
        assert!(matches!(results[1], Bounded::Completed("faster")));
    }

    #[tokio::test]
    async fn empty_operation_set_returns_empty() {
        let guard = DeadlineGuard::new(Duration::from_millis(10));
        let results: Vec<Bounded<u32>> = guard.run_bounded(vec![]).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn run_one_completes_and_times_out() {
        let guard = DeadlineGuard::new(Duration::from_millis(50));
        let done = guard.run_one(async { 9u32 }).await;
        assert_eq!(done.into_completed(), Some(9));

        let late = guard
            .run_one(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                9u32
            })
            .await;
        assert!(late.is_timed_out());
    }

    #[test]
    fn bounded_accessors() {
        let completed: Bounded<u8> = Bounded::Completed(1);
        assert!(!completed.is_timed_out());
        assert_eq!(completed.into_completed(), Some(1));

        let timed_out: Bounded<u8> = Bounded::TimedOut;
        assert!(timed_out.is_timed_out());
        assert_eq!(timed_out.into_completed(), None);
    }
}
