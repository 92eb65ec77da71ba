//! Refresh coordination.
//!
//! One [`RefreshCoordinator`] is shared by every service built from the same
//! [`DualTokenLayer`](super::DualTokenLayer). It guarantees that at most one
//! refresh operation runs at a time for that layer.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::debug;
use twintoken_core::Result;

/// How concurrent refresh requests are coordinated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshStrategy {
    /// Every caller that detects expiry refreshes, one at a time.
    ///
    /// N concurrent expired calls run the refresh operation N times, never
    /// overlapping.
    #[default]
    Serialized,
    /// Callers that observed the same credential share one refresh.
    ///
    /// A caller that acquires the lock after another caller has already
    /// refreshed past the credential it used skips the refresh and reuses
    /// the new credential.
    SingleFlight,
}

/// Outcome of [`RefreshCoordinator::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// This caller ran the refresh operation.
    Refreshed,
    /// Another caller had already refreshed; the operation was skipped.
    Reused,
}

/// Mutual exclusion around the provider's refresh operation.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    strategy: RefreshStrategy,
    lock: Mutex<()>,
    generation: AtomicU64,
    refreshes: AtomicU64,
}

impl RefreshCoordinator {
    /// Create a coordinator with the given strategy.
    #[must_use]
    pub fn new(strategy: RefreshStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// The coordination strategy.
    #[must_use]
    pub const fn strategy(&self) -> RefreshStrategy {
        self.strategy
    }

    /// Number of successful refreshes so far.
    ///
    /// Read it before using a credential and pass it to [`refresh`] later.
    ///
    /// [`refresh`]: RefreshCoordinator::refresh
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Number of times the refresh operation has been invoked.
    #[must_use]
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Run `refresh_fn` while holding the refresh lock.
    ///
    /// `observed` is the [`generation`](Self::generation) read before the
    /// caller used its credential. Under [`RefreshStrategy::SingleFlight`] the
    /// operation is skipped when the generation has moved past it.
    ///
    /// The lock is released on every exit path, including when the returned
    /// future is dropped before completion.
    ///
    /// # Errors
    ///
    /// Returns the error of `refresh_fn`; the generation is then unchanged.
    pub async fn refresh<F, Fut>(&self, observed: u64, refresh_fn: F) -> Result<RefreshOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let _guard = self.lock.lock().await;

        if self.strategy == RefreshStrategy::SingleFlight && self.generation() != observed {
            debug!(observed, current = self.generation(), "reusing concurrent refresh");
            return Ok(RefreshOutcome::Reused);
        }

        self.refreshes.fetch_add(1, Ordering::Relaxed);
        refresh_fn().await?;
        self.generation.fetch_add(1, Ordering::AcqRel);

        Ok(RefreshOutcome::Refreshed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use assert2::{check, let_assert};
    use twintoken_core::Error;

    use super::*;

    /// Tracks how many refreshes overlap.
    #[derive(Default)]
    struct Overlap {
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl Overlap {
        async fn run(&self) -> Result<()> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn default_strategy_is_serialized() {
        let coordinator = RefreshCoordinator::default();
        check!(coordinator.strategy() == RefreshStrategy::Serialized);
        check!(coordinator.generation() == 0);
        check!(coordinator.refresh_count() == 0);
    }

    #[tokio::test]
    async fn successful_refresh_bumps_generation() {
        let coordinator = RefreshCoordinator::new(RefreshStrategy::Serialized);

        let_assert!(Ok(outcome) = coordinator.refresh(0, || async { Ok(()) }).await);
        check!(outcome == RefreshOutcome::Refreshed);
        check!(coordinator.generation() == 1);
        check!(coordinator.refresh_count() == 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_generation_and_releases_lock() {
        let coordinator = RefreshCoordinator::new(RefreshStrategy::Serialized);

        let result = coordinator
            .refresh(0, || async { Err(Error::credential_refresh("denied")) })
            .await;
        let_assert!(Err(Error::CredentialRefresh(_)) = result);
        check!(coordinator.generation() == 0);

        // lock must be free again
        let_assert!(Ok(_) = coordinator.refresh(0, || async { Ok(()) }).await);
        check!(coordinator.refresh_count() == 2);
    }

    #[tokio::test]
    async fn serialized_refreshes_every_caller_without_overlap() {
        let coordinator = Arc::new(RefreshCoordinator::new(RefreshStrategy::Serialized));
        let overlap = Arc::new(Overlap::default());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                let overlap = Arc::clone(&overlap);
                tokio::spawn(async move { coordinator.refresh(0, || overlap.run()).await })
            })
            .collect();
        for task in tasks {
            let_assert!(Ok(Ok(RefreshOutcome::Refreshed)) = task.await);
        }

        check!(coordinator.refresh_count() == 8);
        check!(overlap.max_active.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn single_flight_skips_stale_callers() {
        let coordinator = RefreshCoordinator::new(RefreshStrategy::SingleFlight);

        let_assert!(Ok(RefreshOutcome::Refreshed) = coordinator.refresh(0, || async { Ok(()) }).await);
        let_assert!(Ok(RefreshOutcome::Reused) = coordinator.refresh(0, || async { Ok(()) }).await);
        check!(coordinator.refresh_count() == 1);

        // a caller that saw the new credential may refresh again
        let_assert!(Ok(RefreshOutcome::Refreshed) = coordinator.refresh(1, || async { Ok(()) }).await);
        check!(coordinator.generation() == 2);
    }

    #[tokio::test]
    async fn single_flight_retries_after_failed_leader() {
        let coordinator = RefreshCoordinator::new(RefreshStrategy::SingleFlight);

        let result = coordinator
            .refresh(0, || async { Err(Error::credential_refresh("denied")) })
            .await;
        check!(result.is_err());

        let_assert!(Ok(RefreshOutcome::Refreshed) = coordinator.refresh(0, || async { Ok(()) }).await);
        check!(coordinator.refresh_count() == 2);
    }

    #[tokio::test]
    async fn dropped_refresh_releases_lock() {
        let coordinator = RefreshCoordinator::new(RefreshStrategy::Serialized);

        let pending = coordinator.refresh(0, || std::future::pending::<Result<()>>());
        let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;
        check!(timed_out.is_err());

        let_assert!(Ok(_) = coordinator.refresh(0, || async { Ok(()) }).await);
    }
}
