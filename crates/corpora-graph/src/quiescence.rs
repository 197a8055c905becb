//! Pending-operation tracking for batch settlement.
//!
//! Every sprawl holds a [`PendingGuard`] for its whole lifetime. The guard
//! decrements the count when dropped, so success, error, timeout and
//! cancellation all release it. [`PendingOps::await_quiescence`] resolves
//! once the count reaches zero, and [`PendingGuard::release`] tells exactly
//! one caller that it ended the batch.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

/// Shared counter of in-flight operations.
#[derive(Clone)]
pub struct PendingOps {
    tx: Arc<watch::Sender<usize>>,
}

impl Default for PendingOps {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingOps {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Register one in-flight operation.
    pub fn begin(&self) -> PendingGuard {
        self.tx.send_modify(|count| *count += 1);
        trace!(pending = *self.tx.borrow(), "Pending operation started");
        PendingGuard {
            tx: Arc::clone(&self.tx),
            released: false,
        }
    }

    pub fn pending(&self) -> usize {
        *self.tx.borrow()
    }

    pub fn is_quiescent(&self) -> bool {
        self.pending() == 0
    }

    /// Wait until no operation is pending. Returns immediately when idle.
    pub async fn await_quiescence(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

/// Releases its operation when dropped.
#[must_use = "dropping the guard immediately ends the pending operation"]
pub struct PendingGuard {
    tx: Arc<watch::Sender<usize>>,
    released: bool,
}

impl PendingGuard {
    /// End the operation now. Returns `true` when it was the last one
    /// pending; the decrement and the check happen under one lock.
    pub fn release(mut self) -> bool {
        self.released = true;
        decrement(&self.tx)
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.released {
            decrement(&self.tx);
        }
    }
}

fn decrement(tx: &watch::Sender<usize>) -> bool {
    let mut last = false;
    tx.send_modify(|count| {
        *count = count.saturating_sub(1);
        last = *count == 0;
    });
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_idle_resolves_immediately() {
        let ops = PendingOps::new();
        ops.await_quiescence().await;
        assert!(ops.is_quiescent());
    }

    #[tokio::test]
    async fn test_waits_for_all_guards() {
        let ops = PendingOps::new();
        let a = ops.begin();
        let b = ops.begin();
        assert_eq!(ops.pending(), 2);

        let waiter = {
            let ops = ops.clone();
            tokio::spawn(async move { ops.await_quiescence().await })
        };

        drop(a);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(b);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("quiescence never observed")
            .unwrap();
        assert_eq!(ops.pending(), 0);
    }

    #[test]
    fn test_only_last_release_ends_batch() {
        let ops = PendingOps::new();
        let a = ops.begin();
        let b = ops.begin();
        assert!(!a.release());
        assert_eq!(ops.pending(), 1);
        assert!(b.release());
        assert!(ops.is_quiescent());

        let c = ops.begin();
        drop(c);
        assert!(ops.is_quiescent());
    }

    #[tokio::test]
    async fn test_guard_released_on_error_path() {
        async fn failing(ops: &PendingOps) -> Result<(), &'static str> {
            let _guard = ops.begin();
            Err("boom")
        }

        let ops = PendingOps::new();
        assert!(failing(&ops).await.is_err());
        assert!(ops.is_quiescent());
    }
}
