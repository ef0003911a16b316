use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Runs delayed settlement tasks. Each task gets a child of the shutdown
/// token, so it can be cancelled on its own or together with the rest.
#[derive(Clone, Default)]
pub struct SettlementScheduler {
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

/// Handle to one scheduled settlement.
#[derive(Debug, Clone)]
pub struct ScheduledSettlement {
    token: CancellationToken,
}

impl ScheduledSettlement {
    /// Stops the task if its delay has not elapsed yet.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl SettlementScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&self, delay: Duration, task: F) -> ScheduledSettlement
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.shutdown.child_token();
        let cancelled = token.clone();

        self.tracker.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    tracing::debug!("Scheduled settlement cancelled");
                }
                _ = tokio::time::sleep(delay) => task.await,
            }
        });

        ScheduledSettlement { token }
    }

    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Cancels every outstanding task and waits for the tracker to drain.
    pub async fn shutdown(&self) {
        tracing::info!(pending = self.tracker.len(), "Stopping settlement scheduler");
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_task_runs_after_delay() {
        let scheduler = SettlementScheduler::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        scheduler.schedule(Duration::from_secs(5), async move {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!ran.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_task_never_runs() {
        let scheduler = SettlementScheduler::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        let handle = scheduler.schedule(Duration::from_secs(5), async move {
            flag.store(true, Ordering::SeqCst);
        });
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!ran.load(Ordering::SeqCst));
        assert!(handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_outstanding_tasks() {
        let scheduler = SettlementScheduler::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        let handle = scheduler.schedule(Duration::from_secs(60), async move {
            flag.store(true, Ordering::SeqCst);
        });

        scheduler.shutdown().await;
        assert!(handle.is_cancelled());
        assert_eq!(scheduler.pending(), 0);
        assert!(!ran.load(Ordering::SeqCst));
    }
}
