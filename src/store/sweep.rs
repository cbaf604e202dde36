use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// The default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Something that can evict its expired entries.
#[async_trait]
pub trait Sweep: Send + Sync + 'static {
    /// Deletes every entry with `expires_at <= now` and returns how many went.
    async fn sweep_expired(&self) -> Result<u64, StoreError>;
}

/// Owns the periodic sweep task of one store.
///
/// Dropping the handle cancels the task; [`SweepHandle::shutdown`] also
/// waits for it to finish.
pub struct SweepHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Spawns a sweep of `target` every `interval`. Must run inside a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `target` - The store to sweep.
    /// * `interval` - Time between passes; zero falls back to [`DEFAULT_SWEEP_INTERVAL`].
    pub fn spawn<S: Sweep>(target: Arc<S>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_SWEEP_INTERVAL
        } else {
            interval
        };
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // first tick fires immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                tracing::debug!("🧹 Sweeping expired cache entries...");
                match target.sweep_expired().await {
                    Ok(0) => {}
                    Ok(removed) => {
                        tracing::info!("🧹 Removed {} expired cache entries", removed);
                    }
                    Err(e) => {
                        tracing::error!("❌ Failed to trim cache entries: {}", e);
                    }
                }
            }

            tracing::debug!("🛑 Cache sweeper stopped");
        });

        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Cancels the sweep and waits for the task to exit.
    pub async fn shutdown(mut self) {
        if !self.is_running() {
            tracing::warn!("⚠️  Cache sweeper had already stopped");
        }
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("❌ Cache sweeper task failed: {}", e);
            }
        }
    }

    /// Whether the sweep task is still alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Counting {
        calls: AtomicU64,
        fail: bool,
    }

    #[async_trait]
    impl Sweep for Counting {
        async fn sweep_expired(&self) -> Result<u64, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(StoreError::Timeout)
            } else {
                Ok(1)
            }
        }
    }

    #[tokio::test]
    async fn sweeps_on_every_tick_and_stops_on_shutdown() {
        let target = Arc::new(Counting { calls: AtomicU64::new(0), fail: false });
        let handle = SweepHandle::spawn(target.clone(), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(55)).await;
        assert!(handle.is_running());
        handle.shutdown().await;

        let seen = target.calls.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected several sweeps, saw {}", seen);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(target.calls.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn failed_pass_retries_on_next_tick() {
        let target = Arc::new(Counting { calls: AtomicU64::new(0), fail: true });
        let handle = SweepHandle::spawn(target.clone(), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(55)).await;
        assert!(handle.is_running());
        assert!(target.calls.load(Ordering::SeqCst) >= 2);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn dropping_the_handle_cancels_the_task() {
        let target = Arc::new(Counting { calls: AtomicU64::new(0), fail: false });
        let handle = SweepHandle::spawn(target.clone(), Duration::from_millis(10));
        drop(handle);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let seen = target.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(target.calls.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn zero_interval_falls_back_to_the_default() {
        let target = Arc::new(Counting { calls: AtomicU64::new(0), fail: false });
        let handle = SweepHandle::spawn(target.clone(), Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(handle.is_running());
        assert_eq!(target.calls.load(Ordering::SeqCst), 0);
        handle.shutdown().await;
    }
}
