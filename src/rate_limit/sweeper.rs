use crate::observability::MetricsRecorder;
use crate::rate_limit::sliding_window::SlidingWindowRateLimiter;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Background task that periodically evicts stale rate limit state
pub struct Sweeper;

impl Sweeper {
    /// Spawn the sweep loop on the current runtime.
    ///
    /// Every `every` it drops entries older than `staleness` and removes keys
    /// left empty. The first sweep happens one full interval after spawning.
    pub fn spawn(
        limiter: Arc<SlidingWindowRateLimiter>,
        every: Duration,
        staleness: Duration,
    ) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(sweep_loop(limiter, every, staleness, shutdown_rx));

        SweeperHandle {
            shutdown_tx,
            task: Some(task),
        }
    }
}

/// Handle controlling a running sweeper; dropping it stops the task
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to finish
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Rate limit sweeper terminated abnormally: {}", e);
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn sweep_loop(
    limiter: Arc<SlidingWindowRateLimiter>,
    every: Duration,
    staleness: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let staleness = match chrono::Duration::from_std(staleness) {
        Ok(staleness) => staleness,
        Err(e) => {
            warn!("Invalid sweep staleness, sweeper not started: {}", e);
            return;
        }
    };

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;

    info!(
        "Rate limit sweeper started (interval_secs={}, staleness_secs={})",
        every.as_secs(),
        staleness.num_seconds()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = limiter.sweep_stale(staleness);
                let remaining = limiter.tracked_keys();

                MetricsRecorder::record_swept_keys(evicted as u64);
                MetricsRecorder::set_tracked_keys(remaining as i64);

                debug!(evicted, remaining, "Rate limit sweep completed");
            }

            changed = shutdown.changed() => {
                // Sender dropped or shutdown requested
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Rate limit sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::policy::Policy;

    #[tokio::test]
    async fn test_sweeper_evicts_stale_keys() {
        let limiter = Arc::new(SlidingWindowRateLimiter::new());
        let policy = Policy::per_minute(10).unwrap();

        let now = limiter.now();
        limiter.check_and_record("stale", &policy, now - chrono::Duration::hours(2));
        limiter.check_and_record("live", &policy, now);
        assert_eq!(limiter.tracked_keys(), 2);

        let handle = Sweeper::spawn(
            limiter.clone(),
            Duration::from_millis(10),
            Duration::from_secs(3600),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(limiter.tracked_keys(), 1);
        assert_eq!(limiter.entry_count("live"), 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let limiter = Arc::new(SlidingWindowRateLimiter::new());
        let handle = Sweeper::spawn(limiter, Duration::from_secs(3600), Duration::from_secs(3600));

        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("sweeper should stop promptly");
    }

    #[tokio::test]
    async fn test_drop_stops_task() {
        let limiter = Arc::new(SlidingWindowRateLimiter::new());
        let handle = Sweeper::spawn(
            limiter.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        );
        drop(handle);

        // The task holds the only other reference to the limiter
        tokio::time::timeout(Duration::from_secs(1), async {
            while Arc::strong_count(&limiter) > 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sweeper should release the limiter after drop");
    }
}
