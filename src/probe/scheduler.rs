//! Fixed-interval probe scheduling

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use super::prober::TransactionProber;

pub struct ProbeScheduler {
    prober: Arc<TransactionProber>,
    interval: Duration,
}

impl ProbeScheduler {
    pub fn new(prober: Arc<TransactionProber>, interval: Duration) -> Self {
        Self { prober, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fire attempts forever
    pub async fn run(&self) {
        self.run_until(std::future::pending::<()>()).await;
    }

    /// Fire one attempt per interval until `shutdown` resolves. Returns the
    /// number of ticks fired.
    ///
    /// The first attempt fires one interval after start. Attempts are spawned
    /// and never awaited, so a slow attempt does not delay the next tick;
    /// overlapping attempts are kept apart by the prober's nonce guard.
    pub async fn run_until<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    ticks += 1;
                    let prober = Arc::clone(&self.prober);
                    tokio::spawn(async move {
                        prober.probe_once().await;
                    });
                }
                _ = &mut shutdown => {
                    tracing::info!(ticks, "Scheduler stopped");
                    break;
                }
            }
        }
        ticks
    }
}
