//! Periodic export of breaker state and counts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::breaker::CircuitBreaker;

/// Polls a set of breakers on a fixed interval and refreshes their gauges.
///
/// Polling also drives time-based transitions (open to half-open) on breakers
/// that see no traffic, so the exported state does not go stale.
#[derive(Debug)]
pub struct MetricsUpdater {
    interval: Duration,
    breakers: Vec<Arc<CircuitBreaker>>,
}

impl MetricsUpdater {
    /// Creates an updater that ticks every `interval` (at least 1ms).
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            breakers: Vec::new(),
        }
    }

    /// Adds a breaker to the polling set.
    pub fn watch(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breakers.push(breaker);
        self
    }

    /// Records the current state and counts of every watched breaker once.
    pub fn update(&self) {
        for breaker in &self.breakers {
            let snapshot = breaker.snapshot();
            breaker.metrics().record_state(snapshot.state);
            breaker.metrics().record_counts(&snapshot.counts);
        }
    }

    /// Runs the updater until `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("breaker metrics updater stopped");
                        break;
                    }
                    _ = ticker.tick() => self.update(),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::BreakerSettings;
    use crate::observer::ChannelObserver;
    use crate::state::BreakerState;

    #[tokio::test(start_paused = true)]
    async fn polling_moves_idle_breaker_to_half_open() {
        let (observer, mut rx) = ChannelObserver::new();
        let breaker = Arc::new(
            CircuitBreaker::new(BreakerSettings::new("ProductService"))
                .with_observer(Arc::new(observer)),
        );
        for _ in 0..3 {
            let _ = breaker.execute(|| async { Err::<(), _>("down") }).await;
        }
        assert_eq!(rx.recv().await.unwrap().to, BreakerState::Open);

        let shutdown = CancellationToken::new();
        let handle = MetricsUpdater::new(Duration::from_secs(5))
            .watch(breaker.clone())
            .spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_secs(21)).await;
        let change = rx.recv().await.unwrap();
        assert_eq!(change.from, BreakerState::Open);
        assert_eq!(change.to, BreakerState::HalfOpen);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn update_without_breakers_is_a_no_op() {
        MetricsUpdater::new(Duration::from_secs(1)).update();
    }
}
