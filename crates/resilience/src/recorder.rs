//! Breaker metrics recorded through the `metrics` facade.
//!
//! With no recorder installed every call here is a no-op.

use std::time::Duration;

use metrics::Label;

use crate::state::{BreakerState, CallCounts};

/// Records metrics for one breaker, labelled by breaker name, owning service
/// and the downstream target.
#[derive(Debug, Clone)]
pub struct BreakerMetrics {
    name: String,
    service: String,
    target_service: String,
}

impl BreakerMetrics {
    /// Creates a recorder for the given breaker.
    pub fn new(
        name: impl Into<String>,
        service: impl Into<String>,
        target_service: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            service: service.into(),
            target_service: target_service.into(),
        }
    }

    fn labels(&self) -> Vec<Label> {
        vec![
            Label::new("name", self.name.clone()),
            Label::new("service", self.service.clone()),
            Label::new("target_service", self.target_service.clone()),
        ]
    }

    /// Sets the state gauge (0=open, 1=closed, 2=half_open).
    pub fn record_state(&self, state: BreakerState) {
        metrics::gauge!("circuit_breaker_state", self.labels()).set(state.gauge_value());
    }

    /// Counts a request attempt, before the breaker decides anything.
    pub fn record_request(&self) {
        metrics::counter!("circuit_breaker_requests_total", self.labels()).increment(1);
    }

    /// Counts a successful call and records its duration.
    pub fn record_success(&self, duration: Duration) {
        metrics::counter!("circuit_breaker_successes_total", self.labels()).increment(1);
        let mut labels = self.labels();
        labels.push(Label::new("result", "success"));
        metrics::histogram!("circuit_breaker_call_duration_seconds", labels)
            .record(duration.as_secs_f64());
    }

    /// Counts a failed or rejected call and records its duration.
    pub fn record_failure(&self, duration: Duration) {
        metrics::counter!("circuit_breaker_failures_total", self.labels()).increment(1);
        let mut labels = self.labels();
        labels.push(Label::new("result", "failure"));
        metrics::histogram!("circuit_breaker_call_duration_seconds", labels)
            .record(duration.as_secs_f64());
    }

    /// Counts a state transition. The state gauge is set separately, from the
    /// breaker's latest state rather than from `to`.
    pub fn record_transition(&self, from: BreakerState, to: BreakerState) {
        let mut labels = self.labels();
        labels.push(Label::new("from_state", from.as_str()));
        labels.push(Label::new("to_state", to.as_str()));
        metrics::counter!("circuit_breaker_state_transitions_total", labels).increment(1);
    }

    /// Exports the current generation's counts as gauges.
    pub fn record_counts(&self, counts: &CallCounts) {
        metrics::gauge!("circuit_breaker_counts_requests", self.labels())
            .set(f64::from(counts.requests));
        metrics::gauge!("circuit_breaker_counts_successes", self.labels())
            .set(f64::from(counts.total_successes));
        metrics::gauge!("circuit_breaker_counts_failures", self.labels())
            .set(f64::from(counts.total_failures));
        metrics::gauge!("circuit_breaker_counts_consecutive_failures", self.labels())
            .set(f64::from(counts.consecutive_failures));
    }
}
