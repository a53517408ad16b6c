//! Three-state circuit breaker.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::error::BreakerError;
use crate::observer::{StateChange, StateObserver};
use crate::recorder::BreakerMetrics;
use crate::state::{BreakerState, CallCounts};

/// Decides when a closed breaker trips open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripPolicy {
    /// Minimum requests in the current interval before the ratio is considered.
    pub min_requests: u32,
    /// Failure ratio (failures / requests) at or above which the breaker trips.
    pub failure_ratio: f64,
}

impl TripPolicy {
    /// Returns true if the counts breach the policy.
    pub fn should_trip(&self, counts: &CallCounts) -> bool {
        counts.requests >= self.min_requests.max(1) && counts.failure_ratio() >= self.failure_ratio
    }
}

impl Default for TripPolicy {
    fn default() -> Self {
        Self {
            min_requests: 3,
            failure_ratio: 0.6,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct BreakerSettings {
    /// Name of the guarded dependency, used in logs, metrics and errors.
    pub name: String,
    /// Probe calls allowed while half-open; that many consecutive successes close the breaker.
    pub max_requests: u32,
    /// Closed-state counting interval. Zero never clears counts while closed.
    pub interval: Duration,
    /// Cool-down spent open before probing.
    pub timeout: Duration,
    /// Trip condition evaluated while closed.
    pub trip: TripPolicy,
}

impl BreakerSettings {
    /// Default settings for the named dependency.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn probe_budget(&self) -> u32 {
        self.max_requests.max(1)
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            max_requests: 3,
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(20),
            trip: TripPolicy::default(),
        }
    }
}

/// Point-in-time view of a breaker, for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: BreakerState,
    pub counts: CallCounts,
}

type Transition = (BreakerState, BreakerState);

struct Inner {
    state: BreakerState,
    generation: u64,
    counts: CallCounts,
    expiry: Option<Instant>,
}

impl Inner {
    fn new(now: Instant, settings: &BreakerSettings) -> Self {
        let mut inner = Self {
            state: BreakerState::Closed,
            generation: 0,
            counts: CallCounts::default(),
            expiry: None,
        };
        inner.expiry = inner.next_expiry(now, settings);
        inner
    }

    /// Applies time-driven transitions and returns the effective state.
    fn current_state(
        &mut self,
        now: Instant,
        settings: &BreakerSettings,
        changes: &mut Vec<Transition>,
    ) -> (BreakerState, u64) {
        match self.state {
            BreakerState::Closed => {
                if let Some(expiry) = self.expiry
                    && expiry <= now
                {
                    self.new_generation(now, settings);
                }
            }
            BreakerState::Open => {
                if let Some(expiry) = self.expiry
                    && expiry <= now
                {
                    self.set_state(BreakerState::HalfOpen, now, settings, changes);
                }
            }
            BreakerState::HalfOpen => {}
        }
        (self.state, self.generation)
    }

    fn on_success(
        &mut self,
        state: BreakerState,
        now: Instant,
        settings: &BreakerSettings,
        changes: &mut Vec<Transition>,
    ) {
        match state {
            BreakerState::Closed => {
                self.counts.on_success();
                if settings.trip.should_trip(&self.counts) {
                    self.set_state(BreakerState::Open, now, settings, changes);
                }
            }
            BreakerState::HalfOpen => {
                self.counts.on_success();
                if self.counts.consecutive_successes >= settings.probe_budget() {
                    self.set_state(BreakerState::Closed, now, settings, changes);
                }
            }
            BreakerState::Open => {}
        }
    }

    fn on_failure(
        &mut self,
        state: BreakerState,
        now: Instant,
        settings: &BreakerSettings,
        changes: &mut Vec<Transition>,
    ) {
        match state {
            BreakerState::Closed => {
                self.counts.on_failure();
                if settings.trip.should_trip(&self.counts) {
                    self.set_state(BreakerState::Open, now, settings, changes);
                }
            }
            BreakerState::HalfOpen => {
                self.set_state(BreakerState::Open, now, settings, changes);
            }
            BreakerState::Open => {}
        }
    }

    fn set_state(
        &mut self,
        to: BreakerState,
        now: Instant,
        settings: &BreakerSettings,
        changes: &mut Vec<Transition>,
    ) {
        if self.state == to {
            return;
        }
        let from = self.state;
        self.state = to;
        self.new_generation(now, settings);
        changes.push((from, to));
    }

    fn new_generation(&mut self, now: Instant, settings: &BreakerSettings) {
        self.generation = self.generation.wrapping_add(1);
        self.counts.clear();
        self.expiry = self.next_expiry(now, settings);
    }

    fn next_expiry(&self, now: Instant, settings: &BreakerSettings) -> Option<Instant> {
        match self.state {
            BreakerState::Closed if settings.interval.is_zero() => None,
            BreakerState::Closed => Some(now + settings.interval),
            BreakerState::Open => Some(now + settings.timeout),
            BreakerState::HalfOpen => None,
        }
    }
}

/// Guards calls to a single downstream dependency.
///
/// All counters and transitions sit behind one mutex that is held only for
/// bookkeeping, never across the wrapped call, so concurrent callers do not
/// serialize their I/O. Each transition is computed under the lock exactly
/// once and reported to metrics, logs and the observer after the lock is
/// released.
pub struct CircuitBreaker {
    settings: BreakerSettings,
    inner: Mutex<Inner>,
    metrics: BreakerMetrics,
    observer: Option<Arc<dyn StateObserver>>,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    pub fn new(settings: BreakerSettings) -> Self {
        let inner = Inner::new(Instant::now(), &settings);
        let metrics = BreakerMetrics::new(settings.name.clone(), "unknown", "unknown");
        Self {
            settings,
            inner: Mutex::new(inner),
            metrics,
            observer: None,
        }
    }

    /// Replaces the metrics recorder.
    pub fn with_metrics(mut self, metrics: BreakerMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Registers an observer for state transitions.
    pub fn with_observer(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Returns the guarded dependency's name.
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// Returns the breaker configuration.
    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Returns the metrics recorder for this breaker.
    pub fn metrics(&self) -> &BreakerMetrics {
        &self.metrics
    }

    /// Returns the current state, applying any elapsed cool-down or interval.
    pub fn state(&self) -> BreakerState {
        self.snapshot().state
    }

    /// Returns the counts of the current generation.
    pub fn counts(&self) -> CallCounts {
        self.snapshot().counts
    }

    /// Returns state and counts read under a single lock acquisition.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut changes = Vec::new();
        let (state, counts) = {
            let mut inner = self.lock();
            let (state, _) = inner.current_state(Instant::now(), &self.settings, &mut changes);
            (state, inner.counts)
        };
        self.notify(changes);
        BreakerSnapshot {
            name: self.settings.name.clone(),
            state,
            counts,
        }
    }

    /// Runs `call` through the breaker.
    ///
    /// Rejected calls are never started. A call that is dropped before it
    /// completes counts as a failure.
    pub async fn execute<F, Fut, T, E>(&self, call: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let generation = self.admit().map_err(|state| self.rejection(state))?;
        let mut in_flight = InFlight {
            breaker: self,
            generation,
            settled: false,
        };

        let result = call().await;
        in_flight.settle(result.is_ok());
        result.map_err(BreakerError::Call)
    }

    fn admit(&self) -> Result<u64, BreakerState> {
        let mut changes = Vec::new();
        let admitted = {
            let mut inner = self.lock();
            let (state, generation) =
                inner.current_state(Instant::now(), &self.settings, &mut changes);
            match state {
                BreakerState::Open => Err(state),
                BreakerState::HalfOpen
                    if inner.counts.requests >= self.settings.probe_budget() =>
                {
                    Err(state)
                }
                _ => {
                    inner.counts.on_request();
                    Ok(generation)
                }
            }
        };
        self.notify(changes);
        admitted
    }

    fn settle(&self, generation: u64, success: bool) {
        let mut changes = Vec::new();
        {
            let mut inner = self.lock();
            let now = Instant::now();
            let (state, current) = inner.current_state(now, &self.settings, &mut changes);
            // Outcomes from an earlier generation are stale.
            if current == generation {
                if success {
                    inner.on_success(state, now, &self.settings, &mut changes);
                } else {
                    inner.on_failure(state, now, &self.settings, &mut changes);
                }
            }
        }
        self.notify(changes);
    }

    fn rejection<E>(&self, state: BreakerState) -> BreakerError<E> {
        let name = self.settings.name.clone();
        match state {
            BreakerState::HalfOpen => BreakerError::TooManyRequests { name },
            _ => BreakerError::Open { name },
        }
    }

    fn notify(&self, changes: Vec<Transition>) {
        if changes.is_empty() {
            return;
        }
        // Reporting runs unlocked and concurrent reporters may finish out of
        // order, so the gauge is set from the stored state under the lock.
        {
            let inner = self.lock();
            self.metrics.record_state(inner.state);
        }
        for (from, to) in changes {
            tracing::info!(
                breaker = %self.settings.name,
                from_state = %from,
                to_state = %to,
                "circuit breaker state changed"
            );
            self.metrics.record_transition(from, to);
            if let Some(observer) = &self.observer {
                observer.on_state_change(&StateChange {
                    name: self.settings.name.clone(),
                    from,
                    to,
                });
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

struct InFlight<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(&mut self, success: bool) {
        self.settled = true;
        self.breaker.settle(self.generation, success);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.settle(self.generation, false);
        }
    }
}
