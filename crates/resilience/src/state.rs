//! Breaker state machine values and rolling call counts.

use serde::{Deserialize, Serialize};

/// The state of a circuit breaker.
///
/// State transitions:
/// ```text
/// Closed ──► Open ──► HalfOpen ──┬──► Closed
///              ▲                 │
///              └─────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Calls pass through and outcomes are counted.
    #[default]
    Closed,

    /// Calls are rejected until the cool-down elapses.
    Open,

    /// A bounded number of probe calls are let through.
    HalfOpen,
}

impl BreakerState {
    /// Returns true if the breaker rejects calls without running them.
    pub fn rejects_calls(&self) -> bool {
        matches!(self, BreakerState::Open)
    }

    /// Returns the value exported on the state gauge (0=open, 1=closed, 2=half_open).
    pub fn gauge_value(&self) -> f64 {
        match self {
            BreakerState::Open => 0.0,
            BreakerState::Closed => 1.0,
            BreakerState::HalfOpen => 2.0,
        }
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Call counts since the breaker last entered a new generation.
///
/// Cleared on every state change and whenever the closed-state counting
/// interval rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallCounts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl CallCounts {
    pub(crate) fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    pub(crate) fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    pub(crate) fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Returns failures / requests, or 0 when nothing was requested.
    pub fn failure_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            f64::from(self.total_failures) / f64::from(self.requests)
        }
    }
}
