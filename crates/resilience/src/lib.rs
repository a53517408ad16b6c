//! Fault isolation for flaky downstream dependencies.
//!
//! One [`CircuitBreaker`] guards one downstream dependency. It is an explicit
//! instance owned by the composition root and shared by handle; there is no
//! global registry.
//!
//! ```text
//! Closed ──(ratio tripped)──► Open ──(cool-down)──► HalfOpen ──(probes ok)──► Closed
//!                              ▲                       │
//!                              └────(probe failed)─────┘
//! ```

pub mod breaker;
pub mod error;
pub mod monitor;
pub mod observer;
pub mod recorder;
pub mod state;

pub use breaker::{BreakerSettings, BreakerSnapshot, CircuitBreaker, TripPolicy};
pub use error::BreakerError;
pub use monitor::MetricsUpdater;
pub use observer::{ChannelObserver, StateChange, StateObserver};
pub use recorder::BreakerMetrics;
pub use state::{BreakerState, CallCounts};
