//! State-change notification.
//!
//! Observers are invoked after the breaker lock is released, once per edge.

use tokio::sync::mpsc;

use crate::state::BreakerState;

/// A single breaker state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub name: String,
    pub from: BreakerState,
    pub to: BreakerState,
}

/// Receives breaker state transitions.
///
/// Purely for observability: nothing an observer does can affect the
/// breaker's own state machine.
pub trait StateObserver: Send + Sync {
    fn on_state_change(&self, change: &StateChange);
}

/// Forwards transitions onto an unbounded channel drained by a separate task.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<StateChange>,
}

impl ChannelObserver {
    /// Creates an observer and the receiver it feeds.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StateChange>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StateObserver for ChannelObserver {
    fn on_state_change(&self, change: &StateChange) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(change.clone());
    }
}

impl<F> StateObserver for F
where
    F: Fn(&StateChange) + Send + Sync,
{
    fn on_state_change(&self, change: &StateChange) {
        self(change)
    }
}
