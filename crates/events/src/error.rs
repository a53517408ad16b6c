//! Event delivery error types.

use common::ContextError;
use thiserror::Error;

/// Errors raised by a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The broker could not be reached.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The broker refused the message.
    #[error("publish rejected: {0}")]
    Rejected(String),

    /// The broker did not acknowledge the message.
    #[error("publish not acknowledged: {0}")]
    Ack(String),
}

/// Errors returned by [`crate::EventPublisher`].
#[derive(Debug, Error)]
pub enum PublishError {
    /// The event could not be encoded.
    #[error("failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The caller gave up before delivery succeeded.
    #[error("event publish cancelled after {attempts} attempt(s): {cause}")]
    Cancelled { attempts: u32, cause: ContextError },

    /// Every attempt failed; carries the last transport error.
    #[error("failed to publish event after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// Publishing is switched off.
    #[error("event publishing is disabled")]
    Disabled,

    /// The transport reported itself unhealthy.
    #[error("event transport unhealthy: {0}")]
    Unhealthy(#[source] TransportError),
}

impl PublishError {
    /// Returns the number of delivery attempts made, where known.
    pub fn attempts(&self) -> u32 {
        match self {
            PublishError::Cancelled { attempts, .. } | PublishError::Exhausted { attempts, .. } => {
                *attempts
            }
            _ => 0,
        }
    }
}
