//! Circuit breaker error types.

use thiserror::Error;

/// Errors returned by [`crate::CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker is open; the call was not attempted.
    #[error("circuit breaker '{name}' is open")]
    Open { name: String },

    /// The breaker is half-open and its probe budget is used up.
    #[error("circuit breaker '{name}' is half-open and rejecting extra probes")]
    TooManyRequests { name: String },

    /// The wrapped call ran and failed.
    #[error(transparent)]
    Call(E),
}

impl<E> BreakerError<E> {
    /// Returns true if the breaker rejected the call without running it.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BreakerError::Open { .. } | BreakerError::TooManyRequests { .. }
        )
    }

    /// Returns the inner call error, if the call ran.
    pub fn into_call_error(self) -> Option<E> {
        match self {
            BreakerError::Call(e) => Some(e),
            _ => None,
        }
    }
}
