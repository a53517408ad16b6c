//! Error taxonomy shared by all components.

use serde::Serialize;

/// The kind of failure an operation reports to its caller.
///
/// Each crate keeps its own error enum; this is the coarse classification
/// handlers dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The order or resource does not exist.
    NotFound,
    /// Insufficient stock, empty cart or an illegal status transition.
    Validation,
    /// The operation conflicts with the current state.
    Conflict,
    /// A dependency could not be reached.
    Unavailable,
    /// Event delivery failed.
    Transport,
    /// The caller cancelled or the deadline passed.
    Cancelled,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Returns the kind as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Transport => "transport",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
