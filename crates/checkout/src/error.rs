//! Order orchestration errors.

use common::{ContextError, ErrorKind, OrderId};
use domain::{DomainError, OrderStatus, PaymentStatus, ProductId, StoreError};
use serde::Serialize;
use thiserror::Error;

use crate::payment::PaymentError;

/// Why a cart line was rejected at order creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineFailureReason {
    /// The line asked for zero units.
    InvalidQuantity,
    /// The product service does not know the product.
    NotFound,
    /// The product service reported less stock than requested.
    InsufficientStock,
    /// The product service was unreachable and the quantity exceeded the fallback limit.
    FallbackRejected,
}

impl LineFailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineFailureReason::InvalidQuantity => "invalid quantity",
            LineFailureReason::NotFound => "product not found",
            LineFailureReason::InsufficientStock => "insufficient stock",
            LineFailureReason::FallbackRejected => "quantity too large while product service unavailable",
        }
    }
}

/// A rejected cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineFailure {
    pub product_id: ProductId,
    pub requested: u32,
    pub reason: LineFailureReason,
}

impl std::fmt::Display for LineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "product {}: {} (requested: {})",
            self.product_id,
            self.reason.as_str(),
            self.requested
        )
    }
}

fn join(failures: &[LineFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by [`crate::OrderOrchestrator`].
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("cannot create order: cart is empty")]
    CartEmpty,

    /// One or more cart lines failed validation; nothing was persisted.
    #[error("product validation failed: {}", join(.failures))]
    ValidationFailed { failures: Vec<LineFailure> },

    #[error("invalid order: {0}")]
    InvalidOrder(#[from] DomainError),

    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },

    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("order cannot be cancelled in status {status}")]
    OrderNotCancellable { status: OrderStatus },

    #[error("payment already processed (status {status})")]
    PaymentAlreadyProcessed { status: PaymentStatus },

    #[error("operation cancelled: {0}")]
    Cancelled(#[from] ContextError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("payment error: {0}")]
    Payment(#[from] PaymentError),
}

impl OrderError {
    /// Returns the error's kind, for dispatching in handlers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::CartEmpty
            | OrderError::ValidationFailed { .. }
            | OrderError::InvalidOrder(_)
            | OrderError::InvalidStatusTransition { .. } => ErrorKind::Validation,
            OrderError::OrderNotFound { .. } | OrderError::Store(StoreError::NotFound { .. }) => {
                ErrorKind::NotFound
            }
            OrderError::OrderNotCancellable { .. } | OrderError::PaymentAlreadyProcessed { .. } => {
                ErrorKind::Conflict
            }
            OrderError::Store(StoreError::AlreadyExists { .. }) => ErrorKind::Conflict,
            OrderError::Payment(_)
            | OrderError::Store(StoreError::Unavailable(_)) => ErrorKind::Unavailable,
            OrderError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }
}
