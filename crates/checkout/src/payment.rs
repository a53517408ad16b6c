//! Payment execution strategy and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::OrderId;
use domain::{Money, Order};
use thiserror::Error;

/// The gateway's verdict on a charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The charge went through.
    Approved { payment_id: String },
    /// The charge was refused; the order's payment becomes `Failed`.
    Declined { reason: String },
}

/// Errors from a payment gateway that could not give a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// Trait for charging an order.
#[async_trait]
pub trait PaymentExecutor: Send + Sync {
    /// Charges the order's total using its payment method.
    async fn execute(&self, order: &Order) -> Result<PaymentOutcome, PaymentError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: HashMap<String, (OrderId, Money)>,
    next_id: u32,
    decline: bool,
    unavailable: bool,
}

/// In-memory payment executor with deterministic outcomes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentExecutor {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentExecutor {
    /// Creates an executor that approves every charge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the executor to decline charges.
    pub fn set_decline(&self, decline: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .decline = decline;
    }

    /// Configures the executor to fail without a verdict.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .unavailable = unavailable;
    }

    /// Returns the number of approved payments.
    pub fn payment_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .payments
            .len()
    }

    /// Returns the amount charged under the given payment ID.
    pub fn charged_amount(&self, payment_id: &str) -> Option<Money> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .payments
            .get(payment_id)
            .map(|(_, amount)| *amount)
    }
}

#[async_trait]
impl PaymentExecutor for InMemoryPaymentExecutor {
    async fn execute(&self, order: &Order) -> Result<PaymentOutcome, PaymentError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.unavailable {
            return Err(PaymentError::Unavailable("gateway offline".to_string()));
        }
        if state.decline {
            return Ok(PaymentOutcome::Declined {
                reason: "card declined".to_string(),
            });
        }

        state.next_id += 1;
        let payment_id = format!("PAY-{:04}", state.next_id);
        state
            .payments
            .insert(payment_id.clone(), (order.order_id, order.total_amount));

        Ok(PaymentOutcome::Approved { payment_id })
    }
}
