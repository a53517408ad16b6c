//! Order entity.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{Money, OrderItem, OrderStatus, PaymentStatus, UserId};
use crate::error::DomainError;

/// A placed order.
///
/// Always holds at least one item, and `total_amount` always equals the sum
/// of the item subtotals. Status fields only change through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Places a new order in `Pending`/`Pending` with a freshly minted ID.
    pub fn place(
        user_id: UserId,
        items: Vec<OrderItem>,
        payment_method: impl Into<String>,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::NoItems);
        }
        for item in &items {
            if item.quantity == 0 {
                return Err(DomainError::InvalidQuantity {
                    product_id: item.product_id.to_string(),
                    quantity: item.quantity,
                });
            }
            if item.unit_price.is_negative() {
                return Err(DomainError::InvalidPrice {
                    product_id: item.product_id.to_string(),
                    price: item.unit_price.cents(),
                });
            }
        }

        let mut total_amount = Money::zero();
        for item in &items {
            total_amount = item
                .subtotal()
                .and_then(|subtotal| total_amount.checked_add(subtotal))
                .ok_or_else(|| DomainError::AmountOverflow {
                    product_id: item.product_id.to_string(),
                })?;
        }

        let now = Utc::now();
        Ok(Self {
            order_id: OrderId::new(),
            user_id,
            items,
            total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: payment_method.into(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns the number of order lines.
    pub fn items_count(&self) -> usize {
        self.items.len()
    }
}
