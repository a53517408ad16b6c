//! Domain error types.

use thiserror::Error;

/// Business-rule violations raised while building domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// An order must have at least one item.
    #[error("order has no items")]
    NoItems,

    /// Item quantities must be positive.
    #[error("invalid quantity for product {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: String, quantity: u32 },

    /// Item prices must not be negative.
    #[error("invalid price for product {product_id}: {price} cents")]
    InvalidPrice { product_id: String, price: i64 },

    /// A line subtotal or the order total does not fit in cents.
    #[error("order amount overflows for product {product_id}")]
    AmountOverflow { product_id: String },
}

/// Errors reported by cart and order store collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("record not found: {key}")]
    NotFound { key: String },

    /// A record with the same key already exists.
    #[error("record already exists: {key}")]
    AlreadyExists { key: String },

    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
