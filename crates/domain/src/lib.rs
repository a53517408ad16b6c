//! Checkout domain model.
//!
//! This crate provides:
//! - Order entity with its status and payment state machines
//! - Value objects (user and product IDs, money in cents, cart and order lines)
//! - Cart and order store contracts with in-memory implementations

pub mod error;
pub mod order;
pub mod store;

pub use error::{DomainError, StoreError};
pub use order::{
    CartItem, Money, Order, OrderItem, OrderStatus, PaymentStatus, ProductId, UserId,
};
pub use store::{CartStore, InMemoryCartStore, InMemoryOrderStore, OrderStore};
