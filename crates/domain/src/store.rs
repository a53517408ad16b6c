//! Store contracts for carts and orders, with in-memory implementations.
//!
//! Storage engines live outside this workspace; the orchestrator only needs
//! single-key reads and writes. The in-memory stores back tests and the
//! default binary wiring.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;

use crate::error::StoreError;
use crate::order::{CartItem, Order, OrderStatus, PaymentStatus, UserId};

/// Read and clear access to shopper carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the cart lines for a user; an unknown user has an empty cart.
    async fn get_cart(&self, user_id: &UserId) -> Result<Vec<CartItem>, StoreError>;

    /// Removes every line from a user's cart.
    async fn clear_cart(&self, user_id: &UserId) -> Result<(), StoreError>;
}

/// Persistence for placed orders.
///
/// Status updates refresh `updated_at`.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: &Order) -> Result<(), StoreError>;

    /// Returns the order, or `None` if it does not exist.
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Returns a user's orders, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, StoreError>;

    async fn update_status(&self, order_id: OrderId, status: OrderStatus)
    -> Result<(), StoreError>;

    async fn update_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<(), StoreError>;
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<UserId, Vec<CartItem>>,
    fail_on_get: bool,
    fail_on_clear: bool,
}

/// In-memory cart store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartStore {
    /// Creates an empty cart store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a user's cart.
    pub fn put_cart(&self, user_id: UserId, items: Vec<CartItem>) {
        write(&self.state).carts.insert(user_id, items);
    }

    /// Appends a line to a user's cart.
    pub fn add_item(&self, user_id: UserId, item: CartItem) {
        write(&self.state).carts.entry(user_id).or_default().push(item);
    }

    /// Returns the number of lines in a user's cart.
    pub fn cart_len(&self, user_id: &UserId) -> usize {
        read(&self.state).carts.get(user_id).map_or(0, Vec::len)
    }

    /// Configures reads to fail.
    pub fn set_fail_on_get(&self, fail: bool) {
        write(&self.state).fail_on_get = fail;
    }

    /// Configures clears to fail.
    pub fn set_fail_on_clear(&self, fail: bool) {
        write(&self.state).fail_on_clear = fail;
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn get_cart(&self, user_id: &UserId) -> Result<Vec<CartItem>, StoreError> {
        let state = read(&self.state);
        if state.fail_on_get {
            return Err(StoreError::Unavailable("cart store offline".to_string()));
        }
        Ok(state.carts.get(user_id).cloned().unwrap_or_default())
    }

    async fn clear_cart(&self, user_id: &UserId) -> Result<(), StoreError> {
        let mut state = write(&self.state);
        if state.fail_on_clear {
            return Err(StoreError::Unavailable("cart store offline".to_string()));
        }
        state.carts.remove(user_id);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, Order>,
    fail_on_create: bool,
    fail_on_update: bool,
}

/// In-memory order store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderStore {
    /// Creates an empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub fn len(&self) -> usize {
        read(&self.state).orders.len()
    }

    /// Returns true if no orders are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configures creates to fail.
    pub fn set_fail_on_create(&self, fail: bool) {
        write(&self.state).fail_on_create = fail;
    }

    /// Configures status updates to fail.
    pub fn set_fail_on_update(&self, fail: bool) {
        write(&self.state).fail_on_update = fail;
    }

    fn update<F>(&self, order_id: OrderId, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Order),
    {
        let mut state = write(&self.state);
        if state.fail_on_update {
            return Err(StoreError::Unavailable("order store offline".to_string()));
        }
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::NotFound {
                key: order_id.to_string(),
            })?;
        apply(order);
        order.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        let mut state = write(&self.state);
        if state.fail_on_create {
            return Err(StoreError::Unavailable("order store offline".to_string()));
        }
        if state.orders.contains_key(&order.order_id) {
            return Err(StoreError::AlreadyExists {
                key: order.order_id.to_string(),
            });
        }
        state.orders.insert(order.order_id, order.clone());
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(read(&self.state).orders.get(&order_id).cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = read(&self.state)
            .orders
            .values()
            .filter(|order| &order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), StoreError> {
        self.update(order_id, |order| order.status = status)
    }

    async fn update_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<(), StoreError> {
        self.update(order_id, |order| order.payment_status = status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Money, OrderItem};

    fn order_for(user: &str) -> Order {
        let items = vec![OrderItem::new(
            "SKU-001",
            "Widget",
            Money::from_cents(500),
            1,
            "tools",
        )];
        Order::place(UserId::new(user), items, "credit_card").unwrap()
    }

    #[tokio::test]
    async fn test_cart_get_and_clear() {
        let store = InMemoryCartStore::new();
        let user = UserId::new("user-1");
        assert!(store.get_cart(&user).await.unwrap().is_empty());

        store.add_item(
            user.clone(),
            CartItem::new("SKU-001", "Widget", Money::from_cents(500), 2, "tools"),
        );
        assert_eq!(store.get_cart(&user).await.unwrap().len(), 1);

        store.clear_cart(&user).await.unwrap();
        assert_eq!(store.cart_len(&user), 0);
    }

    #[tokio::test]
    async fn test_cart_failure_toggles() {
        let store = InMemoryCartStore::new();
        let user = UserId::new("user-1");
        store.set_fail_on_get(true);
        assert!(store.get_cart(&user).await.is_err());

        store.set_fail_on_clear(true);
        assert!(matches!(
            store.clear_cart(&user).await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_order_create_and_get() {
        let store = InMemoryOrderStore::new();
        let order = order_for("user-1");
        store.create(&order).await.unwrap();

        assert_eq!(store.get(order.order_id).await.unwrap(), Some(order.clone()));
        assert_eq!(store.get(OrderId::new()).await.unwrap(), None);
        assert!(matches!(
            store.create(&order).await,
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_updates_refresh_updated_at() {
        let store = InMemoryOrderStore::new();
        let order = order_for("user-1");
        store.create(&order).await.unwrap();

        store
            .update_status(order.order_id, OrderStatus::Confirmed)
            .await
            .unwrap();
        store
            .update_payment_status(order.order_id, PaymentStatus::Completed)
            .await
            .unwrap();

        let stored = store.get(order.order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Confirmed);
        assert_eq!(stored.payment_status, PaymentStatus::Completed);
        assert!(stored.updated_at >= order.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_order() {
        let store = InMemoryOrderStore::new();
        let result = store
            .update_status(OrderId::new(), OrderStatus::Confirmed)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_for_user_filters() {
        let store = InMemoryOrderStore::new();
        store.create(&order_for("user-1")).await.unwrap();
        store.create(&order_for("user-1")).await.unwrap();
        store.create(&order_for("user-2")).await.unwrap();

        let orders = store.list_for_user(&UserId::new("user-1")).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.user_id.as_str() == "user-1"));
        assert!(orders[0].created_at >= orders[1].created_at);
    }
}
