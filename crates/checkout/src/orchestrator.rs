//! Order lifecycle orchestration.

use std::sync::Arc;

use common::{OrderId, RequestContext};
use domain::{
    CartStore, Order, OrderItem, OrderStatus, OrderStore, PaymentStatus, UserId,
};
use events::{CheckoutEvent, EventPublisher, payload};
use resilience::CircuitBreaker;

use crate::catalog::ProductCatalog;
use crate::error::{LineFailure, LineFailureReason, OrderError};
use crate::payment::{PaymentExecutor, PaymentOutcome};
use crate::validation::ProductValidationClient;

/// Drives orders through their lifecycle.
///
/// Every state change is validated against the status transition table,
/// persisted, re-read and then announced as an event. Event delivery failures
/// are logged and never fail or roll back the state change that triggered
/// them.
pub struct OrderOrchestrator<C, O, P, X> {
    carts: C,
    orders: O,
    validator: ProductValidationClient<P>,
    publisher: EventPublisher,
    payments: X,
}

impl<C, O, P, X> OrderOrchestrator<C, O, P, X>
where
    C: CartStore,
    O: OrderStore,
    P: ProductCatalog,
    X: PaymentExecutor,
{
    /// Creates a new orchestrator.
    pub fn new(
        carts: C,
        orders: O,
        validator: ProductValidationClient<P>,
        publisher: EventPublisher,
        payments: X,
    ) -> Self {
        Self {
            carts,
            orders,
            validator,
            publisher,
            payments,
        }
    }

    /// Returns the breaker guarding product validation.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        self.validator.breaker()
    }

    /// Returns the event publisher.
    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Creates an order from the user's cart.
    ///
    /// Every cart line is validated; if any line fails, nothing is persisted
    /// and all failing lines are reported. Lines are priced from the
    /// validated product when available, else from the cart's cached values.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        user_id: &UserId,
        payment_method: &str,
    ) -> Result<Order, OrderError> {
        ctx.check()?;

        let cart = self.carts.get_cart(user_id).await?;
        if cart.is_empty() {
            return Err(OrderError::CartEmpty);
        }

        let mut items = Vec::with_capacity(cart.len());
        let mut failures = Vec::new();

        for line in cart {
            if line.quantity == 0 {
                failures.push(LineFailure {
                    product_id: line.product_id,
                    requested: 0,
                    reason: LineFailureReason::InvalidQuantity,
                });
                continue;
            }

            let outcome = self
                .validator
                .validate(ctx, &line.product_id, line.quantity)
                .await?;

            if !outcome.is_valid {
                let reason = if outcome.used_fallback() {
                    LineFailureReason::FallbackRejected
                } else if outcome.product.is_some() {
                    LineFailureReason::InsufficientStock
                } else {
                    LineFailureReason::NotFound
                };
                failures.push(LineFailure {
                    product_id: line.product_id,
                    requested: line.quantity,
                    reason,
                });
                continue;
            }

            let item = match outcome.product {
                Some(product) => OrderItem::new(
                    line.product_id,
                    product.name.clone(),
                    product.unit_price(),
                    line.quantity,
                    product.category,
                ),
                None => OrderItem::new(
                    line.product_id,
                    line.product_name,
                    line.price,
                    line.quantity,
                    line.category,
                ),
            };
            items.push(item);
        }

        if !failures.is_empty() {
            metrics::counter!("order_validation_failures_total").increment(failures.len() as u64);
            tracing::warn!(failed_lines = failures.len(), "order rejected by product validation");
            return Err(OrderError::ValidationFailed { failures });
        }

        let order = Order::place(user_id.clone(), items, payment_method)?;
        self.orders.create(&order).await?;
        metrics::counter!("orders_created_total").increment(1);

        self.publish(ctx, payload::order_created(self.publisher.source(), &order))
            .await;

        // The order is committed; a stale cart is only an annoyance.
        if let Err(error) = self.carts.clear_cart(user_id).await {
            tracing::warn!(%error, "failed to clear cart after order creation");
        }

        tracing::info!(
            order_id = %order.order_id,
            total_amount = %order.total_amount,
            items = order.items_count(),
            breaker_state = %self.breaker().state(),
            "order created"
        );
        Ok(order)
    }

    /// Returns an order by ID.
    pub async fn get_order(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
    ) -> Result<Order, OrderError> {
        ctx.check()?;
        self.load(order_id).await
    }

    /// Returns a user's orders, newest first.
    pub async fn get_user_orders(
        &self,
        ctx: &RequestContext,
        user_id: &UserId,
    ) -> Result<Vec<Order>, OrderError> {
        ctx.check()?;
        Ok(self.orders.list_for_user(user_id).await?)
    }

    /// Moves an order to `status` if the transition table allows it.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn update_order_status(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        ctx.check()?;

        let existing = self.load(order_id).await?;
        if !existing.status.can_transition_to(status) {
            return Err(OrderError::InvalidStatusTransition {
                from: existing.status,
                to: status,
            });
        }
        self.transition(ctx, &existing, status).await
    }

    /// Records a payment outcome.
    ///
    /// A completed payment on a pending order also confirms the order; the
    /// returned order and both events reflect the final stored state.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn update_payment_status(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
        payment_status: PaymentStatus,
    ) -> Result<Order, OrderError> {
        ctx.check()?;

        let existing = self.load(order_id).await?;
        self.orders
            .update_payment_status(order_id, payment_status)
            .await?;
        let updated = self.load(order_id).await?;

        tracing::info!(
            old_payment_status = %existing.payment_status,
            new_payment_status = %payment_status,
            "payment status updated"
        );
        self.publish(
            ctx,
            payload::payment_status_changed(
                self.publisher.source(),
                &updated,
                existing.payment_status,
            ),
        )
        .await;

        // Decided on the re-read order so a concurrent status change is not overwritten.
        if payment_status == PaymentStatus::Completed && updated.status == OrderStatus::Pending {
            match self.transition(ctx, &updated, OrderStatus::Confirmed).await {
                Ok(confirmed) => return Ok(confirmed),
                Err(error) => {
                    tracing::error!(%error, "failed to confirm order after payment");
                }
            }
        }
        Ok(updated)
    }

    /// Cancels an order that has not shipped yet.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn cancel_order(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
    ) -> Result<Order, OrderError> {
        ctx.check()?;

        let existing = self.load(order_id).await?;
        if !existing.status.can_cancel() {
            return Err(OrderError::OrderNotCancellable {
                status: existing.status,
            });
        }
        self.transition(ctx, &existing, OrderStatus::Cancelled).await
    }

    /// Charges a pending payment and records the outcome.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn process_payment(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
    ) -> Result<Order, OrderError> {
        ctx.check()?;

        let existing = self.load(order_id).await?;
        if existing.payment_status != PaymentStatus::Pending {
            return Err(OrderError::PaymentAlreadyProcessed {
                status: existing.payment_status,
            });
        }

        let payment_status = match self.payments.execute(&existing).await? {
            PaymentOutcome::Approved { payment_id } => {
                tracing::info!(%payment_id, "payment approved");
                PaymentStatus::Completed
            }
            PaymentOutcome::Declined { reason } => {
                tracing::warn!(%reason, "payment declined");
                PaymentStatus::Failed
            }
        };
        self.update_payment_status(ctx, order_id, payment_status)
            .await
    }

    async fn load(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.orders
            .get(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound { order_id })
    }

    async fn transition(
        &self,
        ctx: &RequestContext,
        existing: &Order,
        to: OrderStatus,
    ) -> Result<Order, OrderError> {
        self.orders.update_status(existing.order_id, to).await?;
        let updated = self.load(existing.order_id).await?;

        metrics::counter!(
            "order_status_transitions_total",
            "from" => existing.status.as_str(),
            "to" => to.as_str()
        )
        .increment(1);
        tracing::info!(
            order_id = %existing.order_id,
            old_status = %existing.status,
            new_status = %to,
            "order status updated"
        );

        self.publish(
            ctx,
            payload::order_status_changed(self.publisher.source(), &updated, existing.status),
        )
        .await;
        Ok(updated)
    }

    async fn publish(&self, ctx: &RequestContext, event: CheckoutEvent) {
        if let Err(error) = self.publisher.publish(ctx, &event).await {
            tracing::error!(
                event_id = %event.event_id(),
                event_type = %event.event_type(),
                attempts = error.attempts(),
                %error,
                "failed to publish event"
            );
        }
    }
}

impl<C, O, P, X> std::fmt::Debug for OrderOrchestrator<C, O, P, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderOrchestrator")
            .field("validator", &self.validator)
            .field("publisher", &self.publisher)
            .finish_non_exhaustive()
    }
}
