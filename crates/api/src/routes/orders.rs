//! Cart seeding and order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{CartItem, Money, Order, OrderStatus, PaymentStatus, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CartRequest {
    pub items: Vec<CartItemRequest>,
}

#[derive(Deserialize)]
pub struct CartItemRequest {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub price_cents: i64,
    #[serde(default)]
    pub category: String,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub payment_method: String,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub category: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            user_id: order.user_id.to_string(),
            status: order.status,
            payment_status: order.payment_status,
            payment_method: order.payment_method,
            items: order
                .items
                .into_iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    product_name: item.product_name,
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                    category: item.category,
                })
                .collect(),
            total_cents: order.total_amount.cents(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// PUT /users/:user_id/cart: replace a user's cart.
#[tracing::instrument(skip(state, req))]
pub async fn put_cart(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<CartRequest>,
) -> StatusCode {
    let items = req
        .items
        .into_iter()
        .map(|item| {
            CartItem::new(
                ProductId::new(item.product_id),
                item.product_name,
                Money::from_cents(item.price_cents),
                item.quantity,
                item.category,
            )
        })
        .collect();
    state.carts.put_cart(UserId::new(user_id), items);
    StatusCode::NO_CONTENT
}

/// POST /orders: create an order from the user's cart.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    if req.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    let order = state
        .orchestrator
        .create_order(
            &state.request_context(),
            &UserId::new(req.user_id),
            &req.payment_method,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/:id
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .orchestrator
        .get_order(&state.request_context(), order_id)
        .await?;
    Ok(Json(order.into()))
}

/// GET /users/:user_id/orders: newest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state
        .orchestrator
        .get_user_orders(&state.request_context(), &UserId::new(user_id))
        .await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// PUT /orders/:id/status
#[tracing::instrument(skip(state, req))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .orchestrator
        .update_order_status(&state.request_context(), order_id, req.status)
        .await?;
    Ok(Json(order.into()))
}

/// PUT /orders/:id/payment-status
#[tracing::instrument(skip(state, req))]
pub async fn update_payment_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePaymentStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .orchestrator
        .update_payment_status(&state.request_context(), order_id, req.payment_status)
        .await?;
    Ok(Json(order.into()))
}

/// POST /orders/:id/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .orchestrator
        .cancel_order(&state.request_context(), order_id)
        .await?;
    Ok(Json(order.into()))
}

/// POST /orders/:id/payment: charge the order through the payment executor.
#[tracing::instrument(skip(state))]
pub async fn process_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .orchestrator
        .process_payment(&state.request_context(), order_id)
        .await?;
    Ok(Json(order.into()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    OrderId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))
}
