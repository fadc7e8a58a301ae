//! Order placement and whole-order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{AdjustmentId, AggregateId, OrderItemId, ProductId, UserId};
use domain::{
    Adjustment, AdjustmentKind, AdjustmentReason, AdjustmentStatus, Aggregate, Money, Order,
    OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
};
use event_store::EventStore;
use fulfillment::{
    CancelOrderRequest, PlaceOrderRequest, ReturnOrderRequest, UpdateOrderStatusRequest,
};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;
use crate::identity::{Identity, parse_id};

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Option<AggregateId>,
    pub user_id: Option<UserId>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_id: Option<AggregateId>,
    pub total_amount: Money,
    pub items: Vec<OrderItemResponse>,
    pub shipping_address: Option<ShippingAddress>,
    pub cancel_reason: Option<String>,
    pub return_reason: Option<String>,
    pub placed_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub adjustments: Vec<AdjustmentResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub original_quantity: u32,
    pub subtotal: Option<Money>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentResponse {
    pub id: AdjustmentId,
    pub kind: AdjustmentKind,
    pub order_item_id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub refund_amount: Money,
    pub reason: AdjustmentReason,
    pub details: Option<String>,
    pub status: AdjustmentStatus,
    pub requested_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl From<&Adjustment> for AdjustmentResponse {
    fn from(adjustment: &Adjustment) -> Self {
        Self {
            id: adjustment.id,
            kind: adjustment.kind,
            order_item_id: adjustment.order_item_id,
            product_id: adjustment.product_id,
            product_name: adjustment.product_name.clone(),
            quantity: adjustment.quantity,
            refund_amount: adjustment.refund_amount,
            reason: adjustment.reason,
            details: adjustment.details.clone(),
            status: adjustment.status,
            requested_at: adjustment.requested_at,
            reviewed_at: adjustment.reviewed_at,
            review_note: adjustment.review_note.clone(),
            refunded_at: adjustment.refunded_at,
        }
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            user_id: order.user_id(),
            status: order.status(),
            payment_status: order.payment_status(),
            payment_method: order.payment_method(),
            payment_id: order.payment_id(),
            total_amount: order.total_amount(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemResponse {
                    id: item.id,
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                    original_quantity: item.original_quantity,
                    subtotal: item.subtotal(),
                })
                .collect(),
            shipping_address: order.shipping_address().cloned(),
            cancel_reason: order.cancel_reason().map(String::from),
            return_reason: order.return_reason().map(String::from),
            placed_at: order.placed_at(),
            delivered_at: order.delivered_at(),
            updated_at: order.updated_at(),
            adjustments: order.adjustments().iter().map(AdjustmentResponse::from).collect(),
        }
    }
}

// -- Handlers --

/// POST /orders
#[tracing::instrument(skip(state, req))]
pub async fn place<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.fulfillment.orders.place_order(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders: the caller's orders, or every order for an admin.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.fulfillment.orders.list_orders(&actor).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&id, "order")?;
    let order = state.fulfillment.orders.get_order(&actor, order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/cancel
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&id, "order")?;
    let order = state
        .fulfillment
        .orders
        .cancel_order(&actor, order_id, req)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/return
#[tracing::instrument(skip(state, req))]
pub async fn return_order<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
    Json(req): Json<ReturnOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&id, "order")?;
    let order = state
        .fulfillment
        .orders
        .return_order(&actor, order_id, req)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// PUT /orders/{id}/status (admin)
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&id, "order")?;
    let order = state
        .fulfillment
        .orders
        .update_status(&actor, order_id, req)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}
