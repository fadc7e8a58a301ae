//! Item-level cancellation and return endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{AdjustmentId, AggregateId};
use event_store::EventStore;
use fulfillment::{AdjustmentRequest, ReviewAdjustmentRequest};

use crate::AppState;
use crate::error::ApiError;
use crate::identity::{Identity, parse_id};
use crate::routes::orders::AdjustmentResponse;

fn ids(order: &str, adjustment: &str) -> Result<(AggregateId, AdjustmentId), ApiError> {
    Ok((parse_id(order, "order")?, parse_id(adjustment, "adjustment")?))
}

/// GET /orders/{id}/adjustments
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
) -> Result<Json<Vec<AdjustmentResponse>>, ApiError> {
    let order_id = parse_id(&id, "order")?;
    let adjustments = state
        .fulfillment
        .adjustments
        .list_adjustments(&actor, order_id)
        .await?;
    Ok(Json(adjustments.iter().map(AdjustmentResponse::from).collect()))
}

/// POST /orders/{id}/cancellations
#[tracing::instrument(skip(state, req))]
pub async fn request_cancellation<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
    Json(req): Json<AdjustmentRequest>,
) -> Result<(StatusCode, Json<AdjustmentResponse>), ApiError> {
    let order_id = parse_id(&id, "order")?;
    let adjustment = state
        .fulfillment
        .adjustments
        .request_cancellation(&actor, order_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(AdjustmentResponse::from(&adjustment))))
}

/// POST /orders/{id}/returns
#[tracing::instrument(skip(state, req))]
pub async fn request_return<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
    Json(req): Json<AdjustmentRequest>,
) -> Result<(StatusCode, Json<AdjustmentResponse>), ApiError> {
    let order_id = parse_id(&id, "order")?;
    let adjustment = state
        .fulfillment
        .adjustments
        .request_return(&actor, order_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(AdjustmentResponse::from(&adjustment))))
}

/// POST /orders/{id}/adjustments/{adjustment_id}/review (admin)
#[tracing::instrument(skip(state, req))]
pub async fn review<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path((id, adjustment_id)): Path<(String, String)>,
    Json(req): Json<ReviewAdjustmentRequest>,
) -> Result<Json<AdjustmentResponse>, ApiError> {
    let (order_id, adjustment_id) = ids(&id, &adjustment_id)?;
    let adjustment = state
        .fulfillment
        .adjustments
        .review(&actor, order_id, adjustment_id, req)
        .await?;
    Ok(Json(AdjustmentResponse::from(&adjustment)))
}

/// POST /orders/{id}/adjustments/{adjustment_id}/picked-up (admin)
#[tracing::instrument(skip(state))]
pub async fn picked_up<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path((id, adjustment_id)): Path<(String, String)>,
) -> Result<Json<AdjustmentResponse>, ApiError> {
    let (order_id, adjustment_id) = ids(&id, &adjustment_id)?;
    let adjustment = state
        .fulfillment
        .adjustments
        .mark_return_picked_up(&actor, order_id, adjustment_id)
        .await?;
    Ok(Json(AdjustmentResponse::from(&adjustment)))
}

/// POST /orders/{id}/adjustments/{adjustment_id}/received (admin)
#[tracing::instrument(skip(state))]
pub async fn received<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path((id, adjustment_id)): Path<(String, String)>,
) -> Result<Json<AdjustmentResponse>, ApiError> {
    let (order_id, adjustment_id) = ids(&id, &adjustment_id)?;
    let adjustment = state
        .fulfillment
        .adjustments
        .mark_return_received(&actor, order_id, adjustment_id)
        .await?;
    Ok(Json(AdjustmentResponse::from(&adjustment)))
}

/// POST /orders/{id}/adjustments/{adjustment_id}/return-refund (admin)
#[tracing::instrument(skip(state))]
pub async fn return_refund<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path((id, adjustment_id)): Path<(String, String)>,
) -> Result<Json<AdjustmentResponse>, ApiError> {
    let (order_id, adjustment_id) = ids(&id, &adjustment_id)?;
    let adjustment = state
        .fulfillment
        .adjustments
        .process_return_refund(&actor, order_id, adjustment_id)
        .await?;
    Ok(Json(AdjustmentResponse::from(&adjustment)))
}

/// POST /orders/{id}/adjustments/{adjustment_id}/cancellation-refund (admin)
#[tracing::instrument(skip(state))]
pub async fn cancellation_refund<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path((id, adjustment_id)): Path<(String, String)>,
) -> Result<Json<AdjustmentResponse>, ApiError> {
    let (order_id, adjustment_id) = ids(&id, &adjustment_id)?;
    let adjustment = state
        .fulfillment
        .adjustments
        .mark_cancellation_refunded(&actor, order_id, adjustment_id)
        .await?;
    Ok(Json(AdjustmentResponse::from(&adjustment)))
}
