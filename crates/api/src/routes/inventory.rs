//! Inventory Ledger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use event_store::EventStore;
use fulfillment::{RegisterProductRequest, RestockRequest, StockLevel};

use crate::AppState;
use crate::error::ApiError;
use crate::identity::{Identity, parse_id};

/// POST /inventory (admin)
#[tracing::instrument(skip(state, req))]
pub async fn register<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Json(req): Json<RegisterProductRequest>,
) -> Result<(StatusCode, Json<StockLevel>), ApiError> {
    let level = state
        .fulfillment
        .inventory
        .register_product(&actor, req)
        .await?;
    Ok((StatusCode::CREATED, Json(level)))
}

/// GET /inventory/{product_id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(_actor): Identity,
    Path(id): Path<String>,
) -> Result<Json<StockLevel>, ApiError> {
    let product_id = parse_id(&id, "product")?;
    let level = state.fulfillment.inventory.stock_level(product_id).await?;
    Ok(Json(level))
}

/// POST /inventory/{product_id}/restock (admin)
#[tracing::instrument(skip(state, req))]
pub async fn restock<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<StockLevel>, ApiError> {
    let product_id = parse_id(&id, "product")?;
    let level = state
        .fulfillment
        .inventory
        .restock(&actor, product_id, req)
        .await?;
    Ok(Json(level))
}
