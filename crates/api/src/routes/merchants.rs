//! Admin management of merchant accounts that receive manual payments.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use event_store::EventStore;
use fulfillment::MerchantAccount;

use crate::AppState;
use crate::error::ApiError;
use crate::identity::{Identity, parse_id};

/// GET /merchant-accounts (admin)
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
) -> Result<Json<Vec<MerchantAccount>>, ApiError> {
    actor.require_admin()?;
    Ok(Json(state.merchants.list().await))
}

/// PUT /merchant-accounts (admin): insert or replace by id.
#[tracing::instrument(skip(state, account), fields(account_id = %account.id))]
pub async fn upsert<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Json(account): Json<MerchantAccount>,
) -> Result<Json<MerchantAccount>, ApiError> {
    actor.require_admin()?;
    state.merchants.upsert(account.clone()).await;
    tracing::info!(account_type = account.account_type.as_str(), "merchant account saved");
    Ok(Json(account))
}

/// POST /merchant-accounts/{id}/primary (admin)
#[tracing::instrument(skip(state))]
pub async fn set_primary<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
) -> Result<Json<Vec<MerchantAccount>>, ApiError> {
    actor.require_admin()?;
    let account_id = parse_id(&id, "merchant account")?;
    state.merchants.set_primary(account_id).await?;
    Ok(Json(state.merchants.list().await))
}
