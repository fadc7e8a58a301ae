//! Payment creation, verification and refund endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use domain::{Aggregate, Money, Payment, PaymentMethod, PaymentState, ReceiverAccount};
use event_store::EventStore;
use fulfillment::{CreatePaymentRequest, RefundPaymentRequest, VerifyPaymentRequest};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;
use crate::identity::{Identity, parse_id};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: Option<AggregateId>,
    pub order_id: Option<AggregateId>,
    pub user_id: Option<UserId>,
    pub amount: Money,
    pub method: Option<PaymentMethod>,
    pub state: PaymentState,
    pub transaction_id: Option<String>,
    pub payment_proof: Option<String>,
    pub receiver_account: Option<ReceiverAccount>,
    pub verified_by: Option<UserId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_note: Option<String>,
    pub refund_amount: Option<Money>,
    pub refund_reason: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id(),
            order_id: payment.order_id(),
            user_id: payment.user_id(),
            amount: payment.amount(),
            method: payment.method(),
            state: payment.state(),
            transaction_id: payment.transaction_id().map(String::from),
            payment_proof: payment.payment_proof().map(String::from),
            receiver_account: payment.receiver_account().cloned(),
            verified_by: payment.verified_by(),
            verified_at: payment.verified_at(),
            verification_note: payment.verification_note().map(String::from),
            refund_amount: payment.refund_amount(),
            refund_reason: payment.refund_reason().map(String::from),
            refunded_at: payment.refunded_at(),
            created_at: payment.created_at(),
            updated_at: payment.updated_at(),
        }
    }
}

/// POST /orders/{id}/payment
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let order_id = parse_id(&id, "order")?;
    let payment = state
        .fulfillment
        .payments
        .create_payment(&actor, order_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(PaymentResponse::from(&payment))))
}

/// GET /orders/{id}/payment
#[tracing::instrument(skip(state))]
pub async fn for_order<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let order_id = parse_id(&id, "order")?;
    let payment = state
        .fulfillment
        .payments
        .payment_for_order(&actor, order_id)
        .await?;
    Ok(Json(PaymentResponse::from(&payment)))
}

/// GET /payments/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment_id = parse_id(&id, "payment")?;
    let payment = state
        .fulfillment
        .payments
        .get_payment(&actor, payment_id)
        .await?;
    Ok(Json(PaymentResponse::from(&payment)))
}

/// POST /payments/{id}/verify (admin)
#[tracing::instrument(skip(state, req))]
pub async fn verify<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment_id = parse_id(&id, "payment")?;
    let payment = state
        .fulfillment
        .payments
        .verify_payment(&actor, payment_id, req)
        .await?;
    Ok(Json(PaymentResponse::from(&payment)))
}

/// POST /payments/{id}/refund (admin)
#[tracing::instrument(skip(state, req))]
pub async fn refund<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(id): Path<String>,
    Json(req): Json<RefundPaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment_id = parse_id(&id, "payment")?;
    let payment = state
        .fulfillment
        .payments
        .refund_payment(&actor, payment_id, req)
        .await?;
    Ok(Json(PaymentResponse::from(&payment)))
}
