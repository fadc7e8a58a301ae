//! Error taxonomy returned by every fulfillment workflow.

use chrono::{DateTime, Utc};
use common::ProductId;
use domain::{DomainError, InventoryError, MerchantAccountType, OrderError, PaymentError};
use event_store::EventStoreError;
use thiserror::Error;

/// Errors surfaced to callers of the engine.
///
/// Business-rule violations carry a human-readable reason. Infrastructure
/// failures collapse into [`FulfillmentError::Internal`].
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Absent, or not owned by the caller.
    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },

    #[error("Requested quantity {requested} exceeds available quantity {available}")]
    QuantityExceedsAvailable { requested: u32, available: u32 },

    #[error("Return window expired at {deadline}")]
    WindowExpired { deadline: DateTime<Utc> },

    #[error("No active primary merchant account for {0}")]
    NoMerchantAccount(MerchantAccountType),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    AdjustmentConflict(String),

    /// Another request changed the same records first.
    #[error("{0}, please try again")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, FulfillmentError>;

impl From<DomainError> for FulfillmentError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Order(e) => e.into(),
            DomainError::Inventory(e) => e.into(),
            DomainError::Payment(e) => e.into(),
            DomainError::EventStore(e) => e.into(),
            DomainError::AggregateNotFound { aggregate_type, .. } => {
                FulfillmentError::NotFound(aggregate_type.to_string())
            }
            DomainError::Serialization(e) => {
                tracing::error!(error = %e, "event payload could not be (de)serialized");
                FulfillmentError::Internal("event serialization failed".to_string())
            }
        }
    }
}

impl From<EventStoreError> for FulfillmentError {
    fn from(err: EventStoreError) -> Self {
        if err.is_conflict() {
            metrics::counter!("concurrency_conflicts_total").increment(1);
            tracing::debug!(error = %err, "lost optimistic concurrency race");
            return FulfillmentError::Conflict("Stock or order changed concurrently".to_string());
        }
        tracing::error!(error = %err, "event store failure");
        FulfillmentError::Internal("event store unavailable".to_string())
    }
}

impl From<OrderError> for FulfillmentError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::NotPlaced => FulfillmentError::NotFound("Order".to_string()),
            OrderError::ItemNotFound { .. } => FulfillmentError::NotFound("Order item".to_string()),
            OrderError::AdjustmentNotFound { .. } => {
                FulfillmentError::NotFound("Adjustment".to_string())
            }
            OrderError::NoItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidPrice { .. }
            | OrderError::AmountOutOfRange
            | OrderError::ReasonNotApplicable { .. } => FulfillmentError::Validation(message),
            OrderError::ReturnWindowExpired { deadline, .. } => {
                FulfillmentError::WindowExpired { deadline }
            }
            OrderError::ExceedsAvailableQuantity {
                requested,
                available,
            } => FulfillmentError::QuantityExceedsAvailable {
                requested,
                available,
            },
            OrderError::AdjustmentConflict(_) | OrderError::RefundExceedsTotal { .. } => {
                FulfillmentError::AdjustmentConflict(message)
            }
            OrderError::AlreadyPlaced
            | OrderError::CannotCancel { .. }
            | OrderError::InvalidStateTransition { .. }
            | OrderError::InvalidStatusChange { .. }
            | OrderError::InvalidAdjustmentTransition { .. }
            | OrderError::PaymentAlreadyActive { .. }
            | OrderError::PaymentMismatch { .. } => FulfillmentError::InvalidState(message),
        }
    }
}

impl From<InventoryError> for FulfillmentError {
    fn from(err: InventoryError) -> Self {
        let message = err.to_string();
        match err {
            InventoryError::NotRegistered => FulfillmentError::NotFound("Product".to_string()),
            InventoryError::InsufficientStock {
                product_id,
                name,
                requested,
                available,
            } => FulfillmentError::InsufficientStock {
                product_id,
                name,
                requested,
                available,
            },
            InventoryError::InvalidQuantity { .. } => FulfillmentError::Validation(message),
            InventoryError::AlreadyRegistered { .. } => FulfillmentError::InvalidState(message),
        }
    }
}

impl From<PaymentError> for FulfillmentError {
    fn from(err: PaymentError) -> Self {
        FulfillmentError::InvalidState(err.to_string())
    }
}
