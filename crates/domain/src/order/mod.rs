//! Order aggregate and related types.

mod adjustment;
mod aggregate;
mod events;
mod state;
mod value_objects;

pub use adjustment::{Adjustment, AdjustmentKind, AdjustmentReason, AdjustmentStatus};
pub use aggregate::Order;
pub use events::{
    AdjustmentRefundedData, AdjustmentRequestedData, AdjustmentReviewedData,
    ItemQuantityReducedData, OrderCancelledData, OrderEvent, OrderPlacedData, OrderReturnedData,
    OrderStatusChangedData, PaymentAttachedData, PaymentStatusUpdatedData, ReturnProgressData,
};
pub use state::{OrderStatus, PaymentStatus};
pub use value_objects::{Money, OrderItem, ShippingAddress};

use chrono::{DateTime, Utc};
use common::{AdjustmentId, AggregateId, OrderItemId};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order already placed")]
    AlreadyPlaced,

    #[error("Order has not been placed")]
    NotPlaced,

    #[error("Order has no items")]
    NoItems,

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    #[error("Invalid price: {price} (must be greater than 0)")]
    InvalidPrice { price: Money },

    #[error("Order total is out of range")]
    AmountOutOfRange,

    #[error("Order cannot be cancelled once it is {status}")]
    CannotCancel { status: OrderStatus },

    #[error("Cannot {action} while the order is {status}")]
    InvalidStateTransition {
        status: OrderStatus,
        action: &'static str,
    },

    #[error("Order cannot move from {from} to {to}")]
    InvalidStatusChange { from: OrderStatus, to: OrderStatus },

    #[error("Return window closed at {deadline}")]
    ReturnWindowExpired {
        delivered_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    },

    #[error("Order item not found: {order_item_id}")]
    ItemNotFound { order_item_id: OrderItemId },

    #[error("Adjustment not found: {adjustment_id}")]
    AdjustmentNotFound { adjustment_id: AdjustmentId },

    #[error("Requested quantity {requested} exceeds available quantity {available}")]
    ExceedsAvailableQuantity { requested: u32, available: u32 },

    #[error("Reason {reason:?} does not apply to a {kind}")]
    ReasonNotApplicable {
        reason: AdjustmentReason,
        kind: AdjustmentKind,
    },

    #[error("Cannot {action} an adjustment that is {status}")]
    InvalidAdjustmentTransition {
        status: AdjustmentStatus,
        action: &'static str,
    },

    /// Whole-order and item-level returns would cover the same units.
    #[error("{0}")]
    AdjustmentConflict(String),

    #[error("Refund of {refund} exceeds remaining order total {total}")]
    RefundExceedsTotal { refund: Money, total: Money },

    #[error("Order already has an active payment (payment status {payment_status})")]
    PaymentAlreadyActive { payment_status: PaymentStatus },

    #[error("Payment {payment_id} is not the active payment of this order")]
    PaymentMismatch { payment_id: AggregateId },
}
