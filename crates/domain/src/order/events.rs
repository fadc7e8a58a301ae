//! Order domain events.

use chrono::{DateTime, Utc};
use common::{AdjustmentId, AggregateId, OrderItemId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::payment::PaymentMethod;

use super::{Adjustment, Money, OrderItem, OrderStatus, PaymentStatus, ShippingAddress};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was created together with all of its lines.
    OrderPlaced(OrderPlacedData),

    /// Admin moved the order to another status.
    OrderStatusChanged(OrderStatusChangedData),

    /// Customer cancelled the whole order.
    OrderCancelled(OrderCancelledData),

    /// Customer returned the whole order.
    OrderReturned(OrderReturnedData),

    /// A payment record now backs this order.
    PaymentAttached(PaymentAttachedData),

    /// Verification or refund of the backing payment changed the order.
    PaymentStatusUpdated(PaymentStatusUpdatedData),

    AdjustmentRequested(AdjustmentRequestedData),
    AdjustmentApproved(AdjustmentReviewedData),
    AdjustmentRejected(AdjustmentReviewedData),

    /// An approved partial cancellation shrank a line and the order total.
    ItemQuantityReduced(ItemQuantityReducedData),

    ReturnPickedUp(ReturnProgressData),
    ReturnReceived(ReturnProgressData),
    AdjustmentRefunded(AdjustmentRefundedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::OrderStatusChanged(_) => "OrderStatusChanged",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
            OrderEvent::OrderReturned(_) => "OrderReturned",
            OrderEvent::PaymentAttached(_) => "PaymentAttached",
            OrderEvent::PaymentStatusUpdated(_) => "PaymentStatusUpdated",
            OrderEvent::AdjustmentRequested(_) => "AdjustmentRequested",
            OrderEvent::AdjustmentApproved(_) => "AdjustmentApproved",
            OrderEvent::AdjustmentRejected(_) => "AdjustmentRejected",
            OrderEvent::ItemQuantityReduced(_) => "ItemQuantityReduced",
            OrderEvent::ReturnPickedUp(_) => "ReturnPickedUp",
            OrderEvent::ReturnReceived(_) => "ReturnReceived",
            OrderEvent::AdjustmentRefunded(_) => "AdjustmentRefunded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: AggregateId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChangedData {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub changed_by: UserId,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub reason: Option<String>,
    pub cancelled_by: UserId,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReturnedData {
    pub reason: String,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAttachedData {
    pub payment_id: AggregateId,
    pub method: PaymentMethod,
    pub attached_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusUpdatedData {
    pub payment_id: AggregateId,
    pub payment_status: PaymentStatus,
    /// Order status after the update (unchanged when the payment does not move it).
    pub order_status: OrderStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentRequestedData {
    pub adjustment: Adjustment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentReviewedData {
    pub adjustment_id: AdjustmentId,
    pub reviewed_by: UserId,
    pub note: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemQuantityReducedData {
    pub adjustment_id: AdjustmentId,
    pub order_item_id: OrderItemId,
    pub quantity: u32,
    pub refund_amount: Money,
    pub reduced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnProgressData {
    pub adjustment_id: AdjustmentId,
    pub recorded_by: UserId,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentRefundedData {
    pub adjustment_id: AdjustmentId,
    pub refunded_by: UserId,
    pub refunded_at: DateTime<Utc>,
}
