//! Stock ledger events. Every movement names the order line it belongs to,
//! except catalog-side replenishment.

use chrono::{DateTime, Utc};
use common::{AggregateId, OrderItemId, ProductId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StockEvent {
    StockRegistered(StockRegisteredData),
    StockReserved(StockReservedData),
    StockReleased(StockReleasedData),
    StockReplenished(StockReplenishedData),
}

impl DomainEvent for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::StockRegistered(_) => "StockRegistered",
            StockEvent::StockReserved(_) => "StockReserved",
            StockEvent::StockReleased(_) => "StockReleased",
            StockEvent::StockReplenished(_) => "StockReplenished",
        }
    }
}

/// What gave stock back to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    OrderCancelled,
    OrderReturned,
    CancellationApproved,
    ReturnRefunded,
    PaymentRefunded,
}

impl ReleaseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseReason::OrderCancelled => "order_cancelled",
            ReleaseReason::OrderReturned => "order_returned",
            ReleaseReason::CancellationApproved => "cancellation_approved",
            ReleaseReason::ReturnRefunded => "return_refunded",
            ReleaseReason::PaymentRefunded => "payment_refunded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRegisteredData {
    pub product_id: ProductId,
    pub name: String,
    pub initial_stock: u32,
    pub low_stock_threshold: u32,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReservedData {
    pub order_id: AggregateId,
    pub order_item_id: OrderItemId,
    pub quantity: u32,
    /// Stock left after the reservation.
    pub remaining: u32,
    pub reserved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReleasedData {
    pub order_id: AggregateId,
    pub order_item_id: OrderItemId,
    pub quantity: u32,
    pub reason: ReleaseReason,
    pub remaining: u32,
    pub released_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReplenishedData {
    pub quantity: u32,
    pub remaining: u32,
    pub replenished_at: DateTime<Utc>,
}
