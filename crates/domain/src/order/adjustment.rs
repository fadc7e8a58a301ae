//! Partial cancellation and partial return records.

use chrono::{DateTime, Utc};
use common::{AdjustmentId, OrderItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Cancellation,
    Return,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::Cancellation => "cancellation",
            AdjustmentKind::Return => "return",
        }
    }
}

impl std::fmt::Display for AdjustmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the customer wants part of an item back or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    ChangedMind,
    OrderedByMistake,
    FoundBetterPrice,
    DeliveryDelay,
    Defective,
    Damaged,
    WrongItem,
    NotAsDescribed,
    SizeIssue,
    Other,
}

impl AdjustmentReason {
    /// Pre-shipment reasons make no sense for returns and vice versa.
    pub fn applies_to(&self, kind: AdjustmentKind) -> bool {
        use AdjustmentReason::*;
        match self {
            ChangedMind | Other => true,
            OrderedByMistake | FoundBetterPrice | DeliveryDelay => {
                kind == AdjustmentKind::Cancellation
            }
            Defective | Damaged | WrongItem | NotAsDescribed | SizeIssue => {
                kind == AdjustmentKind::Return
            }
        }
    }
}

/// ```text
/// cancellation: Requested ──► Approved ──► Refunded
/// return:       Requested ──► Approved ──► PickedUp ──► Received ──► Refunded
/// both:         Requested ──► Rejected
/// ```
///
/// A return may be refunded from `Approved`, `PickedUp` or `Received`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentStatus {
    Requested,
    Approved,
    Rejected,
    PickedUp,
    Received,
    Refunded,
}

impl AdjustmentStatus {
    /// Every status except `Rejected` holds quantity against the item.
    pub fn holds_quantity(&self) -> bool {
        !matches!(self, AdjustmentStatus::Rejected)
    }

    /// Approved or further along: the customer is owed this refund.
    pub fn owes_refund(&self) -> bool {
        !matches!(self, AdjustmentStatus::Requested | AdjustmentStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentStatus::Requested => "requested",
            AdjustmentStatus::Approved => "approved",
            AdjustmentStatus::Rejected => "rejected",
            AdjustmentStatus::PickedUp => "picked_up",
            AdjustmentStatus::Received => "received",
            AdjustmentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for AdjustmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request to cancel or return part of one order line.
///
/// Product name and price are kept on the record because the line itself
/// disappears once a cancellation shrinks it to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub id: AdjustmentId,
    pub kind: AdjustmentKind,
    pub order_item_id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub refund_amount: Money,
    pub reason: AdjustmentReason,
    pub details: Option<String>,
    pub status: AdjustmentStatus,
    pub requested_by: UserId,
    pub requested_at: DateTime<Utc>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl Adjustment {
    pub fn is_pending(&self) -> bool {
        self.status == AdjustmentStatus::Requested
    }

    /// True if a refund may be recorded from the current status.
    pub fn can_refund(&self) -> bool {
        match self.kind {
            AdjustmentKind::Cancellation => self.status == AdjustmentStatus::Approved,
            AdjustmentKind::Return => matches!(
                self.status,
                AdjustmentStatus::Approved | AdjustmentStatus::PickedUp | AdjustmentStatus::Received
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_scoped_by_kind() {
        assert!(AdjustmentReason::ChangedMind.applies_to(AdjustmentKind::Return));
        assert!(AdjustmentReason::ChangedMind.applies_to(AdjustmentKind::Cancellation));
        assert!(AdjustmentReason::Defective.applies_to(AdjustmentKind::Return));
        assert!(!AdjustmentReason::Defective.applies_to(AdjustmentKind::Cancellation));
        assert!(!AdjustmentReason::FoundBetterPrice.applies_to(AdjustmentKind::Return));
    }

    #[test]
    fn only_rejection_frees_quantity() {
        assert!(AdjustmentStatus::Requested.holds_quantity());
        assert!(AdjustmentStatus::Refunded.holds_quantity());
        assert!(!AdjustmentStatus::Rejected.holds_quantity());
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&AdjustmentStatus::PickedUp).unwrap(),
            "\"picked_up\""
        );
        assert_eq!(AdjustmentStatus::PickedUp.to_string(), "picked_up");
    }
}
