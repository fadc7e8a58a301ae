//! Order aggregate implementation.

use chrono::{DateTime, Duration, Utc};
use common::{AdjustmentId, AggregateId, OrderItemId, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, SnapshotCapable};
use crate::payment::{PaymentMethod, VerificationOutcome};

use super::{
    Adjustment, AdjustmentKind, AdjustmentReason, AdjustmentStatus, Money, OrderError, OrderEvent,
    OrderItem, OrderStatus, PaymentStatus, ShippingAddress,
    events::{
        AdjustmentRefundedData, AdjustmentRequestedData, AdjustmentReviewedData,
        ItemQuantityReducedData, OrderCancelledData, OrderPlacedData, OrderReturnedData,
        OrderStatusChangedData, PaymentAttachedData, PaymentStatusUpdatedData, ReturnProgressData,
    },
};

/// Order aggregate root.
///
/// Owns its lines and every adjustment record raised against them, so a
/// partial cancellation approval (adjustment status, line shrink, total
/// decrement) is a single append to this stream. Stock movements happen on
/// the `StockItem` streams in the same commit.
///
/// `total_amount` always equals the sum of the live line subtotals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    user_id: Option<UserId>,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_method: Option<PaymentMethod>,
    payment_id: Option<AggregateId>,
    shipping_address: Option<ShippingAddress>,
    items: Vec<OrderItem>,
    adjustments: Vec<Adjustment>,
    total_amount: Money,
    cancel_reason: Option<String>,
    return_reason: Option<String>,
    return_requested_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    placed_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(data),
            OrderEvent::OrderStatusChanged(data) => {
                self.status = data.to;
                if data.to == OrderStatus::Delivered {
                    self.delivered_at = Some(data.changed_at);
                }
                self.updated_at = Some(data.changed_at);
            }
            OrderEvent::OrderCancelled(data) => {
                self.status = OrderStatus::Cancelled;
                self.cancel_reason = data.reason;
                self.updated_at = Some(data.cancelled_at);
            }
            OrderEvent::OrderReturned(data) => {
                self.status = OrderStatus::Returned;
                self.return_reason = Some(data.reason);
                self.return_requested_at = Some(data.requested_at);
                self.updated_at = Some(data.requested_at);
            }
            OrderEvent::PaymentAttached(data) => {
                self.payment_id = Some(data.payment_id);
                self.payment_method = Some(data.method);
                self.payment_status = PaymentStatus::Pending;
                self.updated_at = Some(data.attached_at);
            }
            OrderEvent::PaymentStatusUpdated(data) => {
                self.payment_status = data.payment_status;
                self.status = data.order_status;
                self.updated_at = Some(data.updated_at);
            }
            OrderEvent::AdjustmentRequested(data) => {
                self.updated_at = Some(data.adjustment.requested_at);
                self.adjustments.push(data.adjustment);
            }
            OrderEvent::AdjustmentApproved(data) => {
                self.apply_review(data, AdjustmentStatus::Approved)
            }
            OrderEvent::AdjustmentRejected(data) => {
                self.apply_review(data, AdjustmentStatus::Rejected)
            }
            OrderEvent::ItemQuantityReduced(data) => self.apply_item_reduced(data),
            OrderEvent::ReturnPickedUp(data) => {
                if let Some(adjustment) = self.adjustment_mut(data.adjustment_id) {
                    adjustment.status = AdjustmentStatus::PickedUp;
                    adjustment.picked_up_at = Some(data.at);
                }
                self.updated_at = Some(data.at);
            }
            OrderEvent::ReturnReceived(data) => {
                if let Some(adjustment) = self.adjustment_mut(data.adjustment_id) {
                    adjustment.status = AdjustmentStatus::Received;
                    adjustment.received_at = Some(data.at);
                }
                self.updated_at = Some(data.at);
            }
            OrderEvent::AdjustmentRefunded(data) => {
                if let Some(adjustment) = self.adjustment_mut(data.adjustment_id) {
                    adjustment.status = AdjustmentStatus::Refunded;
                    adjustment.refunded_at = Some(data.refunded_at);
                }
                self.updated_at = Some(data.refunded_at);
            }
        }
    }
}

impl SnapshotCapable for Order {
    fn snapshot_interval() -> usize {
        50
    }
}

// Query methods
impl Order {
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == Some(user_id)
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn payment_id(&self) -> Option<AggregateId> {
        self.payment_id
    }

    pub fn shipping_address(&self) -> Option<&ShippingAddress> {
        self.shipping_address.as_ref()
    }

    /// Lines that still have quantity. Lines shrunk to zero are gone.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn item(&self, order_item_id: OrderItemId) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == order_item_id)
    }

    pub fn adjustments(&self) -> &[Adjustment] {
        &self.adjustments
    }

    pub fn adjustment(&self, adjustment_id: AdjustmentId) -> Option<&Adjustment> {
        self.adjustments.iter().find(|a| a.id == adjustment_id)
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn return_reason(&self) -> Option<&str> {
        self.return_reason.as_deref()
    }

    pub fn return_requested_at(&self) -> Option<DateTime<Utc>> {
        self.return_requested_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Units of a line not yet claimed by any adjustment.
    ///
    /// Every adjustment that has not been rejected counts, including pending
    /// requests, so two requests can never claim the same unit.
    pub fn available_quantity(&self, order_item_id: OrderItemId) -> u32 {
        let Some(item) = self.item(order_item_id) else {
            return 0;
        };
        let claimed: u32 = self
            .adjustments
            .iter()
            .filter(|a| a.order_item_id == order_item_id && a.status.holds_quantity())
            .map(|a| a.quantity)
            .sum();
        item.original_quantity.saturating_sub(claimed)
    }

    /// Item-level returns that are still in flight or done.
    pub fn has_item_returns(&self) -> bool {
        self.adjustments
            .iter()
            .any(|a| a.kind == AdjustmentKind::Return && a.status.holds_quantity())
    }

    /// Last instant before which a return may still be requested.
    pub fn return_deadline(&self, window: Duration) -> Option<DateTime<Utc>> {
        self.delivered_at.map(|at| at + window)
    }

    fn ensure_placed(&self) -> Result<(), OrderError> {
        if self.id.is_none() {
            return Err(OrderError::NotPlaced);
        }
        Ok(())
    }

    /// Accepted iff `now < delivered_at + window`.
    fn ensure_within_return_window(
        &self,
        window: Duration,
        now: DateTime<Utc>,
        action: &'static str,
    ) -> Result<(), OrderError> {
        let (Some(delivered_at), Some(deadline)) =
            (self.delivered_at, self.return_deadline(window))
        else {
            return Err(OrderError::InvalidStateTransition {
                status: self.status,
                action,
            });
        };
        if now >= deadline {
            return Err(OrderError::ReturnWindowExpired {
                delivered_at,
                deadline,
            });
        }
        Ok(())
    }

    fn ensure_no_item_returns(&self) -> Result<(), OrderError> {
        if self.has_item_returns() {
            return Err(OrderError::AdjustmentConflict(
                "order has item-level returns; resolve or reject them before returning the whole order"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn find_adjustment(&self, adjustment_id: AdjustmentId) -> Result<&Adjustment, OrderError> {
        self.adjustment(adjustment_id)
            .ok_or(OrderError::AdjustmentNotFound { adjustment_id })
    }

    fn ensure_active_payment(&self, payment_id: AggregateId) -> Result<(), OrderError> {
        if self.payment_id != Some(payment_id) {
            return Err(OrderError::PaymentMismatch { payment_id });
        }
        Ok(())
    }
}

// Command methods (return events)
impl Order {
    /// Creates the order with all of its lines.
    pub fn place(
        &self,
        order_id: AggregateId,
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        for item in &items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    quantity: item.quantity,
                });
            }
            if !item.unit_price.is_positive() {
                return Err(OrderError::InvalidPrice {
                    price: item.unit_price,
                });
            }
        }

        let total_amount = Money::checked_sum(items.iter().map(OrderItem::subtotal))
            .ok_or(OrderError::AmountOutOfRange)?;
        Ok(vec![OrderEvent::OrderPlaced(OrderPlacedData {
            order_id,
            user_id,
            items,
            total_amount,
            payment_method,
            shipping_address,
            placed_at: now,
        })])
    }

    /// Customer cancels the whole order. Only before shipping.
    pub fn cancel(
        &self,
        cancelled_by: UserId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        if !self.status.can_cancel() {
            return Err(OrderError::CannotCancel {
                status: self.status,
            });
        }

        Ok(vec![OrderEvent::OrderCancelled(OrderCancelledData {
            reason,
            cancelled_by,
            cancelled_at: now,
        })])
    }

    /// Customer returns the whole order within `window` of delivery.
    pub fn request_return(
        &self,
        reason: impl Into<String>,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        if !self.status.can_return() {
            return Err(OrderError::InvalidStateTransition {
                status: self.status,
                action: "return the order",
            });
        }
        self.ensure_within_return_window(window, now, "return the order")?;
        self.ensure_no_item_returns()?;

        Ok(vec![OrderEvent::OrderReturned(OrderReturnedData {
            reason: reason.into(),
            requested_at: now,
        })])
    }

    /// Admin status change. Setting the current status again records nothing.
    pub fn update_status(
        &self,
        target: OrderStatus,
        changed_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        if target == self.status {
            return Ok(vec![]);
        }
        if !self.status.can_transition_to(target) {
            return Err(OrderError::InvalidStatusChange {
                from: self.status,
                to: target,
            });
        }
        if target == OrderStatus::Returned {
            self.ensure_no_item_returns()?;
        }

        Ok(vec![OrderEvent::OrderStatusChanged(OrderStatusChangedData {
            from: self.status,
            to: target,
            changed_by,
            changed_at: now,
        })])
    }

    /// Links a new payment record. A failed payment may be replaced; a
    /// pending or settled one may not.
    pub fn attach_payment(
        &self,
        payment_id: AggregateId,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        if self.status.is_terminal() {
            return Err(OrderError::InvalidStateTransition {
                status: self.status,
                action: "create a payment",
            });
        }
        let replaceable = match self.payment_status {
            PaymentStatus::Pending => self.payment_id.is_none(),
            PaymentStatus::Failed => true,
            PaymentStatus::Paid | PaymentStatus::Refunded => false,
        };
        if !replaceable {
            return Err(OrderError::PaymentAlreadyActive {
                payment_status: self.payment_status,
            });
        }

        Ok(vec![OrderEvent::PaymentAttached(PaymentAttachedData {
            payment_id,
            method,
            attached_at: now,
        })])
    }

    /// Mirrors a verification decision. A completed payment advances a
    /// `placed` order to `processing`; a failed one leaves the status alone.
    pub fn settle_payment(
        &self,
        payment_id: AggregateId,
        outcome: VerificationOutcome,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        self.ensure_active_payment(payment_id)?;
        if self.payment_status != PaymentStatus::Pending {
            return Err(OrderError::PaymentAlreadyActive {
                payment_status: self.payment_status,
            });
        }

        let (payment_status, order_status) = match outcome {
            VerificationOutcome::Completed if self.status == OrderStatus::Placed => {
                (PaymentStatus::Paid, OrderStatus::Processing)
            }
            VerificationOutcome::Completed => (PaymentStatus::Paid, self.status),
            VerificationOutcome::Failed => (PaymentStatus::Failed, self.status),
        };

        Ok(vec![OrderEvent::PaymentStatusUpdated(
            PaymentStatusUpdatedData {
                payment_id,
                payment_status,
                order_status,
                updated_at: now,
            },
        )])
    }

    /// Whole-payment refund voids the order. A returned order keeps its status.
    pub fn refund_payment(
        &self,
        payment_id: AggregateId,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        self.ensure_active_payment(payment_id)?;
        if self.payment_status != PaymentStatus::Paid {
            return Err(OrderError::InvalidStateTransition {
                status: self.status,
                action: "refund an unpaid order",
            });
        }

        let order_status = match self.status {
            OrderStatus::Returned => OrderStatus::Returned,
            _ => OrderStatus::Cancelled,
        };

        Ok(vec![OrderEvent::PaymentStatusUpdated(
            PaymentStatusUpdatedData {
                payment_id,
                payment_status: PaymentStatus::Refunded,
                order_status,
                updated_at: now,
            },
        )])
    }

    /// What a whole-payment refund may still pay back out of `paid`.
    ///
    /// Approved cancellations have already lowered the total, and approved
    /// returns are paid out on their own records, so neither is refunded
    /// twice. Fails when item-level refunds already cover the payment.
    pub fn payment_refund_due(&self, paid: Money) -> Result<Money, OrderError> {
        let returns = Money::checked_sum(
            self.adjustments
                .iter()
                .filter(|a| a.kind == AdjustmentKind::Return && a.status.owes_refund())
                .map(|a| Some(a.refund_amount)),
        )
        .ok_or(OrderError::AmountOutOfRange)?;
        let due = paid
            .min(self.total_amount)
            .checked_sub(returns)
            .ok_or(OrderError::AmountOutOfRange)?;
        if !due.is_positive() {
            return Err(OrderError::AdjustmentConflict(format!(
                "Item-level refunds already cover the payment of {paid}"
            )));
        }
        Ok(due)
    }

    /// Opens a partial cancellation or partial return on one line.
    #[allow(clippy::too_many_arguments)]
    pub fn request_adjustment(
        &self,
        adjustment_id: AdjustmentId,
        kind: AdjustmentKind,
        order_item_id: OrderItemId,
        quantity: u32,
        reason: AdjustmentReason,
        details: Option<String>,
        requested_by: UserId,
        return_window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }
        if !reason.applies_to(kind) {
            return Err(OrderError::ReasonNotApplicable { reason, kind });
        }

        match kind {
            AdjustmentKind::Cancellation => {
                if !self.status.can_cancel() {
                    return Err(OrderError::InvalidStateTransition {
                        status: self.status,
                        action: "request a partial cancellation",
                    });
                }
            }
            AdjustmentKind::Return => {
                if !self.status.can_return() {
                    return Err(OrderError::InvalidStateTransition {
                        status: self.status,
                        action: "request a partial return",
                    });
                }
                self.ensure_within_return_window(return_window, now, "request a partial return")?;
            }
        }

        let item = self
            .item(order_item_id)
            .ok_or(OrderError::ItemNotFound { order_item_id })?;
        let available = self.available_quantity(order_item_id);
        if quantity > available {
            return Err(OrderError::ExceedsAvailableQuantity {
                requested: quantity,
                available,
            });
        }

        let adjustment = Adjustment {
            id: adjustment_id,
            kind,
            order_item_id,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            unit_price: item.unit_price,
            quantity,
            refund_amount: item
                .unit_price
                .checked_times(quantity)
                .ok_or(OrderError::AmountOutOfRange)?,
            reason,
            details,
            status: AdjustmentStatus::Requested,
            requested_by,
            requested_at: now,
            reviewed_by: None,
            reviewed_at: None,
            review_note: None,
            picked_up_at: None,
            received_at: None,
            refunded_at: None,
        };

        Ok(vec![OrderEvent::AdjustmentRequested(
            AdjustmentRequestedData { adjustment },
        )])
    }

    /// Approves a pending adjustment.
    ///
    /// A cancellation also shrinks its line and the order total in the same
    /// batch of events. A return only changes status; stock comes back at
    /// refund time.
    pub fn approve_adjustment(
        &self,
        adjustment_id: AdjustmentId,
        reviewed_by: UserId,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        let adjustment = self.find_adjustment(adjustment_id)?;
        if !adjustment.is_pending() {
            return Err(OrderError::InvalidAdjustmentTransition {
                status: adjustment.status,
                action: "approve",
            });
        }

        let approved = OrderEvent::AdjustmentApproved(AdjustmentReviewedData {
            adjustment_id,
            reviewed_by,
            note,
            reviewed_at: now,
        });

        match adjustment.kind {
            AdjustmentKind::Cancellation => {
                if !self.status.can_cancel() {
                    return Err(OrderError::InvalidStateTransition {
                        status: self.status,
                        action: "approve a partial cancellation",
                    });
                }
                let item = self.item(adjustment.order_item_id).ok_or(
                    OrderError::ItemNotFound {
                        order_item_id: adjustment.order_item_id,
                    },
                )?;
                if adjustment.quantity > item.quantity {
                    return Err(OrderError::ExceedsAvailableQuantity {
                        requested: adjustment.quantity,
                        available: item.quantity,
                    });
                }
                if adjustment.refund_amount > self.total_amount {
                    return Err(OrderError::RefundExceedsTotal {
                        refund: adjustment.refund_amount,
                        total: self.total_amount,
                    });
                }

                Ok(vec![
                    approved,
                    OrderEvent::ItemQuantityReduced(ItemQuantityReducedData {
                        adjustment_id,
                        order_item_id: adjustment.order_item_id,
                        quantity: adjustment.quantity,
                        refund_amount: adjustment.refund_amount,
                        reduced_at: now,
                    }),
                ])
            }
            AdjustmentKind::Return => {
                if !self.status.can_return() {
                    return Err(OrderError::InvalidStateTransition {
                        status: self.status,
                        action: "approve a partial return",
                    });
                }
                Ok(vec![approved])
            }
        }
    }

    /// Rejects a pending adjustment, freeing its quantity.
    pub fn reject_adjustment(
        &self,
        adjustment_id: AdjustmentId,
        reviewed_by: UserId,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        let adjustment = self.find_adjustment(adjustment_id)?;
        if !adjustment.is_pending() {
            return Err(OrderError::InvalidAdjustmentTransition {
                status: adjustment.status,
                action: "reject",
            });
        }

        Ok(vec![OrderEvent::AdjustmentRejected(AdjustmentReviewedData {
            adjustment_id,
            reviewed_by,
            note,
            reviewed_at: now,
        })])
    }

    pub fn mark_return_picked_up(
        &self,
        adjustment_id: AdjustmentId,
        recorded_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        let adjustment = self.find_adjustment(adjustment_id)?;
        if adjustment.kind != AdjustmentKind::Return
            || adjustment.status != AdjustmentStatus::Approved
        {
            return Err(OrderError::InvalidAdjustmentTransition {
                status: adjustment.status,
                action: "mark as picked up",
            });
        }

        Ok(vec![OrderEvent::ReturnPickedUp(ReturnProgressData {
            adjustment_id,
            recorded_by,
            at: now,
        })])
    }

    pub fn mark_return_received(
        &self,
        adjustment_id: AdjustmentId,
        recorded_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        let adjustment = self.find_adjustment(adjustment_id)?;
        let receivable = matches!(
            adjustment.status,
            AdjustmentStatus::Approved | AdjustmentStatus::PickedUp
        );
        if adjustment.kind != AdjustmentKind::Return || !receivable {
            return Err(OrderError::InvalidAdjustmentTransition {
                status: adjustment.status,
                action: "mark as received",
            });
        }

        Ok(vec![OrderEvent::ReturnReceived(ReturnProgressData {
            adjustment_id,
            recorded_by,
            at: now,
        })])
    }

    /// Records the out-of-band refund of an adjustment. Never touches the
    /// order total: cancellations already reduced it at approval.
    pub fn refund_adjustment(
        &self,
        adjustment_id: AdjustmentId,
        refunded_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        let adjustment = self.find_adjustment(adjustment_id)?;
        if !adjustment.can_refund() {
            return Err(OrderError::InvalidAdjustmentTransition {
                status: adjustment.status,
                action: "refund",
            });
        }

        Ok(vec![OrderEvent::AdjustmentRefunded(AdjustmentRefundedData {
            adjustment_id,
            refunded_by,
            refunded_at: now,
        })])
    }
}

// Apply event helpers
impl Order {
    fn apply_order_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.user_id = Some(data.user_id);
        self.status = OrderStatus::Placed;
        self.payment_status = PaymentStatus::Pending;
        self.payment_method = Some(data.payment_method);
        self.shipping_address = Some(data.shipping_address);
        self.items = data.items;
        self.total_amount = data.total_amount;
        self.placed_at = Some(data.placed_at);
        self.updated_at = Some(data.placed_at);
    }

    fn apply_review(&mut self, data: AdjustmentReviewedData, status: AdjustmentStatus) {
        if let Some(adjustment) = self.adjustment_mut(data.adjustment_id) {
            adjustment.status = status;
            adjustment.reviewed_by = Some(data.reviewed_by);
            adjustment.reviewed_at = Some(data.reviewed_at);
            adjustment.review_note = data.note;
        }
        self.updated_at = Some(data.reviewed_at);
    }

    fn apply_item_reduced(&mut self, data: ItemQuantityReducedData) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == data.order_item_id) {
            item.quantity = item.quantity.saturating_sub(data.quantity);
        }
        self.items.retain(|i| i.quantity > 0);
        // Approval already checked the refund against the remaining total.
        self.total_amount = self
            .total_amount
            .checked_sub(data.refund_amount)
            .unwrap_or_else(Money::zero);
        self.updated_at = Some(data.reduced_at);
    }

    fn adjustment_mut(&mut self, adjustment_id: AdjustmentId) -> Option<&mut Adjustment> {
        self.adjustments.iter_mut().find(|a| a.id == adjustment_id)
    }
}
