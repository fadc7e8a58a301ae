//! Partial cancellations and partial returns of single order lines.

use common::{AdjustmentId, AggregateId};
use domain::{Adjustment, AdjustmentKind, Aggregate, Order, ReleaseReason};
use event_store::EventStore;

use crate::actor::Actor;
use crate::context::Context;
use crate::error::{FulfillmentError, Result};
use crate::inventory::StockMovements;
use crate::notifications::Notification;
use crate::requests::{AdjustmentRequest, ReviewAdjustmentRequest, ReviewDecision};

/// Customer requests and admin review of item-level adjustments.
///
/// Stock moves at two points only: approval of a cancellation, and the refund
/// of a return once the goods are back.
#[derive(Clone)]
pub struct AdjustmentService<S> {
    ctx: Context<S>,
}

impl<S: EventStore + Clone> AdjustmentService<S> {
    pub(crate) fn new(ctx: Context<S>) -> Self {
        Self { ctx }
    }

    pub async fn request_cancellation(
        &self,
        actor: &Actor,
        order_id: AggregateId,
        request: AdjustmentRequest,
    ) -> Result<Adjustment> {
        self.request(actor, order_id, AdjustmentKind::Cancellation, request)
            .await
    }

    pub async fn request_return(
        &self,
        actor: &Actor,
        order_id: AggregateId,
        request: AdjustmentRequest,
    ) -> Result<Adjustment> {
        self.request(actor, order_id, AdjustmentKind::Return, request)
            .await
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %actor.user_id, kind = kind.as_str()))]
    async fn request(
        &self,
        actor: &Actor,
        order_id: AggregateId,
        kind: AdjustmentKind,
        request: AdjustmentRequest,
    ) -> Result<Adjustment> {
        request.validate()?;
        let mut order = self.ctx.load_owned_order(actor, order_id).await?;
        let adjustment_id = AdjustmentId::new();

        let events = order.request_adjustment(
            adjustment_id,
            kind,
            request.order_item_id,
            request.quantity,
            request.reason,
            request.details,
            actor.user_id,
            self.ctx.config.return_window,
            self.ctx.now(),
        )?;
        let mut unit = self.ctx.unit(actor);
        unit.record(order_id, &mut order, events)?;
        unit.snapshot_if_due(order_id, &order)?;
        self.ctx.repo.commit(unit).await?;

        let adjustment = find(&order, adjustment_id)?;
        metrics::counter!("adjustments_requested_total", "kind" => kind.as_str()).increment(1);
        tracing::info!(%order_id, %adjustment_id, quantity = adjustment.quantity, "adjustment requested");

        let title = match kind {
            AdjustmentKind::Cancellation => "Partial cancellation requested",
            AdjustmentKind::Return => "Partial return requested",
        };
        self.ctx.outbox.publish(Notification::Admins {
            title: title.to_string(),
            message: format!(
                "{} x {} on order {} (refund {})",
                adjustment.quantity, adjustment.product_name, order_id, adjustment.refund_amount
            ),
            metadata: serde_json::json!({
                "orderId": order_id,
                "adjustmentId": adjustment_id,
                "orderItemId": adjustment.order_item_id,
                "quantity": adjustment.quantity,
                "refundAmount": adjustment.refund_amount,
            }),
        });

        Ok(adjustment)
    }

    /// Admin approves or rejects a pending adjustment.
    ///
    /// Approving a cancellation releases its units, shrinks the line and the
    /// order total in a single commit.
    #[tracing::instrument(skip(self, request), fields(admin_id = %actor.user_id, decision = request.decision.as_str()))]
    pub async fn review(
        &self,
        actor: &Actor,
        order_id: AggregateId,
        adjustment_id: AdjustmentId,
        request: ReviewAdjustmentRequest,
    ) -> Result<Adjustment> {
        actor.require_admin()?;
        request.validate()?;
        let mut order = self.ctx.load_order(order_id).await?;
        let pending = find(&order, adjustment_id)?;
        let now = self.ctx.now();

        let mut unit = self.ctx.unit(actor);
        let mut stock = StockMovements::new(&self.ctx.repo, now);
        match request.decision {
            ReviewDecision::Approve => {
                let events =
                    order.approve_adjustment(adjustment_id, actor.user_id, request.note, now)?;
                if pending.kind == AdjustmentKind::Cancellation {
                    stock
                        .release(
                            &mut unit,
                            order_id,
                            pending.order_item_id,
                            pending.product_id,
                            pending.quantity,
                            ReleaseReason::CancellationApproved,
                        )
                        .await?;
                }
                unit.record(order_id, &mut order, events)?;
            }
            ReviewDecision::Reject => {
                let events =
                    order.reject_adjustment(adjustment_id, actor.user_id, request.note, now)?;
                unit.record(order_id, &mut order, events)?;
            }
        }
        unit.snapshot_if_due(order_id, &order)?;
        self.ctx.repo.commit(unit).await?;

        let reviewed = find(&order, adjustment_id)?;
        metrics::counter!(
            "adjustments_reviewed_total",
            "kind" => reviewed.kind.as_str(),
            "decision" => request.decision.as_str()
        )
        .increment(1);
        tracing::info!(
            %order_id,
            %adjustment_id,
            status = reviewed.status.as_str(),
            total = %order.total_amount(),
            "adjustment reviewed"
        );

        let (title, message) = match (request.decision, reviewed.kind) {
            (ReviewDecision::Approve, AdjustmentKind::Cancellation) => (
                "Cancellation approved",
                format!(
                    "Your cancellation of {} x {} was approved. A refund of {} will be processed.",
                    reviewed.quantity, reviewed.product_name, reviewed.refund_amount
                ),
            ),
            (ReviewDecision::Approve, AdjustmentKind::Return) => (
                "Return approved",
                format!(
                    "Your return of {} x {} was approved. Please send the item back; {} will be refunded once it arrives.",
                    reviewed.quantity, reviewed.product_name, reviewed.refund_amount
                ),
            ),
            (ReviewDecision::Reject, _) => (
                "Request rejected",
                format!(
                    "Your request for {} x {} was rejected.",
                    reviewed.quantity, reviewed.product_name
                ),
            ),
        };
        self.notify_owner(&order, &reviewed, title, message);

        Ok(reviewed)
    }

    #[tracing::instrument(skip(self), fields(admin_id = %actor.user_id))]
    pub async fn mark_return_picked_up(
        &self,
        actor: &Actor,
        order_id: AggregateId,
        adjustment_id: AdjustmentId,
    ) -> Result<Adjustment> {
        actor.require_admin()?;
        let mut order = self.ctx.load_order(order_id).await?;
        let events = order.mark_return_picked_up(adjustment_id, actor.user_id, self.ctx.now())?;

        let mut unit = self.ctx.unit(actor);
        unit.record(order_id, &mut order, events)?;
        unit.snapshot_if_due(order_id, &order)?;
        self.ctx.repo.commit(unit).await?;

        tracing::info!(%order_id, %adjustment_id, "return picked up");
        find(&order, adjustment_id)
    }

    #[tracing::instrument(skip(self), fields(admin_id = %actor.user_id))]
    pub async fn mark_return_received(
        &self,
        actor: &Actor,
        order_id: AggregateId,
        adjustment_id: AdjustmentId,
    ) -> Result<Adjustment> {
        actor.require_admin()?;
        let mut order = self.ctx.load_order(order_id).await?;
        let events = order.mark_return_received(adjustment_id, actor.user_id, self.ctx.now())?;

        let mut unit = self.ctx.unit(actor);
        unit.record(order_id, &mut order, events)?;
        unit.snapshot_if_due(order_id, &order)?;
        self.ctx.repo.commit(unit).await?;

        tracing::info!(%order_id, %adjustment_id, "return received");
        find(&order, adjustment_id)
    }

    /// Refunds an approved or received return and puts its units back in
    /// stock. The order total stays as it is.
    #[tracing::instrument(skip(self), fields(admin_id = %actor.user_id))]
    pub async fn process_return_refund(
        &self,
        actor: &Actor,
        order_id: AggregateId,
        adjustment_id: AdjustmentId,
    ) -> Result<Adjustment> {
        actor.require_admin()?;
        let mut order = self.ctx.load_order(order_id).await?;
        let adjustment = find(&order, adjustment_id)?;
        if adjustment.kind != AdjustmentKind::Return {
            return Err(FulfillmentError::InvalidState(
                "only returns are refunded through this step".to_string(),
            ));
        }
        let now = self.ctx.now();
        let events = order.refund_adjustment(adjustment_id, actor.user_id, now)?;

        let mut unit = self.ctx.unit(actor);
        let mut stock = StockMovements::new(&self.ctx.repo, now);
        stock
            .release(
                &mut unit,
                order_id,
                adjustment.order_item_id,
                adjustment.product_id,
                adjustment.quantity,
                ReleaseReason::ReturnRefunded,
            )
            .await?;
        unit.record(order_id, &mut order, events)?;
        unit.snapshot_if_due(order_id, &order)?;
        self.ctx.repo.commit(unit).await?;

        let refunded = find(&order, adjustment_id)?;
        tracing::info!(%order_id, %adjustment_id, refund = %refunded.refund_amount, "return refunded");
        self.notify_owner(
            &order,
            &refunded,
            "Return refunded",
            format!(
                "Your refund of {} for {} x {} has been processed.",
                refunded.refund_amount, refunded.quantity, refunded.product_name
            ),
        );

        Ok(refunded)
    }

    /// Records the payout of an approved cancellation. Stock and total were
    /// already settled at approval.
    #[tracing::instrument(skip(self), fields(admin_id = %actor.user_id))]
    pub async fn mark_cancellation_refunded(
        &self,
        actor: &Actor,
        order_id: AggregateId,
        adjustment_id: AdjustmentId,
    ) -> Result<Adjustment> {
        actor.require_admin()?;
        let mut order = self.ctx.load_order(order_id).await?;
        if find(&order, adjustment_id)?.kind != AdjustmentKind::Cancellation {
            return Err(FulfillmentError::InvalidState(
                "returns are refunded through the return refund step".to_string(),
            ));
        }
        let events = order.refund_adjustment(adjustment_id, actor.user_id, self.ctx.now())?;

        let mut unit = self.ctx.unit(actor);
        unit.record(order_id, &mut order, events)?;
        unit.snapshot_if_due(order_id, &order)?;
        self.ctx.repo.commit(unit).await?;

        let refunded = find(&order, adjustment_id)?;
        tracing::info!(%order_id, %adjustment_id, "cancellation refunded");
        self.notify_owner(
            &order,
            &refunded,
            "Cancellation refunded",
            format!("Your refund of {} has been sent.", refunded.refund_amount),
        );

        Ok(refunded)
    }

    /// Adjustments of an order the caller may see.
    pub async fn list_adjustments(
        &self,
        actor: &Actor,
        order_id: AggregateId,
    ) -> Result<Vec<Adjustment>> {
        let order = self.ctx.load_visible_order(actor, order_id).await?;
        Ok(order.adjustments().to_vec())
    }

    fn notify_owner(
        &self,
        order: &Order,
        adjustment: &Adjustment,
        title: &str,
        message: String,
    ) {
        let (Some(user_id), Some(order_id)) = (order.user_id(), order.id()) else {
            return;
        };
        self.ctx.outbox.publish(Notification::adjustment_update(
            user_id,
            order_id,
            adjustment.id,
            title,
            message,
            adjustment.refund_amount,
        ));
    }
}

fn find(order: &Order, adjustment_id: AdjustmentId) -> Result<Adjustment> {
    order
        .adjustment(adjustment_id)
        .cloned()
        .ok_or_else(|| FulfillmentError::NotFound(format!("Adjustment {adjustment_id}")))
}
