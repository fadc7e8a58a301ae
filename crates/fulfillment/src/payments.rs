//! Payment records and their admin verification.

use std::sync::Arc;

use common::AggregateId;
use domain::{Aggregate, Order, OrderStatus, Payment, ReleaseReason};
use event_store::EventStore;

use crate::actor::Actor;
use crate::context::Context;
use crate::error::{FulfillmentError, Result};
use crate::inventory::StockMovements;
use crate::merchant::MerchantAccountDirectory;
use crate::notifications::Notification;
use crate::orders::release_live_items;
use crate::requests::{CreatePaymentRequest, RefundPaymentRequest, VerifyPaymentRequest};

/// Creates, verifies and refunds payments.
///
/// Each payment change commits together with the order change it implies,
/// so a completed payment can never be observed next to an unpaid order.
#[derive(Clone)]
pub struct PaymentService<S> {
    ctx: Context<S>,
    merchants: Arc<dyn MerchantAccountDirectory>,
}

impl<S: EventStore + Clone> PaymentService<S> {
    pub(crate) fn new(ctx: Context<S>, merchants: Arc<dyn MerchantAccountDirectory>) -> Self {
        Self { ctx, merchants }
    }

    /// Records the customer's payment for their order.
    ///
    /// Non-cash methods are directed to the primary merchant account of the
    /// matching type, snapshotted onto the payment.
    #[tracing::instrument(skip(self, request), fields(user_id = %actor.user_id, method = %request.method))]
    pub async fn create_payment(
        &self,
        actor: &Actor,
        order_id: AggregateId,
        request: CreatePaymentRequest,
    ) -> Result<Payment> {
        request.validate()?;
        let mut order = self.ctx.load_owned_order(actor, order_id).await?;

        let receiver = match request.method.account_type() {
            Some(account_type) => {
                let account = self
                    .merchants
                    .primary_for(account_type)
                    .await?
                    .ok_or(FulfillmentError::NoMerchantAccount(account_type))?;
                Some(account.receiver())
            }
            None => None,
        };

        let now = self.ctx.now();
        let payment_id = AggregateId::new();
        let order_events = order.attach_payment(payment_id, request.method, now)?;
        let mut payment = Payment::default();
        let payment_events = payment.create(
            payment_id,
            order_id,
            actor.user_id,
            order.total_amount(),
            request.method,
            request.transaction_id,
            request.payment_proof,
            receiver,
            now,
        )?;

        let mut unit = self.ctx.unit(actor);
        unit.record(order_id, &mut order, order_events)?;
        unit.record(payment_id, &mut payment, payment_events)?;
        unit.snapshot_if_due(order_id, &order)?;
        self.ctx.repo.commit(unit).await?;

        metrics::counter!("payments_created_total", "method" => request.method.as_str())
            .increment(1);
        tracing::info!(%order_id, %payment_id, amount = %payment.amount(), "payment created");

        self.ctx.outbox.publish(Notification::PaymentConfirmationEmail {
            user_id: actor.user_id,
            order_id,
            payment_id,
            amount: payment.amount(),
            method: request.method,
        });

        Ok(payment)
    }

    /// Admin decides a payment. The order's payment status (and, for a
    /// completed payment on a placed order, its status) change in the same
    /// commit. Deciding twice is refused.
    #[tracing::instrument(skip(self, request), fields(admin_id = %actor.user_id, outcome = request.outcome.as_str()))]
    pub async fn verify_payment(
        &self,
        actor: &Actor,
        payment_id: AggregateId,
        request: VerifyPaymentRequest,
    ) -> Result<Payment> {
        actor.require_admin()?;
        request.validate()?;
        let mut payment = self.load_payment(payment_id).await?;
        let order_id = linked_order(&payment)?;
        let mut order = self.ctx.load_order(order_id).await?;
        let previous = order.status();
        let now = self.ctx.now();

        let payment_events = payment.verify(request.outcome, actor.user_id, request.note, now)?;
        let order_events = order.settle_payment(payment_id, request.outcome, now)?;

        let mut unit = self.ctx.unit(actor);
        unit.record(payment_id, &mut payment, payment_events)?;
        unit.record(order_id, &mut order, order_events)?;
        unit.snapshot_if_due(order_id, &order)?;
        self.ctx.repo.commit(unit).await?;

        metrics::counter!("payments_verified_total", "outcome" => request.outcome.as_str())
            .increment(1);
        tracing::info!(
            %order_id,
            %payment_id,
            payment_status = %order.payment_status(),
            order_status = %order.status(),
            "payment verified"
        );

        if let Some(user_id) = order.user_id() {
            let mut notifications = vec![Notification::PaymentVerifiedEmail {
                user_id,
                order_id,
                payment_id,
                outcome: request.outcome,
            }];
            if order.status() != previous {
                notifications.push(Notification::OrderStatus {
                    user_id,
                    order_id,
                    status: order.status(),
                });
            }
            self.ctx.outbox.publish_all(notifications);
        }

        Ok(payment)
    }

    /// Admin refunds a completed payment, voiding the order. Item-level
    /// refunds already owed on the order are left out of the amount. Units
    /// still held by a placed or processing order go back to stock.
    #[tracing::instrument(skip(self, request), fields(admin_id = %actor.user_id))]
    pub async fn refund_payment(
        &self,
        actor: &Actor,
        payment_id: AggregateId,
        request: RefundPaymentRequest,
    ) -> Result<Payment> {
        actor.require_admin()?;
        request.validate()?;
        let mut payment = self.load_payment(payment_id).await?;
        let order_id = linked_order(&payment)?;
        let mut order = self.ctx.load_order(order_id).await?;
        let previous = order.status();
        let now = self.ctx.now();

        let due = order.payment_refund_due(payment.amount())?;
        let payment_events = payment.refund(due, request.reason, actor.user_id, now)?;
        let order_events = order.refund_payment(payment_id, now)?;

        let mut unit = self.ctx.unit(actor);
        if previous.can_cancel() {
            let mut stock = StockMovements::new(&self.ctx.repo, now);
            release_live_items(&mut stock, &mut unit, &order, ReleaseReason::PaymentRefunded)
                .await?;
        }
        unit.record(payment_id, &mut payment, payment_events)?;
        unit.record(order_id, &mut order, order_events)?;
        unit.snapshot_if_due(order_id, &order)?;
        self.ctx.repo.commit(unit).await?;

        metrics::counter!("payments_refunded_total").increment(1);
        if previous != OrderStatus::Cancelled && order.status() == OrderStatus::Cancelled {
            metrics::counter!("orders_cancelled_total").increment(1);
        }
        tracing::info!(%order_id, %payment_id, paid = %payment.amount(), refunded = %due, "payment refunded");

        if let Some(user_id) = order.user_id() {
            let mut notifications = vec![Notification::User {
                user_id,
                title: "Payment refunded".to_string(),
                message: format!(
                    "A refund of {} for order {} has been issued.",
                    due, order_id
                ),
                metadata: serde_json::json!({
                    "orderId": order_id,
                    "paymentId": payment_id,
                    "amount": due,
                }),
            }];
            if order.status() != previous {
                notifications.push(Notification::OrderStatus {
                    user_id,
                    order_id,
                    status: order.status(),
                });
                notifications.push(Notification::OrderStatusUpdateEmail {
                    user_id,
                    order_id,
                    previous,
                    status: order.status(),
                });
            }
            self.ctx.outbox.publish_all(notifications);
        }

        Ok(payment)
    }

    /// The payment, if the caller made it or is an admin.
    pub async fn get_payment(&self, actor: &Actor, payment_id: AggregateId) -> Result<Payment> {
        let payment = self.load_payment(payment_id).await?;
        if !actor.is_admin() && payment.user_id() != Some(actor.user_id) {
            return Err(FulfillmentError::NotFound(format!("Payment {payment_id}")));
        }
        Ok(payment)
    }

    /// The payment currently backing an order the caller may see.
    pub async fn payment_for_order(
        &self,
        actor: &Actor,
        order_id: AggregateId,
    ) -> Result<Payment> {
        let order: Order = self.ctx.load_visible_order(actor, order_id).await?;
        let payment_id = order
            .payment_id()
            .ok_or_else(|| FulfillmentError::NotFound(format!("Payment for order {order_id}")))?;
        self.load_payment(payment_id).await
    }

    async fn load_payment(&self, payment_id: AggregateId) -> Result<Payment> {
        self.ctx
            .repo
            .load_existing::<Payment>(payment_id)
            .await?
            .ok_or_else(|| FulfillmentError::NotFound(format!("Payment {payment_id}")))
    }
}

fn linked_order(payment: &Payment) -> Result<AggregateId> {
    payment.order_id().ok_or_else(|| {
        tracing::error!(payment_id = ?payment.id(), "payment without order");
        FulfillmentError::Internal("payment is not linked to an order".to_string())
    })
}
