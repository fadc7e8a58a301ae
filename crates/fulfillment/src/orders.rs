//! Order placement and whole-order lifecycle.

use std::time::Instant;

use common::AggregateId;
use domain::{Aggregate, Order, OrderEvent, OrderStatus, ReleaseReason, UnitOfWork};
use event_store::{EventQuery, EventStore};

use crate::actor::Actor;
use crate::context::Context;
use crate::error::{FulfillmentError, Result};
use crate::inventory::StockMovements;
use crate::notifications::Notification;
use crate::requests::{
    CancelOrderRequest, PlaceOrderRequest, ReturnOrderRequest, UpdateOrderStatusRequest,
    order_line,
};

/// Places, cancels and returns orders and applies admin status changes.
///
/// Every workflow decides against freshly loaded aggregates, stages the order
/// events and the matching stock movements in one [`UnitOfWork`], commits,
/// and only then publishes notifications.
#[derive(Clone)]
pub struct OrderService<S> {
    ctx: Context<S>,
}

impl<S: EventStore + Clone> OrderService<S> {
    pub(crate) fn new(ctx: Context<S>) -> Self {
        Self { ctx }
    }

    /// Validates every line against the ledger, reserves stock and creates
    /// the order. Either all of it lands or none of it does.
    #[tracing::instrument(skip(self, request), fields(user_id = %actor.user_id, lines = request.items.len()))]
    pub async fn place_order(&self, actor: &Actor, request: PlaceOrderRequest) -> Result<Order> {
        let started = Instant::now();
        request.validate()?;

        let now = self.ctx.now();
        let order_id = AggregateId::new();
        let mut unit = self.ctx.unit(actor);
        let mut stock = StockMovements::new(&self.ctx.repo, now);

        // Every product must exist before any stock is checked.
        let mut names = Vec::with_capacity(request.items.len());
        for line in &request.items {
            names.push(stock.row(line.product_id).await?.name().to_string());
        }

        let mut items = Vec::with_capacity(request.items.len());
        for (line, name) in request.items.iter().zip(&names) {
            let item = order_line(line, name);
            if let Err(e) = stock
                .reserve(&mut unit, order_id, item.id, line.product_id, line.quantity)
                .await
            {
                if matches!(e, FulfillmentError::InsufficientStock { .. }) {
                    metrics::counter!("stock_reservation_failures_total").increment(1);
                    tracing::debug!(product_id = %line.product_id, error = %e, "placement rejected");
                }
                return Err(e);
            }
            items.push(item);
        }

        let mut order = Order::default();
        let events = order.place(
            order_id,
            actor.user_id,
            items,
            request.shipping_address,
            request.payment_method,
            now,
        )?;
        unit.record(order_id, &mut order, events)?;
        self.ctx.repo.commit(unit).await?;

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(%order_id, total = %order.total_amount(), "order placed");

        let mut notifications = stock.low_stock_alerts();
        notifications.push(Notification::OrderConfirmationEmail {
            user_id: actor.user_id,
            order_id,
            total_amount: order.total_amount(),
            item_count: order.items().len(),
        });
        notifications.push(Notification::OrderStatus {
            user_id: actor.user_id,
            order_id,
            status: OrderStatus::Placed,
        });
        self.ctx.outbox.publish_all(notifications);

        Ok(order)
    }

    /// Customer cancels the whole order and every live unit goes back to stock.
    #[tracing::instrument(skip(self, request), fields(user_id = %actor.user_id))]
    pub async fn cancel_order(
        &self,
        actor: &Actor,
        order_id: AggregateId,
        request: CancelOrderRequest,
    ) -> Result<Order> {
        request.validate()?;
        let mut order = self.ctx.load_owned_order(actor, order_id).await?;
        let previous = order.status();
        let now = self.ctx.now();

        let events = order.cancel(actor.user_id, request.reason(), now)?;
        let mut unit = self.ctx.unit(actor);
        let mut stock = StockMovements::new(&self.ctx.repo, now);
        release_live_items(&mut stock, &mut unit, &order, ReleaseReason::OrderCancelled).await?;
        unit.record(order_id, &mut order, events)?;
        unit.snapshot_if_due(order_id, &order)?;
        self.ctx.repo.commit(unit).await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_id, "order cancelled");
        self.publish_status_change(&order, previous);

        Ok(order)
    }

    /// Customer returns the whole delivered order within the return window.
    #[tracing::instrument(skip(self, request), fields(user_id = %actor.user_id))]
    pub async fn return_order(
        &self,
        actor: &Actor,
        order_id: AggregateId,
        request: ReturnOrderRequest,
    ) -> Result<Order> {
        request.validate()?;
        let mut order = self.ctx.load_owned_order(actor, order_id).await?;
        let previous = order.status();
        let now = self.ctx.now();

        let events = order.request_return(request.reason, self.ctx.config.return_window, now)?;
        let mut unit = self.ctx.unit(actor);
        let mut stock = StockMovements::new(&self.ctx.repo, now);
        release_live_items(&mut stock, &mut unit, &order, ReleaseReason::OrderReturned).await?;
        unit.record(order_id, &mut order, events)?;
        unit.snapshot_if_due(order_id, &order)?;
        self.ctx.repo.commit(unit).await?;

        metrics::counter!("orders_returned_total").increment(1);
        tracing::info!(%order_id, "order returned");
        self.publish_status_change(&order, previous);

        Ok(order)
    }

    /// Admin moves the order along its lifecycle.
    ///
    /// Cancelling or returning through this path releases stock the same way
    /// the customer paths do. Re-setting the current status changes nothing
    /// and notifies nobody.
    #[tracing::instrument(skip(self), fields(admin_id = %actor.user_id))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        order_id: AggregateId,
        request: UpdateOrderStatusRequest,
    ) -> Result<Order> {
        actor.require_admin()?;
        request.validate()?;
        let mut order = self.ctx.load_order(order_id).await?;
        let previous = order.status();
        let now = self.ctx.now();

        let events = order.update_status(request.status, actor.user_id, now)?;
        if events.is_empty() {
            tracing::debug!(%order_id, status = %previous, "status unchanged");
            return Ok(order);
        }

        let mut unit = self.ctx.unit(actor);
        let mut stock = StockMovements::new(&self.ctx.repo, now);
        match request.status {
            OrderStatus::Cancelled => {
                release_live_items(&mut stock, &mut unit, &order, ReleaseReason::OrderCancelled)
                    .await?
            }
            OrderStatus::Returned => {
                release_live_items(&mut stock, &mut unit, &order, ReleaseReason::OrderReturned)
                    .await?
            }
            _ => {}
        }
        unit.record(order_id, &mut order, events)?;
        unit.snapshot_if_due(order_id, &order)?;
        self.ctx.repo.commit(unit).await?;

        match request.status {
            OrderStatus::Cancelled => metrics::counter!("orders_cancelled_total").increment(1),
            OrderStatus::Returned => metrics::counter!("orders_returned_total").increment(1),
            _ => {}
        }
        tracing::info!(%order_id, from = %previous, to = %order.status(), "order status updated");
        self.publish_status_change(&order, previous);

        Ok(order)
    }

    /// The order, if the caller owns it or is an admin.
    pub async fn get_order(&self, actor: &Actor, order_id: AggregateId) -> Result<Order> {
        self.ctx.load_visible_order(actor, order_id).await
    }

    /// The caller's orders, newest first. Admins see every order.
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn list_orders(&self, actor: &Actor) -> Result<Vec<Order>> {
        let placements = self
            .ctx
            .repo
            .store()
            .query_events(EventQuery::for_event_type("OrderPlaced").aggregate_type("Order"))
            .await?;

        let mut orders = Vec::new();
        for envelope in placements.into_iter().rev() {
            let OrderEvent::OrderPlaced(placed) =
                serde_json::from_value::<OrderEvent>(envelope.payload).map_err(|e| {
                    tracing::error!(error = %e, "unreadable OrderPlaced payload");
                    FulfillmentError::Internal("order journal is unreadable".to_string())
                })?
            else {
                continue;
            };
            if !actor.is_admin() && placed.user_id != actor.user_id {
                continue;
            }
            orders.push(self.ctx.load_order(placed.order_id).await?);
        }
        Ok(orders)
    }

    fn publish_status_change(&self, order: &Order, previous: OrderStatus) {
        let (Some(user_id), Some(order_id)) = (order.user_id(), order.id()) else {
            return;
        };
        self.ctx.outbox.publish_all([
            Notification::OrderStatus {
                user_id,
                order_id,
                status: order.status(),
            },
            Notification::OrderStatusUpdateEmail {
                user_id,
                order_id,
                previous,
                status: order.status(),
            },
        ]);
    }
}

/// Stages the release of every live unit of `order`.
pub(crate) async fn release_live_items<S: EventStore>(
    stock: &mut StockMovements<'_, S>,
    unit: &mut UnitOfWork,
    order: &Order,
    reason: ReleaseReason,
) -> Result<()> {
    let Some(order_id) = order.id() else {
        return Ok(());
    };
    for item in order.items() {
        stock
            .release(unit, order_id, item.id, item.product_id, item.quantity, reason)
            .await?;
    }
    Ok(())
}
