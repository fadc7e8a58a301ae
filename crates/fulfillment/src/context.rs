//! Dependencies shared by the workflow services.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Order, Repository, UnitOfWork};
use event_store::EventStore;

use crate::actor::Actor;
use crate::clock::Clock;
use crate::config::FulfillmentConfig;
use crate::error::{FulfillmentError, Result};
use crate::notifications::Outbox;

#[derive(Clone)]
pub(crate) struct Context<S> {
    pub repo: Repository<S>,
    pub clock: Arc<dyn Clock>,
    pub outbox: Outbox,
    pub config: FulfillmentConfig,
}

impl<S: EventStore + Clone> Context<S> {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// A unit of work whose events record who caused them.
    pub fn unit(&self, actor: &Actor) -> UnitOfWork {
        UnitOfWork::new()
            .with_metadata("actor_id", serde_json::json!(actor.user_id))
            .with_metadata("actor_role", serde_json::json!(actor.role))
    }

    pub async fn load_order(&self, order_id: AggregateId) -> Result<Order> {
        self.repo
            .load_existing::<Order>(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::NotFound(format!("Order {order_id}")))
    }

    /// The order if `actor` owns it. Someone else's order is reported as
    /// missing so its existence does not leak.
    pub async fn load_owned_order(&self, actor: &Actor, order_id: AggregateId) -> Result<Order> {
        let order = self.load_order(order_id).await?;
        if !order.is_owned_by(actor.user_id) {
            tracing::debug!(%order_id, user_id = %actor.user_id, "order belongs to another user");
            return Err(FulfillmentError::NotFound(format!("Order {order_id}")));
        }
        Ok(order)
    }

    /// Owners and admins may read an order.
    pub async fn load_visible_order(&self, actor: &Actor, order_id: AggregateId) -> Result<Order> {
        if actor.is_admin() {
            self.load_order(order_id).await
        } else {
            self.load_owned_order(actor, order_id).await
        }
    }
}
