//! Order fulfillment and inventory reconciliation engine.
//!
//! The engine turns a checkout into a durable order, reserves and releases
//! stock, drives the order lifecycle and reconciles partial cancellations,
//! returns and payment verification against it.
//!
//! Workflows:
//! - [`InventoryLedger`]: product registration, restock and single-line moves
//! - [`OrderService`]: place, cancel, return, admin status changes
//! - [`AdjustmentService`]: item-level cancellations and returns
//! - [`PaymentService`]: payment creation, verification and refund
//!
//! Every workflow commits all streams it touches in one atomic append and
//! publishes [`Notification`]s to the [`Outbox`] only after that commit.

pub mod actor;
pub mod adjustments;
pub mod clock;
pub mod config;
mod context;
pub mod error;
pub mod inventory;
pub mod merchant;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod requests;

use std::sync::Arc;

use domain::Repository;
use event_store::EventStore;

pub use actor::{Actor, Role};
pub use adjustments::AdjustmentService;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::FulfillmentConfig;
pub use error::FulfillmentError;
pub use inventory::{InventoryLedger, StockLevel};
pub use merchant::{InMemoryMerchantAccounts, MerchantAccount, MerchantAccountDirectory};
pub use notifications::{
    Notification, Notifier, NotifyError, Outbox, TracingNotifier, spawn_dispatcher,
};
pub use orders::OrderService;
pub use payments::PaymentService;
pub use requests::{
    AdjustmentRequest, CancelOrderRequest, CreatePaymentRequest, OrderLineRequest,
    PlaceOrderRequest, RefundPaymentRequest, RegisterProductRequest, RestockRequest,
    ReturnOrderRequest, ReviewAdjustmentRequest, ReviewDecision, UpdateOrderStatusRequest,
    ValidationError, VerifyPaymentRequest,
};

use context::Context;

/// Every workflow service, wired to one store, clock and outbox.
#[derive(Clone)]
pub struct Fulfillment<S> {
    pub inventory: InventoryLedger<S>,
    pub orders: OrderService<S>,
    pub adjustments: AdjustmentService<S>,
    pub payments: PaymentService<S>,
}

impl<S: EventStore + Clone> Fulfillment<S> {
    pub fn new(
        store: S,
        merchants: Arc<dyn MerchantAccountDirectory>,
        clock: Arc<dyn Clock>,
        outbox: Outbox,
        config: FulfillmentConfig,
    ) -> Self {
        let ctx = Context {
            repo: Repository::new(store),
            clock,
            outbox,
            config,
        };
        Self {
            inventory: InventoryLedger::new(ctx.clone()),
            orders: OrderService::new(ctx.clone()),
            adjustments: AdjustmentService::new(ctx.clone()),
            payments: PaymentService::new(ctx, merchants),
        }
    }
}
