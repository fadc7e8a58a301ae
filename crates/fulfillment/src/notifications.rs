//! Post-commit notifications.
//!
//! Workflows never call a notifier directly. They collect [`Notification`]s
//! while deciding, commit, and only then hand the list to the [`Outbox`]. A
//! background dispatcher drains the outbox and delivers each message through a
//! [`Notifier`]. Delivery problems are logged and counted, never returned to
//! the request that caused them.

use std::sync::Arc;

use async_trait::async_trait;
use common::{AdjustmentId, AggregateId, ProductId, UserId};
use domain::{Money, OrderStatus, PaymentMethod, VerificationOutcome};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A fire-and-forget message for the notification or email collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    OrderStatus {
        user_id: UserId,
        order_id: AggregateId,
        status: OrderStatus,
    },
    LowStock {
        product_id: ProductId,
        name: String,
        stock: u32,
        threshold: u32,
    },
    Admins {
        title: String,
        message: String,
        metadata: serde_json::Value,
    },
    /// In-app message to one customer.
    User {
        user_id: UserId,
        title: String,
        message: String,
        metadata: serde_json::Value,
    },
    OrderConfirmationEmail {
        user_id: UserId,
        order_id: AggregateId,
        total_amount: Money,
        item_count: usize,
    },
    OrderStatusUpdateEmail {
        user_id: UserId,
        order_id: AggregateId,
        previous: OrderStatus,
        status: OrderStatus,
    },
    PaymentConfirmationEmail {
        user_id: UserId,
        order_id: AggregateId,
        payment_id: AggregateId,
        amount: Money,
        method: PaymentMethod,
    },
    PaymentVerifiedEmail {
        user_id: UserId,
        order_id: AggregateId,
        payment_id: AggregateId,
        outcome: VerificationOutcome,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::OrderStatus { .. } => "order_status",
            Notification::LowStock { .. } => "low_stock",
            Notification::Admins { .. } => "admins",
            Notification::User { .. } => "user",
            Notification::OrderConfirmationEmail { .. } => "order_confirmation_email",
            Notification::OrderStatusUpdateEmail { .. } => "order_status_update_email",
            Notification::PaymentConfirmationEmail { .. } => "payment_confirmation_email",
            Notification::PaymentVerifiedEmail { .. } => "payment_verified_email",
        }
    }

    /// The outcome of an adjustment review or refund, addressed to the customer.
    pub(crate) fn adjustment_update(
        user_id: UserId,
        order_id: AggregateId,
        adjustment_id: AdjustmentId,
        title: impl Into<String>,
        message: impl Into<String>,
        refund_amount: Money,
    ) -> Self {
        Notification::User {
            user_id,
            title: title.into(),
            message: message.into(),
            metadata: serde_json::json!({
                "orderId": order_id,
                "adjustmentId": adjustment_id,
                "refundAmount": refund_amount,
            }),
        }
    }
}

#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers notifications to the outside world.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Sending half of the notification queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::UnboundedSender<Notification>,
}

impl Outbox {
    /// Creates an outbox and the receiver a dispatcher should drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queues one notification. Never blocks and never fails the caller.
    pub fn publish(&self, notification: Notification) {
        let kind = notification.kind();
        if self.sender.send(notification).is_err() {
            metrics::counter!("notification_failures_total", "kind" => kind).increment(1);
            tracing::warn!(kind, "notification outbox is closed, dropping notification");
        }
    }

    pub fn publish_all(&self, notifications: impl IntoIterator<Item = Notification>) {
        for notification in notifications {
            self.publish(notification);
        }
    }
}

/// Drains `receiver` until every [`Outbox`] clone is dropped.
pub fn spawn_dispatcher(
    mut receiver: mpsc::UnboundedReceiver<Notification>,
    notifier: Arc<dyn Notifier>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notification) = receiver.recv().await {
            let kind = notification.kind();
            match notifier.deliver(&notification).await {
                Ok(()) => {
                    metrics::counter!("notifications_dispatched_total", "kind" => kind)
                        .increment(1);
                }
                Err(e) => {
                    metrics::counter!("notification_failures_total", "kind" => kind).increment(1);
                    tracing::warn!(kind, error = %e, "notification delivery failed");
                }
            }
        }
        tracing::debug!("notification dispatcher stopped");
    })
}

/// Writes every notification to the log. Default notifier of the API binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(notification).map_err(|e| NotifyError(e.to_string()))?;
        tracing::info!(kind = notification.kind(), %payload, "notification delivered");
        Ok(())
    }
}
