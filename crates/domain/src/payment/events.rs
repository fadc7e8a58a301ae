//! Payment domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::order::Money;

use super::{PaymentMethod, PaymentState, ReceiverAccount, VerificationOutcome};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PaymentEvent {
    PaymentCreated(PaymentCreatedData),
    PaymentVerified(PaymentVerifiedData),
    PaymentRefunded(PaymentRefundedData),
}

impl DomainEvent for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentCreated(_) => "PaymentCreated",
            PaymentEvent::PaymentVerified(_) => "PaymentVerified",
            PaymentEvent::PaymentRefunded(_) => "PaymentRefunded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCreatedData {
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub user_id: UserId,
    /// Order total at the moment the payment was created.
    pub amount: Money,
    pub method: PaymentMethod,
    pub state: PaymentState,
    pub transaction_id: Option<String>,
    /// Opaque reference to an uploaded transfer receipt.
    pub payment_proof: Option<String>,
    pub receiver_account: Option<ReceiverAccount>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentVerifiedData {
    pub outcome: VerificationOutcome,
    pub verified_by: UserId,
    pub note: Option<String>,
    pub verified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRefundedData {
    pub amount: Money,
    pub reason: String,
    pub refunded_by: UserId,
    pub refunded_at: DateTime<Utc>,
}
