//! Payment aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::order::Money;

use super::{
    PaymentCreatedData, PaymentError, PaymentEvent, PaymentMethod, PaymentRefundedData,
    PaymentState, PaymentVerifiedData, ReceiverAccount, VerificationOutcome,
};

/// A payment asserted by the customer and verified by an admin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Payment {
    id: Option<AggregateId>,
    #[serde(default)]
    version: Version,
    order_id: Option<AggregateId>,
    user_id: Option<UserId>,
    amount: Money,
    method: Option<PaymentMethod>,
    state: PaymentState,
    transaction_id: Option<String>,
    payment_proof: Option<String>,
    receiver_account: Option<ReceiverAccount>,
    verified_by: Option<UserId>,
    verified_at: Option<DateTime<Utc>>,
    verification_note: Option<String>,
    refund_amount: Option<Money>,
    refund_reason: Option<String>,
    refunded_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Aggregate for Payment {
    type Event = PaymentEvent;
    type Error = PaymentError;

    fn aggregate_type() -> &'static str {
        "Payment"
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
            PaymentEvent::PaymentCreated(data) => {
                self.id = Some(data.payment_id);
                self.order_id = Some(data.order_id);
                self.user_id = Some(data.user_id);
                self.amount = data.amount;
                self.method = Some(data.method);
                self.state = data.state;
                self.transaction_id = data.transaction_id;
                self.payment_proof = data.payment_proof;
                self.receiver_account = data.receiver_account;
                self.created_at = Some(data.created_at);
                self.updated_at = Some(data.created_at);
            }
            PaymentEvent::PaymentVerified(data) => {
                self.state = data.outcome.resulting_state();
                self.verified_by = Some(data.verified_by);
                self.verified_at = Some(data.verified_at);
                self.verification_note = data.note;
                self.updated_at = Some(data.verified_at);
            }
            PaymentEvent::PaymentRefunded(data) => {
                self.state = PaymentState::Refunded;
                self.refund_amount = Some(data.amount);
                self.refund_reason = Some(data.reason);
                self.refunded_at = Some(data.refunded_at);
                self.updated_at = Some(data.refunded_at);
            }
        }
    }
}

// Query methods
impl Payment {
    pub fn order_id(&self) -> Option<AggregateId> {
        self.order_id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn method(&self) -> Option<PaymentMethod> {
        self.method
    }

    pub fn state(&self) -> PaymentState {
        self.state
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn payment_proof(&self) -> Option<&str> {
        self.payment_proof.as_deref()
    }

    pub fn receiver_account(&self) -> Option<&ReceiverAccount> {
        self.receiver_account.as_ref()
    }

    pub fn verified_by(&self) -> Option<UserId> {
        self.verified_by
    }

    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    pub fn verification_note(&self) -> Option<&str> {
        self.verification_note.as_deref()
    }

    pub fn refund_amount(&self) -> Option<Money> {
        self.refund_amount
    }

    pub fn refund_reason(&self) -> Option<&str> {
        self.refund_reason.as_deref()
    }

    pub fn refunded_at(&self) -> Option<DateTime<Utc>> {
        self.refunded_at
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

// Command methods (return events)
impl Payment {
    /// Records a new payment for `order_id`.
    ///
    /// Cash on delivery starts `Pending`; every other method starts
    /// `Processing` while the admin checks the transfer.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        payment_id: AggregateId,
        order_id: AggregateId,
        user_id: UserId,
        amount: Money,
        method: PaymentMethod,
        transaction_id: Option<String>,
        payment_proof: Option<String>,
        receiver_account: Option<ReceiverAccount>,
        now: DateTime<Utc>,
    ) -> Result<Vec<PaymentEvent>, PaymentError> {
        if self.id.is_some() {
            return Err(PaymentError::AlreadyCreated);
        }
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount { amount });
        }

        let state = if method.is_cash_on_delivery() {
            PaymentState::Pending
        } else {
            PaymentState::Processing
        };

        Ok(vec![PaymentEvent::PaymentCreated(PaymentCreatedData {
            payment_id,
            order_id,
            user_id,
            amount,
            method,
            state,
            transaction_id,
            payment_proof,
            receiver_account,
            created_at: now,
        })])
    }

    /// Decides an open payment. A second decision is refused, so the order
    /// side effects of a verification can never apply twice.
    pub fn verify(
        &self,
        outcome: VerificationOutcome,
        verified_by: UserId,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<PaymentEvent>, PaymentError> {
        match self.state {
            PaymentState::Pending | PaymentState::Processing => {}
            PaymentState::Completed | PaymentState::Failed => {
                return Err(PaymentError::AlreadyVerified { state: self.state });
            }
            PaymentState::Refunded => {
                return Err(PaymentError::InvalidTransition {
                    state: self.state,
                    action: "verify",
                });
            }
        }

        Ok(vec![PaymentEvent::PaymentVerified(PaymentVerifiedData {
            outcome,
            verified_by,
            note,
            verified_at: now,
        })])
    }

    /// Refunds what is left of a completed payment. `amount` is less than
    /// the payment when item-level refunds already returned part of it.
    pub fn refund(
        &self,
        amount: Money,
        reason: impl Into<String>,
        refunded_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<PaymentEvent>, PaymentError> {
        if !self.state.can_refund() {
            return Err(PaymentError::RefundNotAllowed { state: self.state });
        }
        if !amount.is_positive() || amount > self.amount {
            return Err(PaymentError::InvalidRefundAmount {
                refund: amount,
                paid: self.amount,
            });
        }

        Ok(vec![PaymentEvent::PaymentRefunded(PaymentRefundedData {
            amount,
            reason: reason.into(),
            refunded_by,
            refunded_at: now,
        })])
    }
}
