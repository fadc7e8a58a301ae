//! Payment aggregate and related types.

mod aggregate;
mod events;
mod method;
mod state;

pub use aggregate::Payment;
pub use events::{PaymentCreatedData, PaymentEvent, PaymentRefundedData, PaymentVerifiedData};
pub use method::{MerchantAccountType, PaymentMethod, ReceiverAccount};
pub use state::{PaymentState, VerificationOutcome};

use thiserror::Error;

use crate::order::Money;

/// Errors that can occur during payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment already created")]
    AlreadyCreated,

    #[error("Payment amount must be positive, got {amount}")]
    InvalidAmount { amount: Money },

    /// Verification was already decided; deciding again would apply twice.
    #[error("Payment is already {state}")]
    AlreadyVerified { state: PaymentState },

    #[error("Cannot {action} a payment in {state} state")]
    InvalidTransition {
        state: PaymentState,
        action: &'static str,
    },

    #[error("Only completed payments can be refunded (payment is {state})")]
    RefundNotAllowed { state: PaymentState },

    #[error("Refund of {refund} must be positive and at most the payment of {paid}")]
    InvalidRefundAmount { refund: Money, paid: Money },
}
