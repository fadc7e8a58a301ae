//! Payment verification state machine.

use serde::{Deserialize, Serialize};

/// ```text
/// Pending (cash on delivery) ─┐
///                             ├──► Completed ──► Refunded
/// Processing (manual proof) ──┘
///         └──────────────────────► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentState {
    pub fn awaiting_verification(&self) -> bool {
        matches!(self, PaymentState::Pending | PaymentState::Processing)
    }

    pub fn can_refund(&self) -> bool {
        matches!(self, PaymentState::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Processing => "processing",
            PaymentState::Completed => "completed",
            PaymentState::Failed => "failed",
            PaymentState::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Admin decision on a submitted payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationOutcome {
    Completed,
    Failed,
}

impl VerificationOutcome {
    pub fn resulting_state(&self) -> PaymentState {
        match self {
            VerificationOutcome::Completed => PaymentState::Completed,
            VerificationOutcome::Failed => PaymentState::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.resulting_state().as_str()
    }
}
