//! Payment methods and the merchant accounts that receive them.

use common::MerchantAccountId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    BankTransfer,
    Bkash,
    Nagad,
    Rocket,
}

impl PaymentMethod {
    /// Kind of merchant account that receives this method. Cash on delivery
    /// needs none.
    pub fn account_type(&self) -> Option<MerchantAccountType> {
        match self {
            PaymentMethod::CashOnDelivery => None,
            PaymentMethod::BankTransfer => Some(MerchantAccountType::Bank),
            PaymentMethod::Bkash => Some(MerchantAccountType::Bkash),
            PaymentMethod::Nagad => Some(MerchantAccountType::Nagad),
            PaymentMethod::Rocket => Some(MerchantAccountType::Rocket),
        }
    }

    pub fn is_cash_on_delivery(&self) -> bool {
        matches!(self, PaymentMethod::CashOnDelivery)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Bkash => "bkash",
            PaymentMethod::Nagad => "nagad",
            PaymentMethod::Rocket => "rocket",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MerchantAccountType {
    Bank,
    Bkash,
    Nagad,
    Rocket,
}

impl MerchantAccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MerchantAccountType::Bank => "bank",
            MerchantAccountType::Bkash => "bkash",
            MerchantAccountType::Nagad => "nagad",
            MerchantAccountType::Rocket => "rocket",
        }
    }
}

impl std::fmt::Display for MerchantAccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Copy of the merchant account a payment was sent to, taken at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverAccount {
    pub account_id: MerchantAccountId,
    pub account_type: MerchantAccountType,
    pub account_name: String,
    pub account_number: String,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub branch_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_methods_map_to_their_account_type() {
        assert_eq!(PaymentMethod::CashOnDelivery.account_type(), None);
        assert_eq!(
            PaymentMethod::BankTransfer.account_type(),
            Some(MerchantAccountType::Bank)
        );
        assert_eq!(
            PaymentMethod::Nagad.account_type(),
            Some(MerchantAccountType::Nagad)
        );
    }

    #[test]
    fn method_wire_names() {
        let method: PaymentMethod = serde_json::from_str("\"cash_on_delivery\"").unwrap();
        assert!(method.is_cash_on_delivery());
        assert_eq!(PaymentMethod::Bkash.to_string(), "bkash");
    }
}
