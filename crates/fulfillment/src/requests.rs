//! Validated inputs of every workflow.
//!
//! Each request checks its own shape with `validate()` before a workflow
//! touches any aggregate. Business rules that depend on stored state (stock,
//! status, windows) are checked later by the aggregates.

use common::{OrderItemId, ProductId};
use domain::{
    AdjustmentReason, Money, OrderItem, OrderStatus, PaymentMethod, ShippingAddress,
    VerificationOutcome,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::FulfillmentError;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl From<ValidationError> for FulfillmentError {
    fn from(err: ValidationError) -> Self {
        FulfillmentError::Validation(err.0)
    }
}

fn require(condition: bool, message: impl Into<String>) -> Result<(), ValidationError> {
    if condition {
        Ok(())
    } else {
        Err(ValidationError(message.into()))
    }
}

fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price shown to the customer at checkout, in minor units.
    pub unit_price: Money,
}

impl OrderLineRequest {
    pub fn subtotal(&self) -> Option<Money> {
        self.unit_price.checked_times(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderLineRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub declared_total: Money,
}

impl PlaceOrderRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(!self.items.is_empty(), "order must contain at least one item")?;
        for (index, line) in self.items.iter().enumerate() {
            require(
                line.quantity > 0,
                format!("item {index}: quantity must be greater than 0"),
            )?;
            require(
                line.unit_price.is_positive(),
                format!("item {index}: unit price must be greater than 0"),
            )?;
        }

        let address = &self.shipping_address;
        for (field, value) in [
            ("fullName", &address.full_name),
            ("phone", &address.phone),
            ("addressLine", &address.address_line),
            ("city", &address.city),
            ("country", &address.country),
        ] {
            require(not_blank(value), format!("shipping address {field} is required"))?;
        }

        let computed = Money::checked_sum(self.items.iter().map(OrderLineRequest::subtotal))
            .ok_or_else(|| ValidationError("order total is out of range".to_string()))?;
        require(
            computed == self.declared_total,
            format!(
                "declared total {} does not match item subtotals {}",
                self.declared_total, computed
            ),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

impl CancelOrderRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Reason with blank input treated as absent.
    pub(crate) fn reason(&self) -> Option<String> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnOrderRequest {
    pub reason: String,
}

impl ReturnOrderRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(not_blank(&self.reason), "return reason is required")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

impl UpdateOrderStatusRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Partial cancellation or partial return of one order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRequest {
    pub order_item_id: OrderItemId,
    pub quantity: u32,
    pub reason: AdjustmentReason,
    #[serde(default)]
    pub details: Option<String>,
}

impl AdjustmentRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(self.quantity > 0, "quantity must be greater than 0")?;
        if self.reason == AdjustmentReason::Other {
            let described = self.details.as_deref().is_some_and(not_blank);
            require(described, "details are required when the reason is other")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approve => "approve",
            ReviewDecision::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAdjustmentRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub note: Option<String>,
}

impl ReviewAdjustmentRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub method: PaymentMethod,
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Opaque reference to an uploaded receipt.
    #[serde(default)]
    pub payment_proof: Option<String>,
}

impl CreatePaymentRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.method.is_cash_on_delivery() {
            return Ok(());
        }
        let has_transaction = self.transaction_id.as_deref().is_some_and(not_blank);
        let has_proof = self.payment_proof.as_deref().is_some_and(not_blank);
        require(
            has_transaction || has_proof,
            format!(
                "{} payments need a transaction id or payment proof",
                self.method
            ),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub outcome: VerificationOutcome,
    #[serde(default)]
    pub note: Option<String>,
}

impl VerifyPaymentRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundPaymentRequest {
    pub reason: String,
}

impl RefundPaymentRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(not_blank(&self.reason), "refund reason is required")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProductRequest {
    pub product_id: ProductId,
    pub name: String,
    pub initial_stock: u32,
    #[serde(default)]
    pub low_stock_threshold: Option<u32>,
}

impl RegisterProductRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(not_blank(&self.name), "product name is required")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockRequest {
    pub quantity: u32,
}

impl RestockRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(self.quantity > 0, "quantity must be greater than 0")
    }
}

/// Turns a checkout line into an order line named after the catalog product.
pub(crate) fn order_line(line: &OrderLineRequest, product_name: &str) -> OrderItem {
    OrderItem::new(line.product_id, product_name, line.quantity, line.unit_price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Rahima Khatun".to_string(),
            phone: "+8801711000000".to_string(),
            address_line: "House 12, Road 5".to_string(),
            city: "Dhaka".to_string(),
            postal_code: Some("1205".to_string()),
            country: "Bangladesh".to_string(),
        }
    }

    fn place(lines: Vec<(u32, i64)>, declared: i64) -> PlaceOrderRequest {
        PlaceOrderRequest {
            items: lines
                .into_iter()
                .map(|(quantity, price)| OrderLineRequest {
                    product_id: ProductId::new(),
                    quantity,
                    unit_price: Money::from_cents(price),
                })
                .collect(),
            shipping_address: address(),
            payment_method: PaymentMethod::CashOnDelivery,
            declared_total: Money::from_cents(declared),
        }
    }

    #[test]
    fn place_accepts_matching_total() {
        assert!(place(vec![(2, 1000), (1, 550)], 2550).validate().is_ok());
    }

    #[test]
    fn place_rejects_malformed_input() {
        assert!(place(vec![], 0).validate().is_err());
        assert!(place(vec![(0, 1000)], 0).validate().is_err());
        assert!(place(vec![(1, 0)], 0).validate().is_err());

        let err = place(vec![(2, 1000)], 1999).validate().unwrap_err();
        assert!(err.0.contains("declared total"));

        let mut blank_city = place(vec![(1, 1000)], 1000);
        blank_city.shipping_address.city = "  ".to_string();
        assert!(blank_city.validate().unwrap_err().0.contains("city"));
    }

    #[test]
    fn place_rejects_overflowing_total() {
        let huge = i64::MAX / 2 + 1;

        let err = place(vec![(2, huge)], 0).validate().unwrap_err();
        assert_eq!(err.0, "order total is out of range");

        let err = place(vec![(1, huge), (1, huge)], 0).validate().unwrap_err();
        assert_eq!(err.0, "order total is out of range");
    }

    #[test]
    fn manual_payment_needs_evidence() {
        let request = CreatePaymentRequest {
            method: PaymentMethod::Bkash,
            transaction_id: Some(" ".to_string()),
            payment_proof: None,
        };
        assert!(request.validate().is_err());

        let request = CreatePaymentRequest {
            method: PaymentMethod::Bkash,
            transaction_id: None,
            payment_proof: Some("receipts/abc.png".to_string()),
        };
        assert!(request.validate().is_ok());

        let request = CreatePaymentRequest {
            method: PaymentMethod::CashOnDelivery,
            transaction_id: None,
            payment_proof: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn reasons_must_not_be_blank() {
        assert!(ReturnOrderRequest { reason: "".into() }.validate().is_err());
        assert!(RefundPaymentRequest { reason: " ".into() }.validate().is_err());

        let cancel = CancelOrderRequest {
            reason: Some("   ".to_string()),
        };
        assert!(cancel.validate().is_ok());
        assert_eq!(cancel.reason(), None);
    }

    #[test]
    fn other_reason_needs_details() {
        let request = AdjustmentRequest {
            order_item_id: OrderItemId::new(),
            quantity: 1,
            reason: AdjustmentReason::Other,
            details: None,
        };
        assert!(request.validate().is_err());

        let request = AdjustmentRequest {
            details: Some("gift arrived twice".to_string()),
            ..request
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn requests_deserialize_from_camel_case() {
        let json = serde_json::json!({
            "items": [{ "productId": ProductId::new(), "quantity": 3, "unitPrice": 1000 }],
            "shippingAddress": {
                "fullName": "Rahima Khatun",
                "phone": "+8801711000000",
                "addressLine": "House 12",
                "city": "Dhaka",
                "country": "Bangladesh"
            },
            "paymentMethod": "bkash",
            "declaredTotal": 3000
        });
        let request: PlaceOrderRequest = serde_json::from_value(json).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.items[0].quantity, 3);
    }
}
