//! Identifier types shared by every crate of the fulfillment engine.

mod types;

pub use types::{
    AdjustmentId, AggregateId, MerchantAccountId, OrderItemId, ProductId, UserId,
};
