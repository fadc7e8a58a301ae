//! Inventory Ledger rows: one `StockItem` stream per product.

mod aggregate;
mod events;

pub use aggregate::StockItem;
pub use events::{
    ReleaseReason, StockEvent, StockRegisteredData, StockReleasedData, StockReplenishedData,
    StockReservedData,
};

use common::ProductId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Stock item is not registered")]
    NotRegistered,

    #[error("Product {product_id} is already registered")]
    AlreadyRegistered { product_id: ProductId },

    /// Names the product so the caller can show which line failed.
    #[error("Insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },
}
