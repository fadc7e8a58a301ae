//! Stock item aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, OrderItemId, ProductId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    InventoryError, ReleaseReason, StockEvent, StockRegisteredData, StockReleasedData,
    StockReplenishedData, StockReservedData,
};

/// Available stock of one product.
///
/// Stock is unsigned and every decrement goes through [`reserve`](Self::reserve),
/// which refuses to go below zero. Concurrent reservations are serialized by
/// the stream version: of two writers that loaded the same version only the
/// first commit lands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockItem {
    id: Option<AggregateId>,
    #[serde(default)]
    version: Version,
    product_id: Option<ProductId>,
    name: String,
    stock: u32,
    low_stock_threshold: u32,
    updated_at: Option<DateTime<Utc>>,
}

impl Aggregate for StockItem {
    type Event = StockEvent;
    type Error = InventoryError;

    fn aggregate_type() -> &'static str {
        "StockItem"
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
            StockEvent::StockRegistered(data) => {
                self.id = Some(data.product_id.stream_id());
                self.product_id = Some(data.product_id);
                self.name = data.name;
                self.stock = data.initial_stock;
                self.low_stock_threshold = data.low_stock_threshold;
                self.updated_at = Some(data.registered_at);
            }
            StockEvent::StockReserved(data) => {
                self.stock = data.remaining;
                self.updated_at = Some(data.reserved_at);
            }
            StockEvent::StockReleased(data) => {
                self.stock = data.remaining;
                self.updated_at = Some(data.released_at);
            }
            StockEvent::StockReplenished(data) => {
                self.stock = data.remaining;
                self.updated_at = Some(data.replenished_at);
            }
        }
    }
}

// Query methods
impl StockItem {
    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn low_stock_threshold(&self) -> u32 {
        self.low_stock_threshold
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// In stock but at or below the product's threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock > 0 && self.stock <= self.low_stock_threshold
    }

    fn registered_product(&self) -> Result<ProductId, InventoryError> {
        self.product_id.ok_or(InventoryError::NotRegistered)
    }
}

// Command methods (return events)
impl StockItem {
    pub fn register(
        &self,
        product_id: ProductId,
        name: impl Into<String>,
        initial_stock: u32,
        low_stock_threshold: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<StockEvent>, InventoryError> {
        if self.id.is_some() {
            return Err(InventoryError::AlreadyRegistered { product_id });
        }

        Ok(vec![StockEvent::StockRegistered(StockRegisteredData {
            product_id,
            name: name.into(),
            initial_stock,
            low_stock_threshold,
            registered_at: now,
        })])
    }

    /// Takes `quantity` units for an order line.
    pub fn reserve(
        &self,
        order_id: AggregateId,
        order_item_id: OrderItemId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<StockEvent>, InventoryError> {
        let product_id = self.registered_product()?;
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity { quantity });
        }
        if self.stock < quantity {
            return Err(InventoryError::InsufficientStock {
                product_id,
                name: self.name.clone(),
                requested: quantity,
                available: self.stock,
            });
        }

        Ok(vec![StockEvent::StockReserved(StockReservedData {
            order_id,
            order_item_id,
            quantity,
            remaining: self.stock - quantity,
            reserved_at: now,
        })])
    }

    /// Gives `quantity` units back from an order line. Releasing nothing
    /// records nothing.
    pub fn release(
        &self,
        order_id: AggregateId,
        order_item_id: OrderItemId,
        quantity: u32,
        reason: ReleaseReason,
        now: DateTime<Utc>,
    ) -> Result<Vec<StockEvent>, InventoryError> {
        self.registered_product()?;
        if quantity == 0 {
            return Ok(vec![]);
        }

        Ok(vec![StockEvent::StockReleased(StockReleasedData {
            order_id,
            order_item_id,
            quantity,
            reason,
            remaining: self.stock.saturating_add(quantity),
            released_at: now,
        })])
    }

    /// Catalog-side restock.
    pub fn replenish(
        &self,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<StockEvent>, InventoryError> {
        self.registered_product()?;
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity { quantity });
        }

        Ok(vec![StockEvent::StockReplenished(StockReplenishedData {
            quantity,
            remaining: self.stock.saturating_add(quantity),
            replenished_at: now,
        })])
    }
}
