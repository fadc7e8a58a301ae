//! Inventory Ledger: per-product stock with reserve/release.
//!
//! Every product's stock is a `StockItem` stream. Workflows stage stock
//! movements through [`StockMovements`] into the same unit of work as the
//! order change they belong to, so reservation and order creation (or release
//! and adjustment approval) land in one atomic commit. Two placements racing
//! for the same product both load the same stream version and only the first
//! commit wins; the loser gets [`FulfillmentError::Conflict`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{AggregateId, OrderItemId, ProductId};
use domain::{Aggregate, ReleaseReason, Repository, StockItem, UnitOfWork};
use event_store::EventStore;
use serde::Serialize;

use crate::actor::Actor;
use crate::context::Context;
use crate::error::{FulfillmentError, Result};
use crate::notifications::Notification;
use crate::requests::{RegisterProductRequest, RestockRequest};

/// Read view of one ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub product_id: ProductId,
    pub name: String,
    pub stock: u32,
    pub low_stock_threshold: u32,
    pub is_low_stock: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StockLevel {
    fn of(product_id: ProductId, item: &StockItem) -> Self {
        Self {
            product_id,
            name: item.name().to_string(),
            stock: item.stock(),
            low_stock_threshold: item.low_stock_threshold(),
            is_low_stock: item.is_low_stock(),
            updated_at: item.updated_at(),
        }
    }
}

fn product_not_found(product_id: ProductId) -> FulfillmentError {
    FulfillmentError::NotFound(format!("Product {product_id}"))
}

/// Ledger rows touched by one workflow.
///
/// Each row is loaded once; later movements on the same product build on the
/// earlier ones staged in the unit of work.
pub(crate) struct StockMovements<'a, S> {
    repo: &'a Repository<S>,
    now: DateTime<Utc>,
    rows: HashMap<ProductId, StockItem>,
    touched: Vec<ProductId>,
}

impl<'a, S: EventStore> StockMovements<'a, S> {
    pub fn new(repo: &'a Repository<S>, now: DateTime<Utc>) -> Self {
        Self {
            repo,
            now,
            rows: HashMap::new(),
            touched: Vec::new(),
        }
    }

    /// Loads the row of `product_id`, failing with `NotFound` for products
    /// the ledger has never seen.
    pub async fn row(&mut self, product_id: ProductId) -> Result<&mut StockItem> {
        if !self.rows.contains_key(&product_id) {
            let item: StockItem = self.repo.load(product_id.stream_id()).await?;
            if item.id().is_none() {
                return Err(product_not_found(product_id));
            }
            self.rows.insert(product_id, item);
            self.touched.push(product_id);
        }
        self.rows
            .get_mut(&product_id)
            .ok_or_else(|| product_not_found(product_id))
    }

    /// Takes `quantity` units for an order line and returns the stock left.
    pub async fn reserve(
        &mut self,
        unit: &mut UnitOfWork,
        order_id: AggregateId,
        order_item_id: OrderItemId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<u32> {
        let now = self.now;
        let row = self.row(product_id).await?;
        let events = row.reserve(order_id, order_item_id, quantity, now)?;
        unit.record(product_id.stream_id(), row, events)?;
        Ok(row.stock())
    }

    /// Gives `quantity` units of an order line back and returns the new stock.
    pub async fn release(
        &mut self,
        unit: &mut UnitOfWork,
        order_id: AggregateId,
        order_item_id: OrderItemId,
        product_id: ProductId,
        quantity: u32,
        reason: ReleaseReason,
    ) -> Result<u32> {
        let now = self.now;
        let row = self.row(product_id).await?;
        let events = row.release(order_id, order_item_id, quantity, reason, now)?;
        unit.record(product_id.stream_id(), row, events)?;
        Ok(row.stock())
    }

    /// Low-stock alerts for every touched product, in first-touch order.
    pub fn low_stock_alerts(&self) -> Vec<Notification> {
        self.touched
            .iter()
            .filter_map(|product_id| {
                let row = self.rows.get(product_id)?;
                row.is_low_stock().then(|| Notification::LowStock {
                    product_id: *product_id,
                    name: row.name().to_string(),
                    stock: row.stock(),
                    threshold: row.low_stock_threshold(),
                })
            })
            .collect()
    }
}

/// Catalog-facing ledger operations, each committed on its own.
#[derive(Clone)]
pub struct InventoryLedger<S> {
    ctx: Context<S>,
}

impl<S: EventStore + Clone> InventoryLedger<S> {
    pub(crate) fn new(ctx: Context<S>) -> Self {
        Self { ctx }
    }

    #[tracing::instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn register_product(
        &self,
        actor: &Actor,
        request: RegisterProductRequest,
    ) -> Result<StockLevel> {
        actor.require_admin()?;
        request.validate()?;

        let product_id = request.product_id;
        let threshold = request
            .low_stock_threshold
            .unwrap_or(self.ctx.config.default_low_stock_threshold);
        let mut item: StockItem = self.ctx.repo.load(product_id.stream_id()).await?;
        let events = item.register(
            product_id,
            request.name,
            request.initial_stock,
            threshold,
            self.ctx.now(),
        )?;

        let mut unit = self.ctx.unit(actor);
        unit.record(product_id.stream_id(), &mut item, events)?;
        self.ctx.repo.commit(unit).await?;

        tracing::info!(stock = item.stock(), threshold, "product registered");
        Ok(StockLevel::of(product_id, &item))
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn restock(
        &self,
        actor: &Actor,
        product_id: ProductId,
        request: RestockRequest,
    ) -> Result<StockLevel> {
        actor.require_admin()?;
        request.validate()?;

        let mut item = self.load(product_id).await?;
        let events = item.replenish(request.quantity, self.ctx.now())?;

        let mut unit = self.ctx.unit(actor);
        unit.record(product_id.stream_id(), &mut item, events)?;
        self.ctx.repo.commit(unit).await?;

        tracing::info!(quantity = request.quantity, stock = item.stock(), "product restocked");
        Ok(StockLevel::of(product_id, &item))
    }

    pub async fn stock_level(&self, product_id: ProductId) -> Result<StockLevel> {
        let item = self.load(product_id).await?;
        Ok(StockLevel::of(product_id, &item))
    }

    /// True when `0 < stock <= threshold`. Informational only.
    pub async fn is_low_stock(&self, product_id: ProductId) -> Result<bool> {
        Ok(self.load(product_id).await?.is_low_stock())
    }

    /// Reserves stock for a single order line in its own commit.
    ///
    /// Order workflows stage reservations together with the order instead;
    /// this entry point serves callers that own the line elsewhere.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(
        &self,
        order_id: AggregateId,
        order_item_id: OrderItemId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<u32> {
        let mut unit = UnitOfWork::new();
        let mut stock = StockMovements::new(&self.ctx.repo, self.ctx.now());
        let remaining = match stock
            .reserve(&mut unit, order_id, order_item_id, product_id, quantity)
            .await
        {
            Ok(remaining) => remaining,
            Err(e) => {
                if matches!(e, FulfillmentError::InsufficientStock { .. }) {
                    metrics::counter!("stock_reservation_failures_total").increment(1);
                }
                return Err(e);
            }
        };
        self.ctx.repo.commit(unit).await?;
        self.ctx.outbox.publish_all(stock.low_stock_alerts());
        Ok(remaining)
    }

    /// Releases stock of a single order line in its own commit.
    #[tracing::instrument(skip(self))]
    pub async fn release(
        &self,
        order_id: AggregateId,
        order_item_id: OrderItemId,
        product_id: ProductId,
        quantity: u32,
        reason: ReleaseReason,
    ) -> Result<u32> {
        let mut unit = UnitOfWork::new();
        let mut stock = StockMovements::new(&self.ctx.repo, self.ctx.now());
        let remaining = stock
            .release(&mut unit, order_id, order_item_id, product_id, quantity, reason)
            .await?;
        self.ctx.repo.commit(unit).await?;
        Ok(remaining)
    }

    async fn load(&self, product_id: ProductId) -> Result<StockItem> {
        self.ctx
            .repo
            .load_existing::<StockItem>(product_id.stream_id())
            .await?
            .ok_or_else(|| product_not_found(product_id))
    }
}
