//! Domain layer of the order fulfillment engine.
//!
//! Three event-sourced aggregates live here:
//! - [`Order`]: header, line items and the adjustment records raised against them
//! - [`StockItem`]: one Inventory Ledger row per product
//! - [`Payment`]: a manually asserted payment and its verification state
//!
//! Aggregates decide (command methods return events) and evolve (`apply`).
//! [`Repository`] loads them and commits a [`UnitOfWork`] spanning several
//! streams in one atomic append.

pub mod aggregate;
pub mod error;
pub mod inventory;
pub mod order;
pub mod payment;
pub mod repository;

pub use aggregate::{Aggregate, DomainEvent, SnapshotCapable};
pub use error::DomainError;
pub use inventory::{InventoryError, ReleaseReason, StockEvent, StockItem};
pub use order::{
    Adjustment, AdjustmentKind, AdjustmentReason, AdjustmentStatus, Money, Order, OrderError,
    OrderEvent, OrderItem, OrderStatus, PaymentStatus, ShippingAddress,
};
pub use payment::{
    MerchantAccountType, Payment, PaymentError, PaymentEvent, PaymentMethod, PaymentState,
    ReceiverAccount, VerificationOutcome,
};
pub use repository::{Repository, UnitOfWork};
