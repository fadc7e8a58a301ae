//! Append-only event journal backing the fulfillment engine.
//!
//! Streams are versioned for optimistic concurrency. [`EventStore::commit`]
//! appends to several streams at once and either writes everything or
//! nothing, which is what lets a stock release, an item shrink and an order
//! total change land together.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod snapshot;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::EventQuery;
pub use snapshot::Snapshot;
pub use store::{AppendOptions, EventStore, EventStoreExt, StreamWrite};
