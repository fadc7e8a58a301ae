//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A fact recorded on an aggregate stream. Named in the past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Stable name stored alongside the payload, used for journal queries.
    fn event_type(&self) -> &'static str;
}

/// An event-sourced consistency boundary.
///
/// Command methods on implementors inspect current state and return the
/// events a change would produce (or an error). `apply` then evolves the
/// state; it must be deterministic and must not fail.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;
    type Error: std::error::Error + Send + Sync;

    /// Aggregate type name written on every envelope.
    fn aggregate_type() -> &'static str;

    /// `None` until the creation event has been applied.
    fn id(&self) -> Option<AggregateId>;

    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

/// Aggregates whose state is periodically captured so loads skip most of
/// the replay.
pub trait SnapshotCapable: Aggregate + Serialize + DeserializeOwned {
    /// Number of events between snapshots.
    fn snapshot_interval() -> usize {
        100
    }

    /// True when moving from `previous` to the current version crossed a
    /// multiple of the interval. A single commit may append several events,
    /// so an exact-multiple check would miss boundaries.
    fn snapshot_due(&self, previous: Version) -> bool {
        let interval = Self::snapshot_interval() as i64;
        let current = self.version().as_i64();
        interval > 0 && current > previous.as_i64() && current / interval > previous.as_i64() / interval
    }
}
