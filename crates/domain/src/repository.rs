//! Loading aggregates and committing changes across several streams.

use std::collections::HashMap;

use common::AggregateId;
use event_store::{
    AppendOptions, EventEnvelope, EventStore, EventStoreExt, Snapshot, StreamWrite, Version,
};
use serde::de::DeserializeOwned;

use crate::aggregate::{Aggregate, DomainEvent, SnapshotCapable};
use crate::error::DomainError;

struct PendingStream {
    aggregate_id: AggregateId,
    /// Version the stream was at when first recorded in this unit.
    expected: Version,
    events: Vec<EventEnvelope>,
}

/// Changes to several aggregates that must land together.
///
/// `record` applies events to the in-memory aggregate immediately, so a
/// workflow that touches the same aggregate twice (two order lines for one
/// product) sees its own earlier changes. Nothing reaches the journal until
/// [`Repository::commit`].
#[derive(Default)]
pub struct UnitOfWork {
    streams: Vec<PendingStream>,
    snapshots: Vec<Snapshot>,
    metadata: HashMap<String, serde_json::Value>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `key = value` to every envelope recorded from now on.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Applies `events` to `aggregate` and stages them for its stream.
    pub fn record<A: Aggregate>(
        &mut self,
        aggregate_id: AggregateId,
        aggregate: &mut A,
        events: Vec<A::Event>,
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let start = aggregate.version();
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = start;

        for event in events {
            version = version.next();
            let mut builder = EventEnvelope::builder()
                .aggregate_id(aggregate_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(&event)?;
            for (key, value) in &self.metadata {
                builder = builder.metadata(key.clone(), value.clone());
            }
            envelopes.push(builder.build()?);

            aggregate.apply(event);
            aggregate.set_version(version);
        }

        match self
            .streams
            .iter_mut()
            .find(|s| s.aggregate_id == aggregate_id)
        {
            Some(stream) => stream.events.extend(envelopes),
            None => self.streams.push(PendingStream {
                aggregate_id,
                expected: start,
                events: envelopes,
            }),
        }

        Ok(())
    }

    /// Stages a snapshot of `aggregate` if this unit pushed it across a
    /// snapshot boundary. Call after the last `record` for that aggregate.
    pub fn snapshot_if_due<A: SnapshotCapable>(
        &mut self,
        aggregate_id: AggregateId,
        aggregate: &A,
    ) -> Result<(), DomainError> {
        let Some(stream) = self.streams.iter().find(|s| s.aggregate_id == aggregate_id) else {
            return Ok(());
        };
        if !aggregate.snapshot_due(stream.expected) {
            return Ok(());
        }

        let snapshot = Snapshot::from_state(
            aggregate_id,
            A::aggregate_type(),
            aggregate.version(),
            aggregate,
        )?;
        self.snapshots.retain(|s| s.aggregate_id != aggregate_id);
        self.snapshots.push(snapshot);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Number of staged events across all streams.
    pub fn event_count(&self) -> usize {
        self.streams.iter().map(|s| s.events.len()).sum()
    }
}

/// Loads aggregates from an [`EventStore`] and commits units of work.
#[derive(Clone)]
pub struct Repository<S> {
    store: S,
}

impl<S: EventStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuilds an aggregate from its latest snapshot and the events after it.
    /// A stream with no events yields `A::default()`.
    pub async fn load<A>(&self, aggregate_id: AggregateId) -> Result<A, DomainError>
    where
        A: Aggregate + DeserializeOwned,
    {
        let (snapshot, events) = self.store.load_aggregate(aggregate_id).await?;

        let mut aggregate = match snapshot {
            Some(snapshot) => {
                let version = snapshot.version;
                let mut restored: A = snapshot.into_state()?;
                restored.set_version(version);
                restored
            }
            None => A::default(),
        };

        for envelope in events {
            let event: A::Event = serde_json::from_value(envelope.payload)?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    /// Like [`load`](Self::load) but `None` when the stream does not exist.
    pub async fn load_existing<A>(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError>
    where
        A: Aggregate + DeserializeOwned,
    {
        let aggregate: A = self.load(aggregate_id).await?;
        Ok(aggregate.id().map(|_| aggregate))
    }

    /// Appends every staged stream in one atomic commit, then stores any
    /// staged snapshots.
    ///
    /// If any stream moved since it was loaded the whole unit is rejected
    /// with a concurrency conflict and nothing is written.
    pub async fn commit(&self, unit: UnitOfWork) -> Result<(), DomainError> {
        if unit.is_empty() {
            return Ok(());
        }

        let writes = unit
            .streams
            .into_iter()
            .map(|s| StreamWrite::new(s.events, AppendOptions::expect_version(s.expected)))
            .collect();
        self.store.commit(writes).await?;

        for snapshot in unit.snapshots {
            let aggregate_id = snapshot.aggregate_id;
            // The events are durable already; a missing snapshot only costs replay time.
            if let Err(e) = self.store.save_snapshot(snapshot).await {
                tracing::warn!(%aggregate_id, error = %e, "failed to save snapshot");
            }
        }

        Ok(())
    }
}
