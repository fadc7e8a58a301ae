use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventQuery, EventStoreError, Result, Snapshot, Version,
    store::{EventStore, StreamWrite, validate_commit},
};

#[derive(Default)]
struct Journal {
    /// Every event in recording order.
    log: Vec<EventEnvelope>,
    /// Current version of each stream.
    heads: HashMap<AggregateId, Version>,
}

/// In-memory journal used by tests and the default binary configuration.
///
/// A single write lock covers the version checks and the append of a whole
/// commit, so concurrent commits are linearizable.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    journal: Arc<RwLock<Journal>>,
    snapshots: Arc<RwLock<HashMap<AggregateId, Snapshot>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events recorded.
    pub async fn event_count(&self) -> usize {
        self.journal.read().await.log.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn commit(&self, writes: Vec<StreamWrite>) -> Result<Vec<Version>> {
        validate_commit(&writes)?;

        let mut journal = self.journal.write().await;

        for write in &writes {
            let Some(aggregate_id) = write.aggregate_id() else {
                continue;
            };
            let actual = journal
                .heads
                .get(&aggregate_id)
                .copied()
                .unwrap_or(Version::initial());

            let expected = write.options.expected_version;
            let first_new = write.events[0].version;
            let stale = match expected {
                Some(expected) => expected != actual,
                // Unchecked writes still may not overwrite existing versions.
                None => first_new <= actual,
            };
            if stale {
                metrics::counter!("event_store_conflicts_total").increment(1);
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id,
                    expected: expected.unwrap_or(actual),
                    actual,
                });
            }
        }

        let mut versions = Vec::with_capacity(writes.len());
        for write in writes {
            let last = write.last_version();
            if let Some(aggregate_id) = write.aggregate_id() {
                journal.heads.insert(aggregate_id, last);
            }
            journal.log.extend(write.events);
            versions.push(last);
        }

        Ok(versions)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        self.get_events_for_aggregate_from_version(aggregate_id, Version::first())
            .await
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let journal = self.journal.read().await;
        let mut events: Vec<_> = journal
            .log
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id && e.version >= from_version)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let journal = self.journal.read().await;
        let matching = journal
            .log
            .iter()
            .filter(|e| query.matches(&e.aggregate_type, &e.event_type, e.timestamp))
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matching)
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        Ok(self.journal.read().await.heads.get(&aggregate_id).copied())
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.aggregate_id, snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>> {
        Ok(self.snapshots.read().await.get(&aggregate_id).cloned())
    }
}
