use async_trait::async_trait;

use crate::{AggregateId, EventEnvelope, EventQuery, EventStoreError, Result, Snapshot, Version};

/// Concurrency expectation for a stream write.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Version the stream must be at for the write to succeed.
    /// `None` skips the check.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// No version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stream must currently be at `version`.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// The stream must not exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Events destined for a single stream within a commit.
#[derive(Debug, Clone)]
pub struct StreamWrite {
    pub events: Vec<EventEnvelope>,
    pub options: AppendOptions,
}

impl StreamWrite {
    pub fn new(events: Vec<EventEnvelope>, options: AppendOptions) -> Self {
        Self { events, options }
    }

    /// Stream targeted by this write. Only valid after validation.
    pub fn aggregate_id(&self) -> Option<AggregateId> {
        self.events.first().map(|e| e.aggregate_id)
    }

    /// Version the stream reaches once this write lands.
    pub fn last_version(&self) -> Version {
        self.events
            .last()
            .map(|e| e.version)
            .unwrap_or(Version::initial())
    }
}

/// Persistent, append-only event journal.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends to one or more streams atomically.
    ///
    /// Every write's expected version is checked before anything is stored.
    /// If any stream has moved on, the whole commit fails with
    /// [`EventStoreError::ConcurrencyConflict`] and no event is persisted.
    ///
    /// Returns the new version of each stream, in the order of `writes`.
    async fn commit(&self, writes: Vec<StreamWrite>) -> Result<Vec<Version>>;

    /// Appends events to a single stream.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        let versions = self.commit(vec![StreamWrite::new(events, options)]).await?;
        versions
            .into_iter()
            .next()
            .ok_or_else(|| EventStoreError::InvalidCommit("empty commit result".to_string()))
    }

    /// All events of a stream, oldest first.
    async fn get_events_for_aggregate(&self, aggregate_id: AggregateId)
    -> Result<Vec<EventEnvelope>>;

    /// Events of a stream from `from_version` (inclusive), oldest first.
    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>>;

    /// Events across all streams matching `query`, in recording order.
    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>>;

    /// Current version of a stream, `None` if it has no events.
    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;

    /// Stores `snapshot`, replacing any earlier one for the same stream.
    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    /// Latest snapshot of a stream.
    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>>;
}

/// Convenience methods available on every [`EventStore`].
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Returns true if the stream has at least one event.
    async fn aggregate_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.get_aggregate_version(aggregate_id).await?.is_some())
    }

    /// Loads the latest snapshot (if any) and the events recorded after it.
    async fn load_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<(Option<Snapshot>, Vec<EventEnvelope>)> {
        if let Some(snapshot) = self.get_snapshot(aggregate_id).await? {
            let events = self
                .get_events_for_aggregate_from_version(aggregate_id, snapshot.version.next())
                .await?;
            Ok((Some(snapshot), events))
        } else {
            let events = self.get_events_for_aggregate(aggregate_id).await?;
            Ok((None, events))
        }
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks the shape of a commit before any backend touches storage.
///
/// Each write must be non-empty, target one stream with one aggregate type,
/// carry consecutive versions, and start right after its expected version.
/// A stream may appear in only one write per commit.
pub fn validate_commit(writes: &[StreamWrite]) -> Result<()> {
    if writes.is_empty() {
        return Err(EventStoreError::InvalidCommit(
            "commit contains no writes".to_string(),
        ));
    }

    let mut seen: Vec<AggregateId> = Vec::with_capacity(writes.len());
    for write in writes {
        let Some(first) = write.events.first() else {
            return Err(EventStoreError::InvalidCommit(
                "write contains no events".to_string(),
            ));
        };

        if seen.contains(&first.aggregate_id) {
            return Err(EventStoreError::InvalidCommit(format!(
                "stream {} appears twice in one commit",
                first.aggregate_id
            )));
        }
        seen.push(first.aggregate_id);

        if let Some(expected) = write.options.expected_version
            && first.version != expected.next()
        {
            return Err(EventStoreError::InvalidCommit(format!(
                "stream {} expected at {} but first event is version {}",
                first.aggregate_id, expected, first.version
            )));
        }

        let mut expected_version = first.version;
        for event in write.events.iter().skip(1) {
            if event.aggregate_id != first.aggregate_id
                || event.aggregate_type != first.aggregate_type
            {
                return Err(EventStoreError::InvalidCommit(
                    "all events of a write must target the same stream".to_string(),
                ));
            }
            expected_version = expected_version.next();
            if event.version != expected_version {
                return Err(EventStoreError::InvalidCommit(format!(
                    "versions must be sequential: expected {}, got {}",
                    expected_version, event.version
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(aggregate_id: AggregateId, version: i64) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("StockItem")
            .event_type("StockReserved")
            .version(Version::new(version))
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap()
    }

    #[test]
    fn accepts_multi_stream_commit() {
        let a = AggregateId::new();
        let b = AggregateId::new();
        let writes = vec![
            StreamWrite::new(vec![envelope(a, 1), envelope(a, 2)], AppendOptions::expect_new()),
            StreamWrite::new(
                vec![envelope(b, 4)],
                AppendOptions::expect_version(Version::new(3)),
            ),
        ];

        assert!(validate_commit(&writes).is_ok());
        assert_eq!(writes[0].last_version(), Version::new(2));
    }

    #[test]
    fn rejects_empty_commit_and_empty_write() {
        assert!(validate_commit(&[]).is_err());
        let writes = vec![StreamWrite::new(vec![], AppendOptions::new())];
        assert!(validate_commit(&writes).is_err());
    }

    #[test]
    fn rejects_duplicate_stream() {
        let a = AggregateId::new();
        let writes = vec![
            StreamWrite::new(vec![envelope(a, 1)], AppendOptions::new()),
            StreamWrite::new(vec![envelope(a, 2)], AppendOptions::new()),
        ];

        assert!(matches!(
            validate_commit(&writes),
            Err(EventStoreError::InvalidCommit(_))
        ));
    }

    #[test]
    fn rejects_gap_in_versions() {
        let a = AggregateId::new();
        let writes = vec![StreamWrite::new(
            vec![envelope(a, 1), envelope(a, 3)],
            AppendOptions::new(),
        )];

        assert!(validate_commit(&writes).is_err());
    }

    #[test]
    fn rejects_write_not_following_expected_version() {
        let a = AggregateId::new();
        let writes = vec![StreamWrite::new(
            vec![envelope(a, 5)],
            AppendOptions::expect_version(Version::new(2)),
        )];

        assert!(validate_commit(&writes).is_err());
    }
}
