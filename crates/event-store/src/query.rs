use chrono::{DateTime, Utc};

/// Filter over the whole journal, used for listings that cut across streams
/// (e.g. every `OrderPlaced` event).
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Only events from streams of this aggregate type.
    pub aggregate_type: Option<String>,

    /// Only events of one of these types.
    pub event_types: Option<Vec<String>>,

    /// Only events recorded at or after this instant.
    pub since: Option<DateTime<Utc>>,

    /// Maximum number of events to return.
    pub limit: Option<usize>,

    /// Number of matching events to skip.
    pub offset: Option<usize>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query for events of a specific type.
    pub fn for_event_type(event_type: impl Into<String>) -> Self {
        Self {
            event_types: Some(vec![event_type.into()]),
            ..Default::default()
        }
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if an event with these coordinates passes the filter.
    pub fn matches(&self, aggregate_type: &str, event_type: &str, at: DateTime<Utc>) -> bool {
        if let Some(ref wanted) = self.aggregate_type
            && wanted != aggregate_type
        {
            return false;
        }
        if let Some(ref types) = self.event_types
            && !types.iter().any(|t| t == event_type)
        {
            return false;
        }
        if let Some(since) = self.since
            && at < since
        {
            return false;
        }
        true
    }
}
