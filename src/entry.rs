//! Sync entry data structure.
//!
//! The [`SyncEntry`] is the durable unit of work that flows through the
//! engine: one replayable record of a pending operation, persisted in its
//! category's queue table until it either syncs successfully or exhausts
//! its retry budget.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default number of attempts before an entry is permanently dropped.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Operation category.
///
/// Each category lives in its own queue table, is drained independently,
/// and has its own replay handler. There is no cross-category ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncCategory {
    /// Refreshable weather reads; successful replays write through to the
    /// response cache.
    Weather,
    /// User preference updates.
    Preferences,
    /// Alert subscriptions.
    Alert,
}

impl SyncCategory {
    /// All categories, in drain order.
    pub const ALL: [SyncCategory; 3] = [Self::Weather, Self::Preferences, Self::Alert];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Preferences => "preferences",
            Self::Alert => "alert",
        }
    }

    /// Queue table backing this category.
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Self::Weather => "weather_sync",
            Self::Preferences => "preferences_sync",
            Self::Alert => "alerts_sync",
        }
    }

    /// Dense index, for per-category state arrays.
    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Weather => 0,
            Self::Preferences => 1,
            Self::Alert => 2,
        }
    }
}

impl std::fmt::Display for SyncCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP verb used when the entry is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One durable record of a pending operation.
///
/// Entries are only ever mutated to bump `retry_count`, or deleted outright.
/// `id` is unique within the category's table, not globally; cross-category
/// identity is `(category, id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEntry {
    /// Auto-assigned table rowid. 0 until the store persists the entry.
    pub id: i64,
    pub category: SyncCategory,
    /// Logical subject: city for weather, user id for preferences,
    /// absent for alerts.
    pub target: Option<String>,
    /// URL the operation is replayed against.
    pub endpoint: String,
    pub method: HttpMethod,
    /// Request body; `None` for read operations.
    pub payload: Option<Value>,
    /// Creation timestamp (epoch millis). Drain order is ascending.
    pub enqueued_at: i64,
    /// Failed attempts so far.
    pub retry_count: u32,
    /// Attempts before the entry is permanently dropped.
    pub retry_limit: u32,
}

impl SyncEntry {
    /// Create an unpersisted entry with a zero id and fresh timestamps.
    #[must_use]
    pub fn new(
        category: SyncCategory,
        target: Option<String>,
        endpoint: String,
        method: HttpMethod,
        payload: Option<Value>,
    ) -> Self {
        Self {
            id: 0,
            category,
            target,
            endpoint,
            method,
            payload,
            enqueued_at: now_millis(),
            retry_count: 0,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }

    #[must_use]
    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = limit;
        self
    }

    /// Whether the entry is still eligible for replay.
    #[must_use]
    pub fn is_replay_candidate(&self) -> bool {
        self.retry_count < self.retry_limit
    }
}

/// Current wall-clock time as epoch millis.
pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_entry_defaults() {
        let entry = SyncEntry::new(
            SyncCategory::Weather,
            Some("Paris".to_string()),
            "/api/weather/Paris/".to_string(),
            HttpMethod::Get,
            None,
        );

        assert_eq!(entry.id, 0);
        assert_eq!(entry.category, SyncCategory::Weather);
        assert_eq!(entry.target.as_deref(), Some("Paris"));
        assert_eq!(entry.retry_count, 0);
        assert_eq!(entry.retry_limit, DEFAULT_RETRY_LIMIT);
        assert!(entry.payload.is_none());
        assert!(entry.enqueued_at > 0);
        assert!(entry.is_replay_candidate());
    }

    #[test]
    fn test_replay_candidate_at_ceiling() {
        let mut entry = SyncEntry::new(
            SyncCategory::Alert,
            None,
            "/api/alerts/".to_string(),
            HttpMethod::Post,
            Some(json!({"severity": "storm"})),
        );

        entry.retry_count = entry.retry_limit;
        assert!(!entry.is_replay_candidate());
    }

    #[test]
    fn test_with_retry_limit() {
        let entry = SyncEntry::new(
            SyncCategory::Preferences,
            Some("user-1".to_string()),
            "/api/user/preferences/".to_string(),
            HttpMethod::Put,
            Some(json!({"units": "metric"})),
        )
        .with_retry_limit(5);

        assert_eq!(entry.retry_limit, 5);
    }

    #[test]
    fn test_category_tables_are_distinct() {
        let tables: Vec<_> = SyncCategory::ALL.iter().map(|c| c.table()).collect();
        assert_eq!(tables, vec!["weather_sync", "preferences_sync", "alerts_sync"]);
    }

    #[test]
    fn test_method_round_trip() {
        for method in [HttpMethod::Get, HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete] {
            assert_eq!(HttpMethod::parse(method.as_str()), Some(method));
        }
        assert_eq!(HttpMethod::parse("PATCH"), None);
    }

    #[test]
    fn test_serialize_deserialize() {
        let entry = SyncEntry::new(
            SyncCategory::Preferences,
            Some("user-9".to_string()),
            "/api/user/preferences/".to_string(),
            HttpMethod::Put,
            Some(json!({"theme": "dark"})),
        );

        let json_str = serde_json::to_string(&entry).unwrap();
        let back: SyncEntry = serde_json::from_str(&json_str).unwrap();

        assert_eq!(back.category, entry.category);
        assert_eq!(back.endpoint, entry.endpoint);
        assert_eq!(back.payload, entry.payload);
    }
}
