//! Response cache bridge.
//!
//! A shared cache of successful read responses, keyed by endpoint and
//! distinct from the queue store: the offline layer serves stale-but-there
//! data from here while the queue holds operations still waiting to sync.
//! Successful weather replays write through with a freshness timestamp;
//! readers get a computed staleness flag. No eviction: lifecycle belongs
//! to the host's cache storage, not to this engine.

use std::time::Duration;

use dashmap::DashMap;

use crate::entry::now_millis;

/// Freshness window shared with the rest of the offline layer.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(10 * 60);

struct StoredResponse {
    body: String,
    cached_at: i64,
}

/// A cached body plus its computed staleness at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub body: String,
    /// Epoch millis at which the response was written through.
    pub cached_at: i64,
    pub is_stale: bool,
}

pub struct ResponseCache {
    entries: DashMap<String, StoredResponse>,
    freshness_window: Duration,
}

impl ResponseCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_freshness_window(DEFAULT_FRESHNESS_WINDOW)
    }

    #[must_use]
    pub fn with_freshness_window(freshness_window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            freshness_window,
        }
    }

    /// Store or overwrite the cached response for an endpoint.
    pub fn write(&self, endpoint: &str, body: String, cached_at: i64) {
        self.entries
            .insert(endpoint.to_string(), StoredResponse { body, cached_at });
    }

    /// Read the cached response, computing staleness against the freshness
    /// window at call time.
    #[must_use]
    pub fn read(&self, endpoint: &str) -> Option<CachedResponse> {
        self.entries.get(endpoint).map(|stored| {
            let age = now_millis().saturating_sub(stored.cached_at);
            CachedResponse {
                body: stored.body.clone(),
                cached_at: stored.cached_at,
                is_stale: age > self.freshness_window.as_millis() as i64,
            }
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}
