// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync service coordinator.
//!
//! The [`SyncService`] is the main orchestrator that ties together all
//! components:
//! - Durable per-category queue store (SQLite)
//! - Connectivity monitor bridging the host's online/offline signal
//! - Replay transport for queued operations
//! - Response cache write-through for refreshable reads
//! - Stats and completion-event emitter for UI collaborators
//!
//! One service instance exists per process, constructed at application
//! start and passed by reference to collaborators. There is no hidden
//! global state.
//!
//! # Example
//!
//! ```rust,no_run
//! use weather_sync::{SyncConfig, SyncService};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let service = SyncService::start(SyncConfig::default()).await;
//!
//! // Queue work while offline; entries survive restarts.
//! service.set_online(false);
//! service.queue_weather_sync("Paris", None).await;
//! service.queue_preferences_sync("user-1", json!({"units": "metric"})).await;
//!
//! // Bridge the platform's online signal; the watcher drains on recovery.
//! let _watcher = service.watch_connectivity();
//! service.set_online(true);
//! # }
//! ```

mod drain;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::entry::{HttpMethod, SyncCategory, SyncEntry};
use crate::stats::{EventEmitter, SyncEvent, SyncStats};
use crate::store::sql::SqliteQueueStore;
use crate::store::traits::{QueueStore, StoreError};
use crate::transport::{HttpTransport, SyncTransport};

/// Main sync service coordinator.
///
/// # Thread Safety
///
/// The service is `Send + Sync` and designed for concurrent access.
/// Per-category in-flight flags keep redundant drain triggers from
/// double-processing a table; every store call is atomic on its own.
pub struct SyncService {
    pub(super) config: SyncConfig,

    /// `None` when the durable store could not be opened. The service then
    /// runs degraded: enqueues report failure, drains no-op.
    pub(super) store: Option<Arc<dyn QueueStore>>,

    pub(super) transport: Arc<dyn SyncTransport>,

    /// Shared response cache written through on successful weather replays.
    pub(super) cache: ResponseCache,

    pub(super) connectivity: ConnectivityMonitor,

    /// One drain-in-flight flag per category, indexed by
    /// `SyncCategory::index()`.
    pub(super) in_flight: [AtomicBool; 3],

    pub(super) events: EventEmitter,

    /// Completion timestamp of the most recent drain cycle.
    pub(super) last_completed: RwLock<Option<i64>>,
}

impl SyncService {
    /// Open the durable store named by the config and assemble the service
    /// with the HTTP transport.
    ///
    /// A store that cannot be opened does not fail construction: the
    /// service comes up degraded (queueing disabled) and logs the reason
    /// once, since background sync must never take the host down with it.
    pub async fn start(config: SyncConfig) -> Arc<Self> {
        let path = config
            .db_path
            .clone()
            .unwrap_or_else(|| "./weather_sync.db".to_string());

        let store: Option<Arc<dyn QueueStore>> = match SqliteQueueStore::open(&path).await {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                warn!(error = %e, path = %path, "queue store unavailable, sync queueing disabled");
                None
            }
        };

        Self::new(config, store, Arc::new(HttpTransport::new()))
    }

    /// Assemble a service from explicit parts. This is the seam tests and
    /// embedding hosts use to supply their own store or transport.
    pub fn new(
        config: SyncConfig,
        store: Option<Arc<dyn QueueStore>>,
        transport: Arc<dyn SyncTransport>,
    ) -> Arc<Self> {
        let cache =
            ResponseCache::with_freshness_window(Duration::from_secs(config.freshness_window_secs));
        let connectivity = ConnectivityMonitor::new(config.start_online);
        let events = EventEmitter::new(config.event_capacity);

        Arc::new(Self {
            config,
            store,
            transport,
            cache,
            connectivity,
            in_flight: [
                AtomicBool::new(false),
                AtomicBool::new(false),
                AtomicBool::new(false),
            ],
            events,
            last_completed: RwLock::new(None),
        })
    }

    /// Whether the service is running without a durable store.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.store.is_none()
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Record a connectivity change from the host platform layer. Returns
    /// whether the state actually changed.
    pub fn set_online(&self, online: bool) -> bool {
        self.connectivity.set_online(online)
    }

    /// Subscribe to sync-lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Completion timestamp (epoch millis) of the most recent drain cycle,
    /// if any ran this process.
    #[must_use]
    pub fn last_completed_at(&self) -> Option<i64> {
        *self.last_completed.read()
    }

    /// The shared response cache, for collaborators serving offline reads.
    #[must_use]
    pub fn response_cache(&self) -> &ResponseCache {
        &self.cache
    }

    // --- Enqueue API ---

    /// Queue a weather refresh for `city`. Returns whether the entry was
    /// durably queued.
    pub async fn queue_weather_sync(&self, city: &str, request_data: Option<Value>) -> bool {
        let endpoint = format!("{}/api/weather/{}/", self.api_base(), city);
        let entry = SyncEntry::new(
            SyncCategory::Weather,
            Some(city.to_string()),
            endpoint,
            HttpMethod::Get,
            request_data,
        )
        .with_retry_limit(self.config.retry_limit);

        self.enqueue(entry).await
    }

    /// Queue a preference update for `user_id`.
    pub async fn queue_preferences_sync(&self, user_id: &str, preferences: Value) -> bool {
        let endpoint = format!("{}/api/user/preferences/", self.api_base());
        let entry = SyncEntry::new(
            SyncCategory::Preferences,
            Some(user_id.to_string()),
            endpoint,
            HttpMethod::Put,
            Some(preferences),
        )
        .with_retry_limit(self.config.retry_limit);

        self.enqueue(entry).await
    }

    /// Queue an alert subscription.
    pub async fn queue_alert_sync(&self, alert_data: Value) -> bool {
        let endpoint = format!("{}/api/alerts/", self.api_base());
        let entry = SyncEntry::new(
            SyncCategory::Alert,
            None,
            endpoint,
            HttpMethod::Post,
            Some(alert_data),
        )
        .with_retry_limit(self.config.retry_limit);

        self.enqueue(entry).await
    }

    fn api_base(&self) -> &str {
        self.config.api_base.trim_end_matches('/')
    }

    async fn enqueue(&self, entry: SyncEntry) -> bool {
        let Some(store) = &self.store else {
            warn!(category = %entry.category, "queue store unavailable, entry not queued");
            return false;
        };
        let category = entry.category;

        // Bounded queue: reject rather than grow without ceiling. A failed
        // count is not fatal; the add itself still decides the outcome.
        match store.count(category).await {
            Ok(pending) if pending >= self.config.max_pending_per_category => {
                warn!(
                    category = %category,
                    pending,
                    cap = self.config.max_pending_per_category,
                    "queue at capacity, entry rejected"
                );
                crate::metrics::record_enqueue(category, "rejected");
                return false;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, category = %category, "pending count unavailable before enqueue");
                crate::metrics::record_store_error("count");
            }
        }

        match store.add(&entry).await {
            Ok(persisted) => {
                debug!(
                    category = %category,
                    id = persisted.id,
                    target = ?persisted.target,
                    "sync entry queued"
                );
                crate::metrics::record_enqueue(category, "queued");
                true
            }
            Err(e) => {
                warn!(error = %e, category = %category, "failed to queue sync entry");
                crate::metrics::record_enqueue(category, "error");
                false
            }
        }
    }

    // --- Inspection API ---

    /// Pending-entry counts per category. Degraded mode reports zeros.
    pub async fn get_sync_stats(&self) -> SyncStats {
        let Some(store) = &self.store else {
            return SyncStats::empty();
        };

        let mut counts = [0u64; 3];
        for category in SyncCategory::ALL {
            match store.count(category).await {
                Ok(count) => counts[category.index()] = count,
                Err(e) => {
                    warn!(error = %e, category = %category, "pending count unavailable");
                    crate::metrics::record_store_error("count");
                }
            }
            crate::metrics::set_pending(category, counts[category.index()]);
        }

        SyncStats::new(counts[0], counts[1], counts[2])
    }

    /// All pending entries, for diagnostics and tests. With no category the
    /// result merges every table, sorted by `enqueued_at`.
    pub async fn get_pending_sync_requests(
        &self,
        category: Option<SyncCategory>,
    ) -> Vec<SyncEntry> {
        let Some(store) = &self.store else {
            return Vec::new();
        };

        let categories: &[SyncCategory] = match category {
            Some(ref c) => std::slice::from_ref(c),
            None => &SyncCategory::ALL,
        };

        let mut all = Vec::new();
        for category in categories {
            match store.get_all(*category).await {
                Ok(mut entries) => all.append(&mut entries),
                Err(e) => {
                    warn!(error = %e, category = %category, "failed to read pending entries")
                }
            }
        }
        all.sort_by_key(|e| (e.enqueued_at, e.id));
        all
    }

    /// Wipe every queue table. Administrative and test use only.
    pub async fn clear_all_sync_data(&self) -> Result<(), StoreError> {
        let Some(store) = &self.store else {
            return Err(StoreError::Unavailable("queue store not open".to_string()));
        };
        store.clear_all().await
    }
}
