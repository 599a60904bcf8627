// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Drain execution: the per-category replay loop and retry state machine.
//!
//! A drain is externally triggered (connectivity watcher, a timer, or a
//! manual UI action) and is safe to invoke redundantly: a trigger
//! that lands while the same category is already draining is coalesced.
//! Entries are replayed strictly sequentially within a category; categories
//! drain independently and may interleave.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::entry::{now_millis, SyncCategory, SyncEntry};
use crate::stats::SyncEvent;
use crate::store::traits::QueueStore;
use crate::transport::SyncTransport;

use super::SyncService;

impl SyncService {
    /// Drain all three categories, then broadcast one completion event.
    ///
    /// No-ops silently when offline or degraded: this is typically invoked
    /// from event handlers with no caller awaiting a result, so it must
    /// never fail loudly.
    pub async fn sync_all_pending_data(&self) {
        if self.store.is_none() {
            debug!("queue store unavailable, sync cycle skipped");
            return;
        }
        if !self.connectivity.is_online() {
            debug!("offline, sync cycle skipped");
            return;
        }

        let started = Instant::now();
        tokio::join!(
            self.drain(SyncCategory::Weather),
            self.drain(SyncCategory::Preferences),
            self.drain(SyncCategory::Alert),
        );

        let timestamp = now_millis();
        *self.last_completed.write() = Some(timestamp);
        self.events.emit(SyncEvent::Completed { timestamp });
        crate::metrics::record_cycle_duration(started.elapsed());
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "background sync cycle completed"
        );
    }

    /// Spawn the task that bridges connectivity transitions into sync
    /// cycles. Each offline-to-online transition triggers exactly one cycle;
    /// rapid flapping coalesces through the watch channel. The task runs
    /// until its handle is aborted.
    pub fn watch_connectivity(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let mut rx = service.connectivity.subscribe();
        // Baseline captured before the task is spawned: a transition that
        // fires between spawn and first poll is still observed as an edge.
        let mut was_online = *rx.borrow();

        tokio::spawn(async move {
            loop {
                if rx.changed().await.is_err() {
                    break;
                }
                let online = *rx.borrow_and_update();
                if online && !was_online {
                    info!("connectivity restored, starting sync cycle");
                    service.sync_all_pending_data().await;
                } else if !online {
                    debug!("connectivity lost, automatic drains suppressed");
                }
                was_online = online;
            }
        })
    }

    /// Drain one category. Skips when offline, degraded, or already in
    /// flight for this category.
    pub async fn drain(&self, category: SyncCategory) {
        let Some(store) = self.store.as_ref() else {
            debug!(category = %category, "queue store unavailable, drain skipped");
            return;
        };
        if !self.connectivity.is_online() {
            debug!(category = %category, "offline, drain skipped");
            return;
        }

        let flag = &self.in_flight[category.index()];
        if flag.swap(true, Ordering::AcqRel) {
            debug!(category = %category, "drain already in flight, trigger coalesced");
            return;
        }

        let started = Instant::now();
        self.drain_category(store.as_ref(), category).await;
        crate::metrics::record_drain_duration(category, started.elapsed());

        flag.store(false, Ordering::Release);
    }

    async fn drain_category(&self, store: &dyn QueueStore, category: SyncCategory) {
        let entries = match store.get_all(category).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, category = %category, "failed to read queue, drain aborted");
                crate::metrics::record_store_error("get_all");
                return;
            }
        };
        if entries.is_empty() {
            return;
        }

        debug!(category = %category, pending = entries.len(), "draining queue");

        // Strictly sequential: an entry's full success/failure handling,
        // including the store mutation, completes before the next replay
        // starts. Keeps retry-count updates race-free within a category.
        for entry in entries {
            if !self.connectivity.is_online() {
                debug!(category = %category, "went offline mid-drain, remaining entries untouched");
                break;
            }
            self.process_entry(store, entry).await;
        }
    }

    async fn process_entry(&self, store: &dyn QueueStore, entry: SyncEntry) {
        match self.transport.execute(&entry).await {
            Ok(response) if response.is_ok() => {
                if let Err(e) = store.remove(entry.category, entry.id).await {
                    // At-least-once: the entry replays next cycle; remote
                    // semantics are assumed idempotent.
                    warn!(
                        error = %e,
                        category = %entry.category,
                        id = entry.id,
                        "synced entry could not be removed"
                    );
                    crate::metrics::record_store_error("remove");
                }
                if entry.category == SyncCategory::Weather {
                    self.cache.write(&entry.endpoint, response.body, now_millis());
                }
                debug!(
                    category = %entry.category,
                    id = entry.id,
                    target = ?entry.target,
                    "entry synced"
                );
                crate::metrics::record_entry_outcome(entry.category, "synced");
            }
            Ok(response) => {
                let reason = format!("status {}", response.status);
                self.note_failure(store, entry, &reason).await;
            }
            Err(e) => {
                let reason = e.to_string();
                self.note_failure(store, entry, &reason).await;
            }
        }
    }

    /// Transport and application failures count the same: bump the retry
    /// count, drop the entry once it reaches its ceiling.
    async fn note_failure(&self, store: &dyn QueueStore, mut entry: SyncEntry, reason: &str) {
        entry.retry_count += 1;

        if entry.retry_count >= entry.retry_limit {
            warn!(
                category = %entry.category,
                id = entry.id,
                target = ?entry.target,
                attempts = entry.retry_count,
                reason,
                "retry ceiling reached, dropping entry"
            );
            crate::metrics::record_dropped(entry.category);
            if let Err(e) = store.remove(entry.category, entry.id).await {
                warn!(
                    error = %e,
                    category = %entry.category,
                    id = entry.id,
                    "failed to delete exhausted entry"
                );
                crate::metrics::record_store_error("remove");
            }
        } else {
            debug!(
                category = %entry.category,
                id = entry.id,
                retry = entry.retry_count,
                limit = entry.retry_limit,
                reason,
                "sync attempt failed, entry requeued"
            );
            if let Err(e) = store.update(&entry).await {
                // Entry keeps its previous on-disk retry count and will be
                // retried next cycle.
                warn!(
                    error = %e,
                    category = %entry.category,
                    id = entry.id,
                    "failed to persist retry count"
                );
                crate::metrics::record_store_error("update");
            }
            crate::metrics::record_entry_outcome(entry.category, "requeued");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::store::memory::InMemoryQueueStore;
    use crate::transport::{SyncResponse, SyncTransport, TransportError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Outcome {
        Status(u16),
        ConnectionReset,
    }

    /// Scripted transport: per-endpoint outcome queues with a fallback once
    /// a script is exhausted.
    struct ScriptedTransport {
        scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
        fallback: Outcome,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn ok() -> Self {
            Self::with_fallback(Outcome::Status(200))
        }

        fn failing() -> Self {
            Self::with_fallback(Outcome::ConnectionReset)
        }

        fn with_fallback(fallback: Outcome) -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }

        fn script(&self, endpoint: &str, outcomes: Vec<Outcome>) {
            self.scripts
                .lock()
                .unwrap()
                .insert(endpoint.to_string(), outcomes.into());
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SyncTransport for ScriptedTransport {
        async fn execute(&self, entry: &SyncEntry) -> Result<SyncResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(&entry.endpoint)
                .and_then(|q| q.pop_front())
                .unwrap_or(self.fallback);

            match outcome {
                Outcome::Status(status) => Ok(SyncResponse {
                    status,
                    body: format!("{{\"from\": \"{}\"}}", entry.endpoint),
                }),
                Outcome::ConnectionReset => {
                    Err(TransportError::Send("connection reset".to_string()))
                }
            }
        }
    }

    fn service(transport: Arc<ScriptedTransport>) -> Arc<SyncService> {
        SyncService::new(
            SyncConfig::default(),
            Some(Arc::new(InMemoryQueueStore::new())),
            transport,
        )
    }

    #[tokio::test]
    async fn test_successful_weather_drain_removes_and_caches() {
        let transport = Arc::new(ScriptedTransport::ok());
        let svc = service(transport.clone());

        svc.queue_weather_sync("Paris", None).await;
        svc.drain(SyncCategory::Weather).await;

        assert!(svc.get_sync_stats().await.is_empty());
        let cached = svc
            .response_cache()
            .read("http://127.0.0.1:8000/api/weather/Paris/")
            .unwrap();
        assert!(!cached.is_stale);
        assert!(cached.body.contains("Paris"));
    }

    #[tokio::test]
    async fn test_non_weather_success_skips_cache() {
        let svc = service(Arc::new(ScriptedTransport::ok()));

        svc.queue_preferences_sync("user-1", json!({"theme": "dark"}))
            .await;
        svc.drain(SyncCategory::Preferences).await;

        assert!(svc.get_sync_stats().await.is_empty());
        assert!(svc.response_cache().is_empty());
    }

    #[tokio::test]
    async fn test_application_failure_increments_retry() {
        let transport = Arc::new(ScriptedTransport::with_fallback(Outcome::Status(503)));
        let svc = service(transport);

        svc.queue_alert_sync(json!({"severity": "storm"})).await;
        svc.drain(SyncCategory::Alert).await;

        let pending = svc.get_pending_sync_requests(Some(SyncCategory::Alert)).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].retry_count, 1);
    }

    #[tokio::test]
    async fn test_entry_dropped_at_retry_ceiling() {
        let svc = service(Arc::new(ScriptedTransport::failing()));

        svc.queue_weather_sync("Paris", None).await;
        for _ in 0..3 {
            svc.drain(SyncCategory::Weather).await;
        }

        assert!(svc.get_pending_sync_requests(Some(SyncCategory::Weather)).await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_entry() {
        let transport = Arc::new(ScriptedTransport::ok());
        let svc = service(transport.clone());

        svc.queue_weather_sync("Paris", None).await;
        svc.queue_weather_sync("Lyon", None).await;
        svc.queue_weather_sync("Nice", None).await;
        transport.script(
            "http://127.0.0.1:8000/api/weather/Lyon/",
            vec![Outcome::ConnectionReset],
        );

        svc.drain(SyncCategory::Weather).await;

        let pending = svc.get_pending_sync_requests(Some(SyncCategory::Weather)).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].target.as_deref(), Some("Lyon"));
        assert_eq!(pending[0].retry_count, 1);
    }

    #[tokio::test]
    async fn test_offline_drain_touches_nothing() {
        let transport = Arc::new(ScriptedTransport::ok());
        let svc = service(transport.clone());

        svc.queue_weather_sync("Paris", None).await;
        svc.set_online(false);
        svc.sync_all_pending_data().await;

        assert_eq!(transport.calls(), 0);
        let pending = svc.get_pending_sync_requests(None).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].retry_count, 0);
        assert!(svc.last_completed_at().is_none());
    }

    #[tokio::test]
    async fn test_degraded_cycle_is_noop() {
        let svc = SyncService::new(
            SyncConfig::default(),
            None,
            Arc::new(ScriptedTransport::ok()),
        );

        // Must not panic or emit.
        let mut rx = svc.subscribe();
        svc.sync_all_pending_data().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_cycle_is_coalesced() {
        struct SlowOk {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl SyncTransport for SlowOk {
            async fn execute(&self, _entry: &SyncEntry) -> Result<SyncResponse, TransportError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok(SyncResponse { status: 200, body: "{}".to_string() })
            }
        }

        let transport = Arc::new(SlowOk { calls: AtomicUsize::new(0) });
        let svc = SyncService::new(
            SyncConfig::default(),
            Some(Arc::new(InMemoryQueueStore::new())),
            transport.clone(),
        );

        svc.queue_weather_sync("Paris", None).await;

        // The second trigger lands while the first drain is awaiting the
        // network and must not double-process the entry.
        tokio::join!(svc.sync_all_pending_data(), svc.sync_all_pending_data());

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(svc.get_sync_stats().await.is_empty());
    }

    #[tokio::test]
    async fn test_cycle_emits_completion_event() {
        let svc = service(Arc::new(ScriptedTransport::ok()));
        let mut rx = svc.subscribe();

        svc.queue_weather_sync("Paris", None).await;
        svc.sync_all_pending_data().await;

        let SyncEvent::Completed { timestamp } = rx.recv().await.unwrap();
        assert!(timestamp > 0);
        assert_eq!(svc.last_completed_at(), Some(timestamp));
    }

    #[tokio::test]
    async fn test_watcher_drains_on_online_transition() {
        let transport = Arc::new(ScriptedTransport::ok());
        let svc = SyncService::new(
            SyncConfig {
                start_online: false,
                ..Default::default()
            },
            Some(Arc::new(InMemoryQueueStore::new())),
            transport.clone(),
        );

        svc.queue_weather_sync("Paris", None).await;
        let mut rx = svc.subscribe();
        let watcher = svc.watch_connectivity();

        svc.set_online(true);

        // One completion event for the transition.
        let event = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("watcher did not complete a cycle")
            .unwrap();
        assert!(matches!(event, SyncEvent::Completed { .. }));
        assert_eq!(transport.calls(), 1);

        // A repeated online report is not a transition.
        svc.set_online(true);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        watcher.abort();
    }
}
