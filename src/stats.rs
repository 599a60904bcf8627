//! Pending-count stats and the sync-lifecycle event emitter.
//!
//! UI collaborators poll [`SyncStats`] for badge counts and subscribe to
//! [`SyncEvent`]s to refresh their views after a drain cycle. Events carry
//! no per-entry detail.

use serde::Serialize;
use tokio::sync::broadcast;

/// Pending-entry counts per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub weather: u64,
    pub preferences: u64,
    pub alerts: u64,
    pub total: u64,
}

impl SyncStats {
    pub(crate) fn new(weather: u64, preferences: u64, alerts: u64) -> Self {
        Self {
            weather,
            preferences,
            alerts,
            total: weather + preferences + alerts,
        }
    }

    pub(crate) fn empty() -> Self {
        Self::new(0, 0, 0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Sync-lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// A full multi-category drain cycle finished (success or partial
    /// failure alike).
    Completed { timestamp: i64 },
}

/// Typed event emitter owned by the service. Replaces platform event
/// dispatch so the core has no dependency on a host event bus.
pub(crate) struct EventEmitter {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventEmitter {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Broadcast to whoever is listening. No listeners is not an error.
    pub(crate) fn emit(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }
}
