//! Connectivity monitor.
//!
//! Bridges the host platform's online/offline signal into the engine. The
//! host calls [`ConnectivityMonitor::set_online`] whenever its own signal
//! fires; the service's watcher task reacts to offline-to-online transitions
//! and the drain consults [`ConnectivityMonitor::is_online`] as a fast-fail
//! guard before every network attempt.

use tokio::sync::watch;

pub struct ConnectivityMonitor {
    online: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (online, _) = watch::channel(initially_online);
        Self { online }
    }

    /// Current connectivity state, as a pure read.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Record a connectivity change. Returns whether the value actually
    /// changed; repeated reports of the same state are not transitions and
    /// wake no watchers.
    pub fn set_online(&self, online: bool) -> bool {
        self.online.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        })
    }

    /// Subscribe to state changes. Rapid flapping coalesces: a receiver only
    /// ever observes the latest value.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }
}
