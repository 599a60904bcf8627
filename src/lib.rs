//! # Weather Sync
//!
//! An offline background-synchronization engine for the weather client:
//! mutating operations (weather fetch requests, user-preference updates,
//! alert subscriptions) are queued durably while the client is disconnected
//! and reconciled with the backend API once connectivity returns.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Enqueue Layer                          │
//! │  • queue_weather_sync / queue_preferences_sync /            │
//! │    queue_alert_sync persist entries per category            │
//! │  • Bounded per-category queues                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Durable Queue Store (SQLite)               │
//! │  • One table per category, versioned schema                 │
//! │  • Survives process restarts                                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!            (online transition, timer, or manual trigger)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Sync Coordinator                        │
//! │  • Drains each category oldest-first, sequentially          │
//! │  • Retry-then-drop policy, bounded attempts                 │
//! │  • Per-category in-flight flags coalesce redundant triggers │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                        │
//!                    ▼                        ▼
//! ┌──────────────────────────────┐ ┌──────────────────────────────┐
//! │     Response Cache Bridge    │ │  Stats & Notification Emitter│
//! │  • Weather replays write     │ │  • Pending counts per        │
//! │    through, stamped for      │ │    category                  │
//! │    staleness checks          │ │  • Completion event per      │
//! │                              │ │    drain cycle               │
//! └──────────────────────────────┘ └──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use weather_sync::{SyncConfig, SyncService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = SyncService::start(SyncConfig::default()).await;
//!
//!     // Queue work while offline; entries survive restarts.
//!     service.set_online(false);
//!     service.queue_weather_sync("Paris", None).await;
//!     service.queue_preferences_sync("user-1", json!({"units": "metric"})).await;
//!
//!     // Bridge the platform's online signal; the watcher drains on
//!     // recovery and broadcasts a completion event per cycle.
//!     let mut events = service.subscribe();
//!     let _watcher = service.watch_connectivity();
//!     service.set_online(true);
//!
//!     if let Ok(event) = events.recv().await {
//!         println!("synced: {:?}", event);
//!     }
//! }
//! ```
//!
//! ## Guarantees
//!
//! - **At-least-once delivery**: entries persist until a replay succeeds or
//!   the retry ceiling is reached; consumers must tolerate duplicates.
//! - **Ordering**: within a category, entries replay oldest-first and
//!   strictly sequentially. Categories are independent.
//! - **Failure isolation**: one entry's failure never aborts the rest of a
//!   drain; a store that cannot be opened degrades the service to
//!   "queueing disabled" instead of crashing the host.
//!
//! ## Modules
//!
//! - [`coordinator`]: the main [`SyncService`] orchestrating all components
//! - [`store`]: durable queue backends (SQLite, in-memory)
//! - [`entry`]: the [`SyncEntry`] envelope and category model
//! - [`connectivity`]: online/offline monitor
//! - [`transport`]: replay transport seam and the reqwest implementation
//! - [`cache`]: response cache bridge with staleness evaluation
//! - [`stats`]: pending counts and completion events
//! - [`retry`]: bounded backoff for opening the store

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod entry;
pub mod metrics;
pub mod retry;
pub mod stats;
pub mod store;
pub mod transport;

pub use cache::{CachedResponse, ResponseCache, DEFAULT_FRESHNESS_WINDOW};
pub use config::SyncConfig;
pub use connectivity::ConnectivityMonitor;
pub use coordinator::SyncService;
pub use entry::{HttpMethod, SyncCategory, SyncEntry, DEFAULT_RETRY_LIMIT};
pub use retry::RetryConfig;
pub use stats::{SyncEvent, SyncStats};
pub use store::{InMemoryQueueStore, QueueStore, SqliteQueueStore, StoreError};
pub use transport::{HttpTransport, SyncResponse, SyncTransport, TransportError};
