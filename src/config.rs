//! Configuration for the sync service.
//!
//! # Example
//!
//! ```
//! use weather_sync::SyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SyncConfig::default();
//! assert_eq!(config.retry_limit, 3);
//!
//! // Full config
//! let config = SyncConfig {
//!     db_path: Some("./weather_sync.db".into()),
//!     api_base: "https://api.weather.example".into(),
//!     max_pending_per_category: 1024,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

/// Configuration for the sync service.
///
/// All fields have sensible defaults. At minimum, production hosts should
/// configure `db_path` and `api_base`.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Queue database path. Falls back to `./weather_sync.db`.
    #[serde(default)]
    pub db_path: Option<String>,

    /// Base URL the queued endpoints are resolved against.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Attempts before an entry is permanently dropped.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Response-cache freshness window, in seconds.
    #[serde(default = "default_freshness_window_secs")]
    pub freshness_window_secs: u64,

    /// Per-category pending ceiling; enqueues past it are rejected.
    #[serde(default = "default_max_pending_per_category")]
    pub max_pending_per_category: u64,

    /// Buffered completion events per subscriber.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Connectivity state assumed at startup, before the host's first
    /// signal arrives.
    #[serde(default = "default_start_online")]
    pub start_online: bool,
}

fn default_api_base() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_retry_limit() -> u32 {
    3
}
fn default_freshness_window_secs() -> u64 {
    10 * 60
}
fn default_max_pending_per_category() -> u64 {
    512
}
fn default_event_capacity() -> usize {
    16
}
fn default_start_online() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            api_base: default_api_base(),
            retry_limit: default_retry_limit(),
            freshness_window_secs: default_freshness_window_secs(),
            max_pending_per_category: default_max_pending_per_category(),
            event_capacity: default_event_capacity(),
            start_online: default_start_online(),
        }
    }
}
