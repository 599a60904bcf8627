use async_trait::async_trait;
use thiserror::Error;

use crate::entry::{SyncCategory, SyncEntry};

#[derive(Error, Debug)]
pub enum StoreError {
    /// The durable store could not be opened at all. The service tolerates
    /// this by degrading to "sync queueing disabled".
    #[error("persistent storage unavailable: {0}")]
    Unavailable(String),
    /// A single mutation (add/update/remove) failed.
    #[error("queue write failed: {0}")]
    Write(String),
    /// A read or other backend operation failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Transactional CRUD over the three per-category queue tables.
///
/// Adds come from external callers; updates and removes are the drain
/// coordinator's alone. Each call is atomic on its own, which is the only
/// locking the engine relies on.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Insert a new entry, assign its id, and return the persisted entry.
    async fn add(&self, entry: &SyncEntry) -> Result<SyncEntry, StoreError>;

    /// All entries for a category, ordered by `enqueued_at` ascending.
    /// An empty table yields an empty vec, never an error.
    async fn get_all(&self, category: SyncCategory) -> Result<Vec<SyncEntry>, StoreError>;

    /// Replace an entry in place. Used solely to persist a bumped
    /// `retry_count`.
    async fn update(&self, entry: &SyncEntry) -> Result<(), StoreError>;

    /// Delete by id. Removing an already-absent id is not an error.
    async fn remove(&self, category: SyncCategory, id: i64) -> Result<(), StoreError>;

    /// Cardinality of a category's table, without loading entry bodies.
    async fn count(&self, category: SyncCategory) -> Result<u64, StoreError>;

    /// Wipe every table. Administrative and test use only.
    async fn clear_all(&self) -> Result<(), StoreError>;
}
