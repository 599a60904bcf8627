//! Durable queue storage: the trait seam plus the SQLite and in-memory
//! backends.

pub mod memory;
pub mod sql;
pub mod traits;

pub use memory::InMemoryQueueStore;
pub use sql::SqliteQueueStore;
pub use traits::{QueueStore, StoreError};
