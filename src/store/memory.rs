//! In-memory queue store.
//!
//! Same contract as the SQLite store, backed by per-category dashmaps.
//! Used by tests and by hosts without persistent storage that still want
//! session-scoped queueing.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::traits::{QueueStore, StoreError};
use crate::entry::{SyncCategory, SyncEntry};

pub struct InMemoryQueueStore {
    tables: [DashMap<i64, SyncEntry>; 3],
    next_id: [AtomicI64; 3],
}

impl InMemoryQueueStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: [DashMap::new(), DashMap::new(), DashMap::new()],
            next_id: [AtomicI64::new(1), AtomicI64::new(1), AtomicI64::new(1)],
        }
    }

    fn table(&self, category: SyncCategory) -> &DashMap<i64, SyncEntry> {
        &self.tables[category.index()]
    }
}

impl Default for InMemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn add(&self, entry: &SyncEntry) -> Result<SyncEntry, StoreError> {
        let id = self.next_id[entry.category.index()].fetch_add(1, Ordering::Relaxed);
        let mut persisted = entry.clone();
        persisted.id = id;
        self.table(entry.category).insert(id, persisted.clone());
        Ok(persisted)
    }

    async fn get_all(&self, category: SyncCategory) -> Result<Vec<SyncEntry>, StoreError> {
        let mut entries: Vec<SyncEntry> = self
            .table(category)
            .iter()
            .map(|r| r.value().clone())
            .collect();
        entries.sort_by_key(|e| (e.enqueued_at, e.id));
        Ok(entries)
    }

    async fn update(&self, entry: &SyncEntry) -> Result<(), StoreError> {
        self.table(entry.category).insert(entry.id, entry.clone());
        Ok(())
    }

    async fn remove(&self, category: SyncCategory, id: i64) -> Result<(), StoreError> {
        self.table(category).remove(&id);
        Ok(())
    }

    async fn count(&self, category: SyncCategory) -> Result<u64, StoreError> {
        Ok(self.table(category).len() as u64)
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        for table in &self.tables {
            table.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::HttpMethod;

    fn entry(category: SyncCategory, enqueued_at: i64) -> SyncEntry {
        let mut e = SyncEntry::new(
            category,
            None,
            "/api/alerts/".to_string(),
            HttpMethod::Post,
            None,
        );
        e.enqueued_at = enqueued_at;
        e
    }

    #[tokio::test]
    async fn test_add_assigns_ids_per_category() {
        let store = InMemoryQueueStore::new();

        let a = store.add(&entry(SyncCategory::Weather, 1)).await.unwrap();
        let b = store.add(&entry(SyncCategory::Weather, 2)).await.unwrap();
        let c = store.add(&entry(SyncCategory::Alert, 3)).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        // Ids restart per category; identity is (category, id).
        assert_eq!(c.id, 1);
    }

    #[tokio::test]
    async fn test_get_all_sorted_by_enqueued_at() {
        let store = InMemoryQueueStore::new();

        store.add(&entry(SyncCategory::Weather, 30)).await.unwrap();
        store.add(&entry(SyncCategory::Weather, 10)).await.unwrap();
        store.add(&entry(SyncCategory::Weather, 20)).await.unwrap();

        let all = store.get_all(SyncCategory::Weather).await.unwrap();
        let times: Vec<_> = all.iter().map(|e| e.enqueued_at).collect();
        assert_eq!(times, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_remove_and_count() {
        let store = InMemoryQueueStore::new();

        let a = store.add(&entry(SyncCategory::Preferences, 1)).await.unwrap();
        store.add(&entry(SyncCategory::Preferences, 2)).await.unwrap();
        assert_eq!(store.count(SyncCategory::Preferences).await.unwrap(), 2);

        store.remove(SyncCategory::Preferences, a.id).await.unwrap();
        store.remove(SyncCategory::Preferences, a.id).await.unwrap();
        assert_eq!(store.count(SyncCategory::Preferences).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = InMemoryQueueStore::new();

        for category in SyncCategory::ALL {
            store.add(&entry(category, 1)).await.unwrap();
        }
        store.clear_all().await.unwrap();

        for category in SyncCategory::ALL {
            assert_eq!(store.count(category).await.unwrap(), 0);
        }
    }
}
