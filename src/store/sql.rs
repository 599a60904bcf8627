// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQLite queue store.
//!
//! Three independent tables, one per [`SyncCategory`], each with an
//! auto-increment primary key and secondary indexes for inspection:
//!
//! ```sql
//! CREATE TABLE weather_sync (
//!   id INTEGER PRIMARY KEY AUTOINCREMENT,
//!   target TEXT,              -- city (weather) / user id (preferences)
//!   endpoint TEXT NOT NULL,
//!   method TEXT NOT NULL,     -- GET/POST/PUT/DELETE
//!   payload TEXT,             -- JSON body, NULL for reads
//!   enqueued_at INTEGER NOT NULL,
//!   retry_count INTEGER NOT NULL DEFAULT 0,
//!   retry_limit INTEGER NOT NULL DEFAULT 3
//! )
//! ```
//!
//! The schema is versioned through `PRAGMA user_version`. Opening a database
//! written by an older build applies the missing tables and indexes in place
//! without discarding queued entries.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::info;

use super::traits::{QueueStore, StoreError};
use crate::entry::{HttpMethod, SyncCategory, SyncEntry};
use crate::retry::{retry, RetryConfig};

/// Bump when tables or indexes are added. `migrate()` must stay idempotent.
const SCHEMA_VERSION: i64 = 1;

pub struct SqliteQueueStore {
    pool: SqlitePool,
}

impl SqliteQueueStore {
    /// Open (or create) the queue database at `path` and bring the schema up
    /// to the current version.
    ///
    /// Any failure here maps to [`StoreError::Unavailable`]; the service
    /// treats that as "sync queueing disabled" rather than an error to
    /// propagate.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let url = format!("sqlite://{}?mode=rwc", path_str);

        let pool = retry("queue_store_connect", &RetryConfig::startup(), || async {
            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&url)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))
        })
        .await?;

        let store = Self { pool };
        store.enable_wal_mode().await?;
        store.migrate().await?;

        info!(path = %path_str, "queue store opened");
        Ok(store)
    }

    /// WAL journal mode: readers don't block the drain's writes, and single
    /// fsync per commit keeps enqueue latency predictable.
    async fn enable_wal_mode(&self) -> Result<(), StoreError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to enable WAL mode: {}", e)))?;

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to set synchronous mode: {}", e)))?;

        Ok(())
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        let on_disk: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if on_disk >= SCHEMA_VERSION {
            return Ok(());
        }

        for category in SyncCategory::ALL {
            let table = category.table();

            let create = format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    target TEXT,
                    endpoint TEXT NOT NULL,
                    method TEXT NOT NULL,
                    payload TEXT,
                    enqueued_at INTEGER NOT NULL,
                    retry_count INTEGER NOT NULL DEFAULT 0,
                    retry_limit INTEGER NOT NULL DEFAULT 3
                )
                "#
            );
            sqlx::query(&create)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            let by_time = format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_enqueued_at ON {table}(enqueued_at)"
            );
            sqlx::query(&by_time)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            // Category-specific inspection index: city for weather, user for
            // preferences. Alerts have no secondary subject.
            let by_target = match category {
                SyncCategory::Weather => {
                    Some("CREATE INDEX IF NOT EXISTS idx_weather_sync_city ON weather_sync(target)")
                }
                SyncCategory::Preferences => Some(
                    "CREATE INDEX IF NOT EXISTS idx_preferences_sync_user ON preferences_sync(target)",
                ),
                SyncCategory::Alert => None,
            };
            if let Some(sql) = by_target {
                sqlx::query(sql)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            }
        }

        sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        info!(from = on_disk, to = SCHEMA_VERSION, "queue schema created/upgraded");
        Ok(())
    }

    fn entry_from_row(category: SyncCategory, row: &SqliteRow) -> Result<SyncEntry, StoreError> {
        let method_raw: String = row.try_get("method").map_err(backend)?;
        let method = HttpMethod::parse(&method_raw).ok_or_else(|| {
            StoreError::Backend(format!(
                "unknown method '{}' in {} row",
                method_raw,
                category.table()
            ))
        })?;

        let payload_raw: Option<String> = row.try_get("payload").map_err(backend)?;
        let payload = match payload_raw {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
                StoreError::Backend(format!("corrupt payload in {} row: {}", category.table(), e))
            })?),
            None => None,
        };

        Ok(SyncEntry {
            id: row.try_get("id").map_err(backend)?,
            category,
            target: row.try_get("target").map_err(backend)?,
            endpoint: row.try_get("endpoint").map_err(backend)?,
            method,
            payload,
            enqueued_at: row.try_get("enqueued_at").map_err(backend)?,
            retry_count: row.try_get::<i64, _>("retry_count").map_err(backend)? as u32,
            retry_limit: row.try_get::<i64, _>("retry_limit").map_err(backend)? as u32,
        })
    }
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn add(&self, entry: &SyncEntry) -> Result<SyncEntry, StoreError> {
        let payload = entry.payload.as_ref().map(|p| p.to_string());
        let sql = format!(
            "INSERT INTO {} (target, endpoint, method, payload, enqueued_at, retry_count, retry_limit) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            entry.category.table()
        );

        let result = sqlx::query(&sql)
            .bind(entry.target.as_deref())
            .bind(&entry.endpoint)
            .bind(entry.method.as_str())
            .bind(payload)
            .bind(entry.enqueued_at)
            .bind(entry.retry_count as i64)
            .bind(entry.retry_limit as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;

        let mut persisted = entry.clone();
        persisted.id = result.last_insert_rowid();
        Ok(persisted)
    }

    async fn get_all(&self, category: SyncCategory) -> Result<Vec<SyncEntry>, StoreError> {
        let sql = format!(
            "SELECT id, target, endpoint, method, payload, enqueued_at, retry_count, retry_limit \
             FROM {} ORDER BY enqueued_at ASC, id ASC",
            category.table()
        );

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.iter()
            .map(|row| Self::entry_from_row(category, row))
            .collect()
    }

    async fn update(&self, entry: &SyncEntry) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE {} SET retry_count = ?1 WHERE id = ?2",
            entry.category.table()
        );

        sqlx::query(&sql)
            .bind(entry.retry_count as i64)
            .bind(entry.id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, category: SyncCategory, id: i64) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", category.table());

        sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }

    async fn count(&self, category: SyncCategory) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", category.table());

        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        Ok(count as u64)
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        for category in SyncCategory::ALL {
            let sql = format!("DELETE FROM {}", category.table());
            sqlx::query(&sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Write(e.to_string()))?;
        }
        Ok(())
    }
}
