use crate::enrich::enrich;
use crate::error::StoreError;
use crate::models::{ClassifiedRecord, EnrichedRecord, RawMessageRecord};
use crate::normalize::{parse_classified, parse_raw};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::broadcast;
use tracing::debug;

pub const CLASSIFIED_KEY: &str = "gmail_classified_emails";
pub const RAW_KEY: &str = "gmail_raw_messages";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Put(String),
    Removed(String),
    Cleared,
}

/// One value per logical dataset, overwritten wholesale. Change
/// notifications are advisory: a receiver that lags or never subscribed
/// simply misses them and should re-read.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    changes: broadcast::Sender<StoreChange>,
}

impl Store {
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        Self::connect(options).await
    }

    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect_with(options).await?;
        let (changes, _) = broadcast::channel(16);
        Ok(Self { pool, changes })
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        let schema = include_str!("../schema.sql");
        sqlx::query(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    fn notify(&self, change: StoreChange) {
        // No subscribers is not an error.
        let _ = self.changes.send(change);
    }

    pub async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        self.notify(StoreChange::Put(key.to_string()));
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get(0)))
    }

    pub async fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row = sqlx::query("SELECT updated_at FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|r| DateTime::from_timestamp_millis(r.get(0))))
    }

    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        self.notify(StoreChange::Removed(key.to_string()));
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv").execute(&self.pool).await?;
        self.notify(StoreChange::Cleared);
        Ok(())
    }

    pub async fn save_classified(&self, records: &[ClassifiedRecord]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(records)?;
        self.put(CLASSIFIED_KEY, &encoded).await
    }

    pub async fn save_raw(&self, records: &[RawMessageRecord]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(records)?;
        self.put(RAW_KEY, &encoded).await
    }

    /// Missing or unreadable values read as an empty dataset.
    pub async fn load_classified(&self) -> Result<Vec<ClassifiedRecord>, StoreError> {
        Ok(self
            .get(CLASSIFIED_KEY)
            .await?
            .map(|value| parse_classified(value.as_bytes()))
            .unwrap_or_default())
    }

    pub async fn load_raw(&self) -> Result<Vec<RawMessageRecord>, StoreError> {
        Ok(self
            .get(RAW_KEY)
            .await?
            .map(|value| parse_raw(value.as_bytes()))
            .unwrap_or_default())
    }
}

/// Rebuild the enriched set from whatever the last refresh persisted.
pub async fn load_working_set(
    store: &Store,
    now: DateTime<Utc>,
) -> Result<Vec<EnrichedRecord>, StoreError> {
    let classified = store.load_classified().await?;
    let raw = store.load_raw().await?;
    debug!(classified = classified.len(), raw = raw.len(), "loaded stored datasets");
    Ok(enrich(&classified, &raw, now))
}
