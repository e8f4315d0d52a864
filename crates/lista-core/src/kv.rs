//! Small string key-value stores used for preferences and the local-only
//! task list.

use crate::db::DbPool;
use crate::error::CoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_string(&self, key: &str) -> Result<Option<String>, CoreError>;
    async fn set_string(&self, key: &str, value: &str) -> Result<(), CoreError>;
}

/// In-process store. Can be switched to fail every call.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "key-value store unavailable",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>, CoreError> {
        self.check()?;
        let values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        Ok(values.get(key).cloned())
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.check()?;
        let mut values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by the `preferences` table.
#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    pool: DbPool,
}

impl SqliteKeyValueStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>, CoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM preferences WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES ($1, $2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::establish_connection;

    #[tokio::test]
    async fn test_sqlite_store_overwrites() {
        let pool = establish_connection("sqlite::memory:").await.unwrap();
        let store = SqliteKeyValueStore::new(pool);

        assert_eq!(store.get_string("k").await.unwrap(), None);
        store.set_string("k", "one").await.unwrap();
        store.set_string("k", "two").await.unwrap();
        assert_eq!(store.get_string("k").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_memory_store_failure_switch() {
        let store = MemoryKeyValueStore::new();
        store.set_string("k", "v").await.unwrap();
        store.set_failing(true);
        assert!(store.get_string("k").await.is_err());
        store.set_failing(false);
        assert_eq!(store.get_string("k").await.unwrap().as_deref(), Some("v"));
    }
}
