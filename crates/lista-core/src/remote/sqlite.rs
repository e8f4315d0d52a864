use super::{generate_key, merge_fields, split_path, Listeners, Snapshot, Subscription, SubscriptionId, TreeEvent};
use crate::db::DbPool;
use crate::error::CoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{Sqlite, Transaction};

/// A remote tree persisted in the `tree_nodes` table.
///
/// Subscribers are notified in-process after each committed write.
pub struct SqliteTree {
    pool: DbPool,
    listeners: Listeners,
}

impl SqliteTree {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            listeners: Listeners::default(),
        }
    }

    /// Get a reference to the database pool for internal use
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn read_snapshot(&self, collection: &str) -> Result<Snapshot, CoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM tree_nodes WHERE collection = $1 ORDER BY key",
        )
        .bind(collection)
        .fetch_all(self.pool())
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }
        let mut children = Map::new();
        for (key, value) in rows {
            children.insert(key, serde_json::from_str(&value)?);
        }
        Ok(Some(children))
    }

    async fn read_record(
        tx: &mut Transaction<'_, Sqlite>,
        collection: &str,
        key: &str,
    ) -> Result<Option<Value>, CoreError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM tree_nodes WHERE collection = $1 AND key = $2",
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(|(v,)| serde_json::from_str(&v)).transpose()?)
    }

    async fn write_record(
        tx: &mut Transaction<'_, Sqlite>,
        collection: &str,
        key: &str,
        value: &Value,
    ) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO tree_nodes (collection, key, value) VALUES ($1, $2, $3)
             ON CONFLICT(collection, key) DO UPDATE SET value = excluded.value",
        )
        .bind(collection)
        .bind(key)
        .bind(serde_json::to_string(value)?)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn delete_record(
        tx: &mut Transaction<'_, Sqlite>,
        collection: &str,
        key: &str,
    ) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM tree_nodes WHERE collection = $1 AND key = $2")
            .bind(collection)
            .bind(key)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Sends the collection's fresh snapshot to its subscribers.
    async fn publish(&self, collection: &str) {
        let event = match self.read_snapshot(collection).await {
            Ok(snapshot) => TreeEvent::Snapshot(snapshot),
            Err(e) => {
                tracing::warn!(collection, error = %e, "failed to read snapshot after write");
                TreeEvent::Error(e.to_string())
            }
        };
        self.listeners.notify(collection, &event);
    }
}

#[async_trait]
impl super::RemoteTree for SqliteTree {
    async fn subscribe(&self, path: &str) -> Result<Subscription, CoreError> {
        let collection = path.trim_end_matches('/');
        let snapshot = self.read_snapshot(collection).await?;
        Ok(self.listeners.register(collection, TreeEvent::Snapshot(snapshot)))
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), CoreError> {
        self.listeners.remove(id);
        Ok(())
    }

    async fn push(&self, _path: &str) -> Result<String, CoreError> {
        Ok(generate_key())
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), CoreError> {
        let (collection, key) = split_path(path)?;
        let mut tx = self.pool().begin().await?;
        if value.is_null() {
            Self::delete_record(&mut tx, collection, key).await?;
        } else {
            Self::write_record(&mut tx, collection, key, &value).await?;
        }
        tx.commit().await?;

        self.publish(collection).await;
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), CoreError> {
        let (collection, key) = split_path(path)?;
        let mut tx = self.pool().begin().await?;

        let mut record = match Self::read_record(&mut tx, collection, key).await? {
            Some(Value::Object(existing)) => existing,
            _ => Map::new(),
        };
        merge_fields(&mut record, fields);

        if record.is_empty() {
            Self::delete_record(&mut tx, collection, key).await?;
        } else {
            Self::write_record(&mut tx, collection, key, &Value::Object(record)).await?;
        }
        tx.commit().await?;

        self.publish(collection).await;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), CoreError> {
        let (collection, key) = split_path(path)?;
        let mut tx = self.pool().begin().await?;
        Self::delete_record(&mut tx, collection, key).await?;
        tx.commit().await?;

        self.publish(collection).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::establish_connection;
    use crate::remote::RemoteTree;
    use serde_json::json;

    async fn setup() -> SqliteTree {
        let pool = establish_connection("sqlite::memory:").await.unwrap();
        SqliteTree::new(pool)
    }

    #[tokio::test]
    async fn test_set_and_subscribe() {
        let tree = setup().await;
        tree.set("tasks/b", json!({ "titulo": "B" })).await.unwrap();
        tree.set("tasks/a", json!({ "titulo": "A" })).await.unwrap();

        let mut sub = tree.subscribe("tasks").await.unwrap();
        let Some(TreeEvent::Snapshot(Some(children))) = sub.events.recv().await else {
            panic!("Expected a non-empty snapshot");
        };
        let keys: Vec<&String> = children.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let tree = setup().await;
        tree.set("tasks/a", json!({ "titulo": "A", "concluida": false })).await.unwrap();

        let mut sub = tree.subscribe("tasks").await.unwrap();
        sub.events.recv().await.unwrap();

        let fields = json!({ "concluida": true }).as_object().cloned().unwrap();
        tree.update("tasks/a", fields).await.unwrap();

        let event = sub.events.recv().await.unwrap();
        let expected = json!({ "a": { "titulo": "A", "concluida": true } });
        assert_eq!(event, TreeEvent::Snapshot(expected.as_object().cloned()));
    }

    #[tokio::test]
    async fn test_remove_last_record_yields_empty_snapshot() {
        let tree = setup().await;
        tree.set("tasks/a", json!({ "titulo": "A" })).await.unwrap();
        let mut sub = tree.subscribe("tasks").await.unwrap();
        sub.events.recv().await.unwrap();

        tree.remove("tasks/a").await.unwrap();
        assert_eq!(sub.events.recv().await.unwrap(), TreeEvent::Snapshot(None));
    }

    #[tokio::test]
    async fn test_invalid_path_is_rejected() {
        let tree = setup().await;
        let result = tree.set("tasks", json!({ "titulo": "A" })).await;
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }
}
