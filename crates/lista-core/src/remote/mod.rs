//! Remote tree clients.
//!
//! A remote tree is a hosted, hierarchical key-value database: records live
//! at `<collection>/<key>` and clients subscribe to a collection to receive
//! its full contents every time any child changes.

use crate::error::CoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryTree;
pub use sqlite::SqliteTree;

/// Full contents of a collection, children ordered by key. `None` when the
/// collection is empty or absent.
pub type Snapshot = Option<Map<String, Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A notification delivered to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    Snapshot(Snapshot),
    /// The subscription failed or the connection dropped.
    Error(String),
}

/// A live subscription. Events stop once it is unsubscribed.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub events: mpsc::UnboundedReceiver<TreeEvent>,
}

/// Client for a remote tree database.
#[async_trait]
pub trait RemoteTree: Send + Sync + 'static {
    /// Subscribes to `path`. The current snapshot is delivered right away.
    async fn subscribe(&self, path: &str) -> Result<Subscription, CoreError>;
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), CoreError>;
    /// Generates a new, time-ordered child key under `path` without writing.
    async fn push(&self, path: &str) -> Result<String, CoreError>;
    /// Replaces the record at `path`. Writing `null` removes it.
    async fn set(&self, path: &str, value: Value) -> Result<(), CoreError>;
    /// Merges `fields` into the record at `path`, creating it if needed.
    /// A `null` field deletes that field.
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), CoreError>;
    async fn remove(&self, path: &str) -> Result<(), CoreError>;
}

pub fn child_path(collection: &str, key: &str) -> String {
    format!("{}/{}", collection.trim_end_matches('/'), key)
}

/// Splits a record path into `(collection, key)`.
pub fn split_path(path: &str) -> Result<(&str, &str), CoreError> {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some((collection, key)) if !collection.is_empty() && !key.is_empty() => {
            Ok((collection, key))
        }
        _ => Err(CoreError::InvalidInput(format!(
            "'{}' is not a record path (expected <collection>/<key>)",
            path
        ))),
    }
}

/// Generates a push key. UUIDv7 keys sort by creation time.
pub fn generate_key() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

/// Merges `fields` into `record`, tree style: `null` deletes a field.
pub(crate) fn merge_fields(record: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (name, value) in fields {
        if value.is_null() {
            record.remove(&name);
        } else {
            record.insert(name, value);
        }
    }
}

/// Subscriber registry shared by the tree backends.
#[derive(Debug, Default)]
pub(crate) struct Listeners {
    next_id: AtomicU64,
    inner: Mutex<HashMap<SubscriptionId, Listener>>,
}

#[derive(Debug)]
struct Listener {
    collection: String,
    sender: mpsc::UnboundedSender<TreeEvent>,
}

impl Listeners {
    pub(crate) fn register(&self, collection: &str, initial: TreeEvent) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, events) = mpsc::unbounded_channel();
        // The receiver is alive, so this cannot fail
        let _ = sender.send(initial);
        self.lock().insert(
            id,
            Listener {
                collection: collection.trim_end_matches('/').to_string(),
                sender,
            },
        );
        tracing::debug!(?id, collection, "subscribed");
        Subscription { id, events }
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        tracing::debug!(?id, removed, "unsubscribed");
        removed
    }

    /// Sends `event` to every subscriber of `collection`, dropping listeners
    /// whose receiving end is gone.
    pub(crate) fn notify(&self, collection: &str, event: &TreeEvent) {
        self.lock().retain(|_, listener| {
            if listener.collection != collection {
                return true;
            }
            listener.sender.send(event.clone()).is_ok()
        });
    }

    pub(crate) fn notify_all(&self, event: &TreeEvent) {
        self.lock()
            .retain(|_, listener| listener.sender.send(event.clone()).is_ok());
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SubscriptionId, Listener>> {
        // A panic while holding the lock leaves the map itself consistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
