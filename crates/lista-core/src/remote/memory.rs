use super::{generate_key, merge_fields, split_path, Listeners, Snapshot, Subscription, SubscriptionId, TreeEvent};
use crate::error::CoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

type Collection = BTreeMap<String, Value>;

/// An in-process remote tree.
///
/// Besides serving as a real backend for a single process, it can be taken
/// offline, disconnected, or made to deliver arbitrary snapshots.
#[derive(Debug, Default)]
pub struct MemoryTree {
    collections: Mutex<HashMap<String, Collection>>,
    listeners: Listeners,
    offline: AtomicBool,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with [`CoreError::Remote`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delivers a connection error to every subscriber.
    pub fn disconnect(&self, message: &str) {
        self.listeners.notify_all(&TreeEvent::Error(message.to_string()));
    }

    /// Delivers `snapshot` to the subscribers of `path` without touching
    /// the stored data.
    pub fn inject(&self, path: &str, snapshot: Snapshot) {
        self.listeners
            .notify(path.trim_end_matches('/'), &TreeEvent::Snapshot(snapshot));
    }

    /// Current contents of a collection.
    pub fn snapshot(&self, path: &str) -> Snapshot {
        snapshot_of(self.lock().get(path.trim_end_matches('/')))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn ensure_online(&self) -> Result<(), CoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CoreError::Remote("client is offline".to_string()));
        }
        Ok(())
    }

    /// Applies `change` to a collection and notifies its subscribers while
    /// still holding the lock, so notifications follow write order.
    fn mutate<F>(&self, path: &str, change: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut Collection, &str),
    {
        self.ensure_online()?;
        let (collection, key) = split_path(path)?;
        let mut collections = self.lock();
        let children = collections.entry(collection.to_string()).or_default();
        change(children, key);
        let event = TreeEvent::Snapshot(snapshot_of(Some(children)));
        if children.is_empty() {
            collections.remove(collection);
        }
        self.listeners.notify(collection, &event);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Collection>> {
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn snapshot_of(children: Option<&Collection>) -> Snapshot {
    match children {
        Some(children) if !children.is_empty() => Some(
            children
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        _ => None,
    }
}

#[async_trait]
impl super::RemoteTree for MemoryTree {
    async fn subscribe(&self, path: &str) -> Result<Subscription, CoreError> {
        self.ensure_online()?;
        let collection = path.trim_end_matches('/');
        let collections = self.lock();
        let initial = TreeEvent::Snapshot(snapshot_of(collections.get(collection)));
        Ok(self.listeners.register(collection, initial))
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), CoreError> {
        self.listeners.remove(id);
        Ok(())
    }

    async fn push(&self, _path: &str) -> Result<String, CoreError> {
        self.ensure_online()?;
        Ok(generate_key())
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), CoreError> {
        self.mutate(path, |children, key| {
            if value.is_null() {
                children.remove(key);
            } else {
                children.insert(key.to_string(), value);
            }
        })
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), CoreError> {
        self.mutate(path, |children, key| {
            let record = children
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !record.is_object() {
                *record = Value::Object(Map::new());
            }
            if let Value::Object(existing) = record {
                merge_fields(existing, fields);
                if existing.is_empty() {
                    children.remove(key);
                }
            }
        })
    }

    async fn remove(&self, path: &str) -> Result<(), CoreError> {
        self.mutate(path, |children, key| {
            children.remove(key);
        })
    }
}
