//! The task synchronization store.
//!
//! Keeps an in-memory copy of every task under one remote tree path. The
//! copy is replaced wholesale by each snapshot the subscription delivers;
//! writes go straight to the remote tree and show up locally only through
//! the next snapshot.

use crate::board::TaskBoard;
use crate::error::CoreError;
use crate::models::{tasks_from_snapshot, CategoryFilter, NewTaskData, Task, UpdateTaskData};
use crate::preferences::PreferenceCache;
use crate::remote::{child_path, RemoteTree, Subscription, SubscriptionId, TreeEvent};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const LOAD_ERROR: &str = "failed to load tasks";
const CONNECT_ERROR: &str = "failed to connect to database";

/// Observable state of a [`TaskStore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    /// Every synchronized task, in snapshot order.
    pub tasks: Vec<Task>,
    pub filter: CategoryFilter,
    pub error: Option<String>,
    /// Set once the first snapshot, or a subscription failure, has arrived.
    pub synced: bool,
    /// Set once any snapshot has been applied.
    pub loaded: bool,
    /// Bumped on every applied notification.
    pub revision: u64,
    pending_writes: usize,
}

impl StoreState {
    fn new(filter: CategoryFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn loading(&self) -> bool {
        !self.synced || self.pending_writes > 0
    }

    pub fn visible_tasks(&self) -> Vec<Task> {
        self.filter.apply(&self.tasks)
    }

    fn apply(&mut self, event: TreeEvent) {
        match event {
            TreeEvent::Snapshot(snapshot) => {
                let decoded = tasks_from_snapshot(snapshot.as_ref());
                self.tasks = decoded.tasks;
                self.loaded = true;
                self.error = if decoded.rejected.is_empty() {
                    None
                } else {
                    Some(format!("{}: unreadable records {}", LOAD_ERROR, decoded.rejected.join(", ")))
                };
            }
            TreeEvent::Error(message) => {
                tracing::warn!(%message, "subscription failed");
                self.error = Some(format!("{}: {}", CONNECT_ERROR, message));
            }
        }
        self.synced = true;
        self.revision += 1;
    }
}

/// A live, filterable view of the tasks stored under one remote path.
///
/// Open it with [`TaskStore::open`] when a view mounts and [`close`] it when
/// the view goes away. Dropping it instead unsubscribes in the background
/// but skips waiting for pending preference writes.
///
/// [`close`]: TaskStore::close
pub struct TaskStore<R: RemoteTree> {
    remote: Arc<R>,
    preferences: PreferenceCache,
    path: String,
    state: Arc<watch::Sender<StoreState>>,
    subscription: Option<SubscriptionId>,
    listener: Option<JoinHandle<()>>,
}

impl<R: RemoteTree> TaskStore<R> {
    /// Loads the saved filter and subscribes to `path`.
    ///
    /// A failed subscription does not fail the open; it is reported through
    /// [`TaskStore::error`].
    pub async fn open(remote: Arc<R>, preferences: PreferenceCache, path: impl Into<String>) -> Self {
        let filter = preferences.load().await;
        let (state, _) = watch::channel(StoreState::new(filter));
        let mut store = Self {
            remote,
            preferences,
            path: path.into(),
            state: Arc::new(state),
            subscription: None,
            listener: None,
        };
        store.subscribe().await;
        store
    }

    async fn subscribe(&mut self) {
        match self.remote.subscribe(&self.path).await {
            Ok(Subscription { id, mut events }) => {
                let state = Arc::clone(&self.state);
                self.subscription = Some(id);
                self.listener = Some(tokio::spawn(async move {
                    while let Some(event) = events.recv().await {
                        state.send_modify(|s| s.apply(event));
                    }
                }));
                tracing::debug!(path = %self.path, "task store subscribed");
            }
            Err(e) => {
                tracing::warn!(path = %self.path, error = %e, "failed to subscribe");
                self.state.send_modify(|s| {
                    s.error = Some(format!("{}: {}", CONNECT_ERROR, e));
                    s.synced = true;
                });
            }
        }
    }

    /// Releases the subscription and waits for pending preference writes.
    pub async fn close(mut self) {
        if let Some(id) = self.subscription.take() {
            if let Err(e) = self.remote.unsubscribe(id).await {
                tracing::warn!(error = %e, "failed to unsubscribe");
            }
        }
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.preferences.flush().await;
    }

    /// Resolves once the first snapshot (or a subscription failure) is in.
    pub async fn wait_until_synced(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`
        let _ = rx.wait_for(|s| s.synced).await;
    }

    /// A receiver that sees every state change.
    pub fn watch(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> StoreState {
        self.state.borrow().clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading()
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    pub fn find_task(&self, id: &str) -> Option<Task> {
        self.state.borrow().tasks.iter().find(|t| t.id == id).cloned()
    }

    fn begin_write(&self) {
        self.state.send_modify(|s| s.pending_writes += 1);
    }

    /// Ends a write started with `begin_write`, recording a failure as the
    /// store error.
    fn finish_write<T>(&self, result: Result<T, CoreError>, context: &str) -> Result<T, CoreError> {
        self.state.send_modify(|s| {
            s.pending_writes = s.pending_writes.saturating_sub(1);
            if let Err(e) = &result {
                s.error = Some(format!("{}: {}", context, e));
            }
        });
        if let Err(e) = &result {
            tracing::warn!(error = %e, "{}", context);
        }
        result
    }

    async fn write_fields(&self, id: &str, data: UpdateTaskData, context: &str) -> Result<(), CoreError> {
        let fields = data.into_fields()?;
        if fields.is_empty() {
            return Ok(());
        }
        self.begin_write();
        let result = self.remote.update(&child_path(&self.path, id), fields).await;
        self.finish_write(result, context)
    }
}

impl<R: RemoteTree> Drop for TaskStore<R> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        // Not closed: release the registration from a detached task. Outside
        // a runtime the remote prunes the dead channel on its next write.
        if let Some(id) = self.subscription.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let remote = Arc::clone(&self.remote);
                handle.spawn(async move {
                    if let Err(e) = remote.unsubscribe(id).await {
                        tracing::warn!(error = %e, "failed to unsubscribe dropped store");
                    }
                });
            }
        }
    }
}

#[async_trait]
impl<R: RemoteTree> TaskBoard for TaskStore<R> {
    async fn add_task(&self, data: NewTaskData) -> Result<String, CoreError> {
        // Validation happens before anything reaches the remote tree
        let mut task = Task::new(String::new(), data)?;

        self.begin_write();
        let result: Result<String, CoreError> = async {
            let key = self.remote.push(&self.path).await?;
            task.id = key.clone();
            self.remote
                .set(&child_path(&self.path, &key), task.to_record()?)
                .await?;
            Ok(key)
        }
        .await;
        let result = self.finish_write(result, "failed to add task");
        if let Ok(id) = &result {
            tracing::info!(%id, category = %task.category, "task added");
        }
        result
    }

    async fn update_task(&self, id: &str, data: UpdateTaskData) -> Result<(), CoreError> {
        self.write_fields(id, data, "failed to edit task").await
    }

    async fn toggle_task(&self, id: &str) -> Result<Option<bool>, CoreError> {
        let current = self.state.borrow().tasks.iter().find(|t| t.id == id).map(|t| t.completed);
        let Some(completed) = current else {
            tracing::debug!(%id, "toggle ignored, task not in local list");
            return Ok(None);
        };

        let update = UpdateTaskData {
            completed: Some(!completed),
            ..Default::default()
        };
        self.write_fields(id, update, "failed to update task").await?;
        Ok(Some(!completed))
    }

    async fn delete_task(&self, id: &str) -> Result<(), CoreError> {
        self.begin_write();
        let result = self.remote.remove(&child_path(&self.path, id)).await;
        self.finish_write(result, "failed to delete task")
    }

    fn tasks(&self) -> Vec<Task> {
        self.state.borrow().visible_tasks()
    }

    fn all_tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks.clone()
    }

    fn category_filter(&self) -> CategoryFilter {
        self.state.borrow().filter
    }

    fn set_category_filter(&self, filter: CategoryFilter) {
        self.state.send_modify(|s| s.filter = filter);
        self.preferences.save_in_background(filter);
    }

    async fn flush(&self) {
        self.preferences.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKeyValueStore;
    use crate::models::Category;
    use crate::remote::MemoryTree;
    use serde_json::json;

    async fn open_store() -> (TaskStore<MemoryTree>, Arc<MemoryTree>) {
        let tree = Arc::new(MemoryTree::new());
        let prefs = PreferenceCache::new(Arc::new(MemoryKeyValueStore::new()));
        let store = TaskStore::open(tree.clone(), prefs, "tasks").await;
        store.wait_until_synced().await;
        (store, tree)
    }

    #[tokio::test]
    async fn test_open_on_empty_tree() {
        let (store, _tree) = open_store().await;
        assert!(store.all_tasks().is_empty());
        assert!(!store.loading());
        assert_eq!(store.error(), None);
    }

    #[test]
    fn test_loading_until_first_snapshot() {
        let state = StoreState::new(CategoryFilter::All);
        assert!(state.loading());

        let mut state = state;
        state.apply(TreeEvent::Snapshot(None));
        assert!(!state.loading());
        assert!(state.loaded);
        assert_eq!(state.revision, 1);
    }

    #[test]
    fn test_malformed_record_is_skipped_and_reported() {
        let mut state = StoreState::new(CategoryFilter::All);
        let mixed = json!({
            "a": { "titulo": "A", "concluida": false, "criadaEm": 1, "categoria": "pessoal" },
            "b": "not a record"
        });
        state.apply(TreeEvent::Snapshot(mixed.as_object().cloned()));
        assert_eq!(state.tasks.len(), 1);
        assert_eq!(state.tasks[0].id, "a");
        assert_eq!(
            state.error.as_deref(),
            Some("failed to load tasks: unreadable records b")
        );

        state.apply(TreeEvent::Snapshot(None));
        assert!(state.tasks.is_empty());
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_add_does_not_insert_optimistically() {
        let (store, tree) = open_store().await;
        let mut rx = store.watch();

        let id = store
            .add_task(NewTaskData::new("Read", Category::Study))
            .await
            .unwrap();
        assert!(tree.snapshot("tasks").unwrap().contains_key(&id));

        rx.wait_for(|s| s.tasks.iter().any(|t| t.id == id)).await.unwrap();
        assert_eq!(store.find_task(&id).unwrap().title, "Read");
    }

    #[tokio::test]
    async fn test_close_releases_subscription() {
        let (store, tree) = open_store().await;
        assert_eq!(tree.listener_count(), 1);
        store.close().await;
        assert_eq!(tree.listener_count(), 0);
    }
}
