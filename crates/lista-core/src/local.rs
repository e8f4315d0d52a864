use crate::board::TaskBoard;
use crate::error::CoreError;
use crate::kv::KeyValueStore;
use crate::models::{now_millis, CategoryFilter, NewTaskData, Task, UpdateTaskData};
use crate::preferences::PreferenceCache;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

/// Key holding the whole list as a JSON array.
pub const TASKS_KEY: &str = "tarefas";

#[derive(Debug, Default)]
struct ListState {
    tasks: Vec<Task>,
    filter: CategoryFilter,
}

/// The local-only variant: tasks live as one JSON document in a
/// key-value store, newest first.
pub struct LocalTaskList {
    store: Arc<dyn KeyValueStore>,
    preferences: PreferenceCache,
    state: Mutex<ListState>,
    // Serializes read-modify-save cycles
    writer: tokio::sync::Mutex<()>,
}

impl LocalTaskList {
    /// Reads the stored list. Unreadable data is logged and treated as an
    /// empty list.
    pub async fn load(store: Arc<dyn KeyValueStore>, preferences: PreferenceCache) -> Self {
        let tasks = match store.get_string(TASKS_KEY).await {
            Ok(Some(raw)) => serde_json::from_str::<Vec<Task>>(&raw).unwrap_or_else(|e| {
                tracing::error!(error = %e, "failed to parse stored tasks");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!(error = %e, "failed to read stored tasks");
                Vec::new()
            }
        };
        let filter = preferences.load().await;
        tracing::debug!(count = tasks.len(), %filter, "local task list loaded");

        Self {
            store,
            preferences,
            state: Mutex::new(ListState { tasks, filter }),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Applies `change` to a copy of the list, saves it, then publishes it.
    async fn modify<T, F>(&self, change: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<T, CoreError> + Send,
        T: Send,
    {
        let _writer = self.writer.lock().await;
        let mut tasks = self.lock().tasks.clone();
        let outcome = change(&mut tasks)?;

        let raw = serde_json::to_string(&tasks)?;
        self.store.set_string(TASKS_KEY, &raw).await?;
        self.lock().tasks = tasks;
        Ok(outcome)
    }
}

#[async_trait]
impl TaskBoard for LocalTaskList {
    async fn add_task(&self, data: NewTaskData) -> Result<String, CoreError> {
        let mut task = Task::new(String::new(), data)?;
        self.modify(move |tasks| {
            // Ids come from the creation time; step past any taken one
            let mut stamp = now_millis();
            while tasks.iter().any(|t| t.id == stamp.to_string()) {
                stamp += 1;
            }
            task.id = stamp.to_string();
            task.created_at = stamp;
            let id = task.id.clone();
            tasks.insert(0, task);
            Ok(id)
        })
        .await
    }

    async fn update_task(&self, id: &str, data: UpdateTaskData) -> Result<(), CoreError> {
        self.modify(|tasks| {
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
            data.apply_to(task)
        })
        .await
    }

    async fn toggle_task(&self, id: &str) -> Result<Option<bool>, CoreError> {
        let known = self.lock().tasks.iter().any(|t| t.id == id);
        if !known {
            return Ok(None);
        }
        self.modify(|tasks| {
            Ok(tasks.iter_mut().find(|t| t.id == id).map(|task| {
                task.completed = !task.completed;
                task.completed
            }))
        })
        .await
    }

    async fn delete_task(&self, id: &str) -> Result<(), CoreError> {
        self.modify(|tasks| {
            tasks.retain(|t| t.id != id);
            Ok(())
        })
        .await
    }

    fn all_tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    fn category_filter(&self) -> CategoryFilter {
        self.lock().filter
    }

    fn set_category_filter(&self, filter: CategoryFilter) {
        self.lock().filter = filter;
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
    use serde_json::json;

    async fn setup() -> (LocalTaskList, Arc<MemoryKeyValueStore>) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let list = LocalTaskList::load(kv.clone(), PreferenceCache::new(kv.clone())).await;
        (list, kv)
    }

    #[tokio::test]
    async fn test_add_prepends_and_persists() {
        let (list, kv) = setup().await;
        let first = list.add_task(NewTaskData::new("First", Category::Work)).await.unwrap();
        let second = list.add_task(NewTaskData::new("Second", Category::Study)).await.unwrap();
        assert_ne!(first, second);

        let titles: Vec<String> = list.all_tasks().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["Second", "First"]);

        let stored: Vec<Task> =
            serde_json::from_str(&kv.get_string(TASKS_KEY).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored, list.all_tasks());
    }

    #[tokio::test]
    async fn test_load_normalizes_legacy_records() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let legacy = json!([
            { "id": "1", "titulo": "Old", "concluida": false, "criadaEm": 1 },
            { "id": "2", "titulo": "New", "concluida": true, "criadaEm": 2, "categoria": "estudo" }
        ]);
        kv.set_string(TASKS_KEY, &legacy.to_string()).await.unwrap();

        let list = LocalTaskList::load(kv.clone(), PreferenceCache::new(kv.clone())).await;
        let tasks = list.all_tasks();
        assert_eq!(tasks[0].category, Category::Personal);
        assert_eq!(tasks[1].category, Category::Study);
    }

    #[tokio::test]
    async fn test_corrupt_data_loads_empty() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set_string(TASKS_KEY, "{not json").await.unwrap();
        let list = LocalTaskList::load(kv.clone(), PreferenceCache::new(kv.clone())).await;
        assert!(list.all_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_delete_and_unknown_ids() {
        let (list, _kv) = setup().await;
        let id = list.add_task(NewTaskData::new("Task", Category::Personal)).await.unwrap();

        assert_eq!(list.toggle_task(&id).await.unwrap(), Some(true));
        assert_eq!(list.toggle_task(&id).await.unwrap(), Some(false));
        assert_eq!(list.toggle_task("missing").await.unwrap(), None);
        assert!(matches!(
            list.update_task("missing", UpdateTaskData::default()).await,
            Err(CoreError::NotFound(_))
        ));

        list.delete_task(&id).await.unwrap();
        list.delete_task(&id).await.unwrap();
        assert!(list.all_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_list_unchanged() {
        let (list, kv) = setup().await;
        kv.set_failing(true);
        let result = list.add_task(NewTaskData::new("Lost", Category::Work)).await;
        assert!(result.is_err());
        assert!(list.all_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_filter_is_applied_and_saved() {
        let (list, kv) = setup().await;
        list.add_task(NewTaskData::new("A", Category::Work)).await.unwrap();
        list.add_task(NewTaskData::new("B", Category::Study)).await.unwrap();

        list.set_category_filter(CategoryFilter::Only(Category::Work));
        let visible = list.tasks();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "A");

        list.flush().await;
        let reloaded = LocalTaskList::load(kv.clone(), PreferenceCache::new(kv.clone())).await;
        assert_eq!(reloaded.category_filter(), CategoryFilter::Only(Category::Work));
    }
}
