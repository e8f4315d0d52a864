use crate::error::CoreError;
use crate::models::{CategoryFilter, NewTaskData, Task, UpdateTaskData};
use async_trait::async_trait;

/// Operations a task list view needs, whatever keeps the tasks.
///
/// Implemented by the synchronized [`TaskStore`](crate::store::TaskStore)
/// and the local-only [`LocalTaskList`](crate::local::LocalTaskList).
#[async_trait]
pub trait TaskBoard: Send + Sync {
    /// Creates a task and returns its id.
    async fn add_task(&self, data: NewTaskData) -> Result<String, CoreError>;
    async fn update_task(&self, id: &str, data: UpdateTaskData) -> Result<(), CoreError>;
    /// Flips the completion flag. Returns the new value, or `None` when the
    /// id is not in the current list.
    async fn toggle_task(&self, id: &str) -> Result<Option<bool>, CoreError>;
    async fn delete_task(&self, id: &str) -> Result<(), CoreError>;

    /// Tasks visible under the active filter.
    fn tasks(&self) -> Vec<Task> {
        self.category_filter().apply(&self.all_tasks())
    }
    fn all_tasks(&self) -> Vec<Task>;
    fn category_filter(&self) -> CategoryFilter;
    /// Changes the filter now and persists it in the background.
    fn set_category_filter(&self, filter: CategoryFilter);
    /// Waits for background preference writes.
    async fn flush(&self);
}
