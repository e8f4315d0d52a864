use anyhow::{anyhow, Result};
use lista_core::board::TaskBoard;
use lista_core::error::CoreError;
use lista_core::models::Task;

/// Shortest id ending accepted on the command line.
const MIN_ID_FRAGMENT: usize = 4;

/// Finds the task whose id is `fragment`, or ends with it.
pub fn resolve_task(board: &impl TaskBoard, fragment: &str) -> Result<Task> {
    let tasks = board.all_tasks();
    if let Some(task) = tasks.iter().find(|t| t.id == fragment) {
        return Ok(task.clone());
    }
    if fragment.chars().count() < MIN_ID_FRAGMENT {
        return Err(anyhow!(CoreError::InvalidInput(format!(
            "Short ID must be at least {} characters long.",
            MIN_ID_FRAGMENT
        ))));
    }

    let mut matches: Vec<Task> = tasks
        .into_iter()
        .filter(|t| t.id.ends_with(fragment))
        .collect();
    if matches.len() == 1 {
        Ok(matches.remove(0))
    } else if matches.is_empty() {
        Err(anyhow!(CoreError::NotFound(format!(
            "No task found with ID '{}'",
            fragment
        ))))
    } else {
        let task_info: Vec<(String, String)> =
            matches.into_iter().map(|t| (t.id, t.title)).collect();
        Err(anyhow!(CoreError::AmbiguousId(task_info)))
    }
}
