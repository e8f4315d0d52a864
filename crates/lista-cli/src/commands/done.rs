use anyhow::{anyhow, Result};
use lista_core::board::TaskBoard;
use lista_core::error::CoreError;

use crate::cli::DoneCommand;
use crate::util::resolve_task;

pub async fn toggle_task(board: &impl TaskBoard, command: DoneCommand) -> Result<()> {
    let task = resolve_task(board, &command.id)?;

    match board.toggle_task(&task.id).await? {
        Some(true) => println!("Completed task: '{}'", task.title),
        Some(false) => println!("Reopened task: '{}'", task.title),
        None => {
            return Err(anyhow!(CoreError::NotFound(format!(
                "Task '{}' is no longer in the list",
                task.id
            ))))
        }
    }
    Ok(())
}
