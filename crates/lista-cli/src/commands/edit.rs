use anyhow::{anyhow, Result};
use lista_core::board::TaskBoard;
use lista_core::error::CoreError;
use lista_core::models::UpdateTaskData;
use owo_colors::OwoColorize;

use crate::cli::EditCommand;
use crate::util::resolve_task;

pub async fn edit_task(board: &impl TaskBoard, command: EditCommand) -> Result<()> {
    let task = resolve_task(board, &command.id)?;

    let update = UpdateTaskData {
        title: command.title,
        completed: command.completed,
        category: command.category,
    };
    if update.is_empty() {
        return Err(anyhow!(CoreError::InvalidInput(
            "Nothing to change. Pass --title, --category or --completed.".to_string()
        )));
    }

    board.update_task(&task.id, update).await?;
    println!("Updated task: '{}'", task.title.bright_white());
    Ok(())
}
