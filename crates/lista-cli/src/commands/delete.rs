use anyhow::Result;
use dialoguer::Confirm;
use lista_core::board::TaskBoard;

use crate::cli::DeleteCommand;
use crate::util::resolve_task;

pub async fn delete_task(board: &impl TaskBoard, command: DeleteCommand) -> Result<()> {
    let task = resolve_task(board, &command.id)?;

    if !command.force {
        let confirmation = Confirm::new()
            .with_prompt(format!(
                "Are you sure you want to delete task '{}'?",
                task.title
            ))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    board.delete_task(&task.id).await?;
    println!("Task deleted successfully.");
    Ok(())
}
