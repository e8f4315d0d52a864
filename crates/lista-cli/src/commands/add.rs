use anyhow::Result;
use lista_core::board::TaskBoard;
use lista_core::models::NewTaskData;
use owo_colors::{OwoColorize, Style};

use crate::cli::AddCommand;

pub async fn add_task(board: &impl TaskBoard, command: AddCommand) -> Result<()> {
    let category = command.category;
    let id = board.add_task(NewTaskData::new(command.title, category)).await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    println!("{} Created task in {}", "✓".style(success_style), category.bright_white().bold());
    println!("  {} Task ID: {}", "→".style(info_style), id.yellow());
    Ok(())
}
