use anyhow::Result;
use chrono::{TimeZone, Utc};
use lista_core::board::TaskBoard;
use owo_colors::OwoColorize;

use crate::cli::ShowCommand;
use crate::util::resolve_task;

pub async fn show_task(board: &impl TaskBoard, command: ShowCommand) -> Result<()> {
    let task = resolve_task(board, &command.id)?;

    println!("{}", "Task Details".blue().bold());
    println!("ID: {}", task.id.yellow());
    println!("Title: {}", task.title.cyan());
    println!("Category: {}", task.category);
    println!(
        "Status: {}",
        if task.completed {
            "Done".green().to_string()
        } else {
            "Pending".to_string()
        }
    );
    let created = Utc
        .timestamp_millis_opt(task.created_at)
        .single()
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    println!("Created: {}", created);
    Ok(())
}
