use anyhow::Result;
use lista_core::board::TaskBoard;
use owo_colors::OwoColorize;

use crate::cli::FilterCommand;

pub async fn filter_command(board: &impl TaskBoard, command: FilterCommand) -> Result<()> {
    match command.filter {
        Some(filter) => {
            board.set_category_filter(filter);
            board.flush().await;
            println!("Filter set to {}", filter.to_string().bright_white().bold());
        }
        None => println!("Current filter: {}", board.category_filter()),
    }
    Ok(())
}
