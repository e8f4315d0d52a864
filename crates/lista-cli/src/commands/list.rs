use anyhow::Result;
use lista_core::board::TaskBoard;
use lista_core::models::CategoryFilter;

use crate::cli::ListCommand;
use crate::views::table::display_tasks;

pub async fn list_tasks(board: &impl TaskBoard, command: ListCommand) -> Result<()> {
    // A one-off filter does not replace the saved one
    let filter = if command.all {
        CategoryFilter::All
    } else {
        command.category.unwrap_or_else(|| board.category_filter())
    };

    let all = board.all_tasks();
    let visible = filter.apply(&all);
    display_tasks(&visible, filter, all.len());
    Ok(())
}
