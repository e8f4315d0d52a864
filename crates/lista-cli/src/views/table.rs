use chrono::{TimeZone, Utc};
use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use lista_core::models::{Category, CategoryFilter, Task};

pub fn display_tasks(tasks: &[Task], filter: CategoryFilter, total: usize) {
    if tasks.is_empty() {
        println!("No tasks found.");
        if filter != CategoryFilter::All && total > 0 {
            println!("Filter: {} ({} hidden)", filter, total);
        }
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Category", "Status", "Created"]);

    for task in tasks {
        let mut row = Row::new();
        row.add_cell(Cell::new(task.short_id()));

        let mut title_cell = Cell::new(&task.title);
        if task.completed {
            title_cell = title_cell
                .add_attribute(Attribute::CrossedOut)
                .fg(Color::DarkGrey);
        }
        row.add_cell(title_cell);

        let category_color = match task.category {
            Category::Personal => Color::Cyan,
            Category::Work => Color::Yellow,
            Category::Study => Color::Magenta,
        };
        row.add_cell(Cell::new(task.category.to_string()).fg(category_color));

        let status_cell = if task.completed {
            Cell::new("Done").fg(Color::Green)
        } else {
            Cell::new("Pending")
        };
        row.add_cell(status_cell);

        let created = Utc
            .timestamp_millis_opt(task.created_at)
            .single()
            .map(|at| at.humanize())
            .unwrap_or_else(|| "Unknown".to_string());
        row.add_cell(Cell::new(created));
        table.add_row(row);
    }

    println!("{table}");
    if filter != CategoryFilter::All {
        println!("Filter: {} ({} of {} tasks)", filter, tasks.len(), total);
    }
}
