use clap::{Parser, Subcommand};
use lista_core::models::{Category, CategoryFilter};

/// A small, robust to-do list with categories
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a new task
    Add(AddCommand),
    /// List tasks
    List(ListCommand),
    /// Show the details of one task
    Show(ShowCommand),
    /// Mark a task as completed, or reopen a completed one
    Done(DoneCommand),
    /// Edit a task
    Edit(EditCommand),
    /// Delete a task
    Delete(DeleteCommand),
    /// Show or change the saved category filter
    Filter(FilterCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The title of the task
    pub title: String,
    /// The category of the task (personal, work, study)
    #[clap(short, long, default_value = "personal")]
    pub category: Category,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// Show only this category for this listing (all, personal, work, study)
    #[clap(short, long, conflicts_with = "all")]
    pub category: Option<CategoryFilter>,
    /// Ignore the saved filter
    #[clap(short, long)]
    pub all: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// The ID (or a unique ending of it) of the task to show
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct DoneCommand {
    /// The ID (or a unique ending of it) of the task to toggle
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The ID (or a unique ending of it) of the task to edit
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub category: Option<Category>,

    #[arg(long)]
    pub completed: Option<bool>,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The ID (or a unique ending of it) of the task to delete
    pub id: String,
    /// Force deletion without confirmation
    #[clap(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct FilterCommand {
    /// The new filter (all, personal, work, study); omit to show the current one
    pub filter: Option<CategoryFilter>,
}
