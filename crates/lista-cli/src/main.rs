use clap::Parser;
use lista_core::board::TaskBoard;
use lista_core::db;
use lista_core::error::CoreError;
use lista_core::kv::{KeyValueStore, SqliteKeyValueStore};
use lista_core::local::LocalTaskList;
use lista_core::preferences::PreferenceCache;
use lista_core::remote::SqliteTree;
use lista_core::store::TaskStore;
use owo_colors::{OwoColorize, Style};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;
mod config;
mod util;
mod views;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let config = config::Config::new().unwrap_or_else(|e| {
        eprintln!("{} ignoring invalid configuration: {}", "Warning:".yellow().bold(), e);
        config::Config::default()
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.as_str().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let db_pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueStore::new(db_pool.clone()));
    let preferences = PreferenceCache::new(kv.clone());

    let result = match config.backend {
        config::Backend::Remote => {
            let tree = Arc::new(SqliteTree::new(db_pool.clone()));
            let store = TaskStore::open(tree, preferences, config.remote_path.as_str()).await;
            store.wait_until_synced().await;

            // Without a single snapshot there is nothing to work on; any
            // other error still lets the command run
            let state = store.state();
            let result = match state.error {
                Some(message) if !state.loaded => Err(anyhow::anyhow!(message)),
                Some(message) => {
                    eprintln!("{} {}", "Warning:".yellow().bold(), message);
                    run(&store, cli.command).await
                }
                None => run(&store, cli.command).await,
            };
            store.close().await;
            result
        }
        config::Backend::Local => {
            let list = LocalTaskList::load(kv, preferences).await;
            let result = run(&list, cli.command).await;
            list.flush().await;
            result
        }
    };
    db_pool.close().await;

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn run(board: &impl TaskBoard, command: cli::Commands) -> anyhow::Result<()> {
    match command {
        cli::Commands::Add(command) => commands::add::add_task(board, command).await,
        cli::Commands::List(command) => commands::list::list_tasks(board, command).await,
        cli::Commands::Show(command) => commands::show::show_task(board, command).await,
        cli::Commands::Done(command) => commands::done::toggle_task(board, command).await,
        cli::Commands::Edit(command) => commands::edit::edit_task(board, command).await,
        cli::Commands::Delete(command) => commands::delete::delete_task(board, command).await,
        cli::Commands::Filter(command) => commands::filter::filter_command(board, command).await,
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::AmbiguousId(tasks) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, title) in tasks {
                    eprintln!("  {} ({})", id.yellow(), title);
                }
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::Remote(s) => {
                eprintln!("{} Could not reach the task database: {}", "Error:".style(error_style), s);
            }
            _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}
