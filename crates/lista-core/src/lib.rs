//! # Lista Core Library
//!
//! A small task-list library: tasks with a title and a category, kept either
//! in a remote tree database that pushes full snapshots to subscribers, or as
//! a single JSON document in a local key-value store.
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Task record, categories and filters
//! - [`remote`]: Remote tree client trait with in-memory and SQLite backends
//! - [`kv`]: String key-value stores
//! - [`preferences`]: Persistence of the active category filter
//! - [`store`]: The task synchronization store
//! - [`local`]: The local-only task list
//! - [`board`]: The operation surface shared by both task sources
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lista_core::{
//!     board::TaskBoard, db, kv::SqliteKeyValueStore, models::{Category, NewTaskData},
//!     preferences::PreferenceCache, remote::SqliteTree, store::TaskStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("tasks.db").await?;
//!     let tree = Arc::new(SqliteTree::new(pool.clone()));
//!     let prefs = PreferenceCache::new(Arc::new(SqliteKeyValueStore::new(pool)));
//!
//!     let store = TaskStore::open(tree, prefs, "tasks").await;
//!     store.wait_until_synced().await;
//!
//!     let id = store.add_task(NewTaskData::new("Buy milk", Category::Work)).await?;
//!     println!("Created task {}", id);
//!
//!     store.close().await;
//!     Ok(())
//! }
//! ```

pub mod board;
pub mod db;
pub mod error;
pub mod kv;
pub mod local;
pub mod models;
pub mod preferences;
pub mod remote;
pub mod store;
