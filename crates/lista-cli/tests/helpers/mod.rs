use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test harness for running CLI commands against a temporary database
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
    backend: &'static str,
}

impl CliTestHarness {
    /// Create a new test harness using the synchronized task store
    pub fn new() -> Self {
        Self::with_backend("remote")
    }

    /// Create a new test harness using the local-only task list
    pub fn local() -> Self {
        Self::with_backend("local")
    }

    fn with_backend(backend: &'static str) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self {
            temp_dir,
            db_path,
            backend,
        }
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("lista").expect("Failed to find lista binary");

        // Run from the temp dir so no stray lista.toml is picked up
        cmd.current_dir(self.temp_dir.path());
        cmd.env("LISTA_DATABASE_PATH", &self.db_path);
        cmd.env("LISTA_BACKEND", self.backend);
        cmd.env_remove("RUST_LOG");

        cmd
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Writes a raw record straight into the synchronized collection,
    /// bypassing the CLI's validation
    pub fn write_raw_record(&self, key: &str, value: serde_json::Value) {
        let runtime = tokio::runtime::Runtime::new().expect("Failed to start runtime");
        runtime.block_on(async {
            let pool = lista_core::db::establish_connection(&self.db_path.to_string_lossy())
                .await
                .expect("Failed to open test database");
            let tree = lista_core::remote::SqliteTree::new(pool.clone());
            lista_core::remote::RemoteTree::set(&tree, &format!("tasks/{}", key), value)
                .await
                .expect("Failed to write raw record");
            pool.close().await;
        });
    }

    /// Adds a task and returns its full ID
    pub fn add_task(&self, title: &str, category: &str) -> String {
        let output = self
            .command()
            .args(["add", title, "--category", category])
            .output()
            .expect("Failed to run add");
        assert!(output.status.success(), "add failed: {:?}", output);

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .find_map(|line| line.split("Task ID: ").nth(1))
            .map(|id| strip_ansi(id.trim()))
            .expect("No task ID in add output")
    }
}

/// Removes ANSI color sequences
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            // Skip until the final byte of the escape sequence
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Utility functions for test assertions
pub mod assertions {
    use predicates::prelude::*;

    /// Predicate to check if output contains task table headers
    pub fn has_task_table_headers() -> impl Predicate<str> {
        predicate::str::contains("ID")
            .and(predicate::str::contains("Title"))
            .and(predicate::str::contains("Category"))
    }

    /// Predicate to check if output indicates successful task creation
    pub fn task_created_successfully() -> impl Predicate<str> {
        predicate::str::contains("✓").and(predicate::str::contains("Task ID"))
    }

    /// Predicate to check for empty result set
    pub fn empty_result() -> impl Predicate<str> {
        predicate::str::contains("No tasks found")
    }

    /// Predicate to check for error messages
    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error")
    }
}
