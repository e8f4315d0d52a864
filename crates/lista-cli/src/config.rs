use figment::{Figment, providers::{Format, Toml, Env}};
use serde::Deserialize;

/// Where tasks are kept.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// A tree database that pushes snapshots to the task store
    #[default]
    Remote,
    /// A single JSON document in the key-value store
    Local,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding the tree and the preferences
    pub database_path: String,
    /// Tree path the tasks live under
    pub remote_path: String,
    pub backend: Backend,
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "lista.db".to_string(),
            remote_path: "tasks".to_string(),
            backend: Backend::Remote,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("lista.toml"))
            .merge(Env::prefixed("LISTA_"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_env_override() {
        figment::Jail::expect_with(|jail| {
            let config = Config::new()?;
            assert_eq!(config.database_path, "lista.db");
            assert_eq!(config.backend, Backend::Remote);

            jail.create_file("lista.toml", "remote_path = \"tarefas\"\nbackend = \"local\"")?;
            jail.set_env("LISTA_DATABASE_PATH", "/tmp/other.db");
            let config = Config::new()?;
            assert_eq!(config.remote_path, "tarefas");
            assert_eq!(config.backend, Backend::Local);
            assert_eq!(config.database_path, "/tmp/other.db");
            Ok(())
        });
    }
}
