//! Runtime settings.
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `stockroom.toml` in the working directory (or the file passed with
//! `--config`), then `STOCKROOM_*` environment variables. A `.env` file is
//! loaded into the environment before reading them. Command-line flags are
//! applied on top by the CLI.

use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

use crate::storage::StoreOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// SQLite database file.
    #[serde(default = "default_database")]
    pub database: String,
    /// Profile acting on mutating commands.
    #[serde(default)]
    pub user: Option<Uuid>,
    /// Rows shown in the low-stock list.
    #[serde(default = "default_low_stock_limit")]
    pub low_stock_limit: usize,
    /// Rows shown in the dashboard's recent movements.
    #[serde(default = "default_recent_movements")]
    pub recent_movements: usize,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database() -> String {
    "stockroom.db".to_string()
}

fn default_low_stock_limit() -> usize {
    5
}

fn default_recent_movements() -> usize {
    10
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_max_connections() -> u32 {
    8
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: default_database(),
            user: None,
            low_stock_limit: default_low_stock_limit(),
            recent_movements: default_recent_movements(),
            busy_timeout_ms: default_busy_timeout_ms(),
            max_connections: default_max_connections(),
        }
    }
}

impl Settings {
    /// Load settings from the config file and environment.
    ///
    /// An explicitly named `file` must exist; the default `stockroom.toml` is optional.
    pub fn load(file: Option<&str>) -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let source = match file {
            Some(path) => config::File::with_name(path).required(true),
            None => config::File::with_name("stockroom").required(false),
        };

        config::Config::builder()
            .add_source(source)
            .add_source(config::Environment::with_prefix("STOCKROOM").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Defaults pointed at a specific database file.
    pub fn for_database(path: impl Into<String>) -> Self {
        Self {
            database: path.into(),
            ..Self::default()
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            max_connections: self.max_connections.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.database, "stockroom.db");
        assert_eq!(settings.user, None);
        assert_eq!(settings.low_stock_limit, 5);
        assert_eq!(settings.recent_movements, 10);
    }

    #[test]
    fn test_store_options_from_settings() {
        let settings = Settings {
            busy_timeout_ms: 250,
            max_connections: 0,
            ..Settings::for_database("inventory.db")
        };

        let options = settings.store_options();
        assert_eq!(options.busy_timeout, Duration::from_millis(250));
        assert_eq!(options.max_connections, 1);
        assert_eq!(settings.database, "inventory.db");
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "database = \"shop.db\"\nlow_stock_limit = 3\nuser = \"6f0c2f7e-2f5a-4d6b-9a51-3c1f4b2b7c11\"\n",
        )
        .unwrap();

        let settings = Settings::load(path.to_str()).unwrap();

        assert_eq!(settings.database, "shop.db");
        assert_eq!(settings.low_stock_limit, 3);
        assert_eq!(
            settings.user,
            Some(Uuid::parse_str("6f0c2f7e-2f5a-4d6b-9a51-3c1f4b2b7c11").unwrap())
        );
        assert_eq!(settings.recent_movements, 10);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Settings::load(Some("/nonexistent/stockroom-settings.toml")).is_err());
    }
}
