//! Application configuration.
//!
//! Runtime settings are read with priority config.toml > environment
//! (.env is loaded first) > defaults. Tuning constants for selection live
//! here too.

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ==================== Runtime Settings ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    database: Option<DatabaseConfig>,
    server: Option<ServerConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
    seed_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerConfig {
    addr: Option<String>,
    port: Option<u16>,
}

/// Resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_path: PathBuf,
    pub seed_file: Option<PathBuf>,
    pub server_addr: String,
    pub server_port: u16,
}

impl Settings {
    /// Get the full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_addr, self.server_port)
    }
}

/// Default database location
pub const DEFAULT_DATABASE_PATH: &str = "data/qbank.db";

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const SERVER_PORT: u16 = 3000;

fn read_file_config(path: &Path) -> FileConfig {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return FileConfig::default();
    };
    match toml::from_str::<FileConfig>(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring unparseable {}: {}", path.display(), e);
            FileConfig::default()
        }
    }
}

/// Load settings from config.toml, the environment and defaults.
pub fn load() -> Settings {
    // Load .env file if present
    let _ = dotenvy::dotenv();
    resolve(read_file_config(Path::new("config.toml")), |key| std::env::var(key).ok())
}

fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Settings {
    let database = file.database.unwrap_or_default();
    let server = file.server.unwrap_or_default();

    let database_path = match database.path {
        Some(path) => {
            tracing::info!("Using database from config.toml: {}", path);
            PathBuf::from(path)
        }
        None => match env("DATABASE_PATH") {
            Some(path) => {
                tracing::info!("Using database from DATABASE_PATH env: {}", path);
                PathBuf::from(path)
            }
            None => PathBuf::from(DEFAULT_DATABASE_PATH),
        },
    };

    let seed_file = database.seed_file.or_else(|| env("SEED_FILE")).map(PathBuf::from);

    let server_port = server
        .port
        .or_else(|| env("PORT").and_then(|p| p.parse().ok()))
        .unwrap_or(SERVER_PORT);

    Settings {
        database_path,
        seed_file,
        server_addr: server.addr.unwrap_or_else(|| SERVER_ADDR.to_string()),
        server_port,
    }
}

// ==================== Session Configuration ====================

/// Cookie whose presence marks a signed-in request
pub const SESSION_COOKIE_NAME: &str = "token";

// ==================== Fetch Defaults ====================

/// Page used when the request has none
pub const DEFAULT_PAGE: usize = 1;

/// Questions per page when `amount`/`limit` is missing
pub const DEFAULT_PAGE_SIZE: usize = 20;

// ==================== Balancing ====================

/// Share of a balanced sample drawn from easy questions
pub const EASY_SHARE: f64 = 0.3;

/// Share of a balanced sample drawn from hard questions (at least one)
pub const HARD_SHARE: f64 = 0.2;

// ==================== Review Mix ====================

/// Minimum share of previously failed questions
pub const MIN_FAILED_SHARE: f64 = 0.25;

/// Minimum share of questions marked unsure
pub const MIN_UNSURE_SHARE: f64 = 0.15;

/// Portion of a fresh-question shortfall moved onto the failed pool
pub const SHORTFALL_SHIFT: f64 = 0.6;

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let settings = resolve(FileConfig::default(), no_env);
        assert_eq!(settings.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(settings.seed_file, None);
        assert_eq!(settings.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_file_beats_env() {
        let file: FileConfig = toml::from_str(
            r#"
            [database]
            path = "/srv/qbank.db"

            [server]
            port = 8080
            "#,
        )
        .unwrap();
        let env = |key: &str| match key {
            "DATABASE_PATH" => Some("/tmp/env.db".to_string()),
            "PORT" => Some("9000".to_string()),
            "SEED_FILE" => Some("seed.json".to_string()),
            _ => None,
        };
        let settings = resolve(file, env);
        assert_eq!(settings.database_path, PathBuf::from("/srv/qbank.db"));
        assert_eq!(settings.server_port, 8080);
        assert_eq!(settings.seed_file, Some(PathBuf::from("seed.json")));
    }

    #[test]
    fn test_env_used_when_file_silent() {
        let env = |key: &str| match key {
            "DATABASE_PATH" => Some("/tmp/env.db".to_string()),
            "PORT" => Some("not-a-port".to_string()),
            _ => None,
        };
        let settings = resolve(FileConfig::default(), env);
        assert_eq!(settings.database_path, PathBuf::from("/tmp/env.db"));
        assert_eq!(settings.server_port, SERVER_PORT);
    }
}
