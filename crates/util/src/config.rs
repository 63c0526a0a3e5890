use std::{env, path::Path, path::PathBuf};

use dirs_next::{config_dir, home_dir};
use flowwatch_types::ConsoleConfig;
use thiserror::Error;

/// Overrides the location of `config.json`.
pub const CONFIG_PATH_ENV: &str = "FLOWWATCH_CONFIG_PATH";
/// Overrides the configured workflow server URL.
pub const BASE_URL_ENV: &str = "FLOWWATCH_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Get the default path for the console configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return resolve_home(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flowwatch")
        .join("config.json")
}

/// Resolves a leading `~` in a user-supplied path against the home directory.
fn resolve_home(path: &str) -> PathBuf {
    let path = path.trim();
    let relative = if path == "~" {
        ""
    } else if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        rest
    } else {
        return PathBuf::from(path);
    };
    match home_dir() {
        Some(home) if relative.is_empty() => home,
        Some(home) => home.join(relative),
        None => PathBuf::from(path),
    }
}

/// Reads a config file. A missing file is `Ok(None)`.
pub fn read_config_file(path: &Path) -> Result<Option<ConsoleConfig>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&content).map(Some).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the console configuration from [`default_config_path`] and applies
/// the `FLOWWATCH_BASE_URL` override.
///
/// Missing or unreadable files fall back to defaults; the latter is logged.
pub fn load_config() -> ConsoleConfig {
    let path = default_config_path();
    let mut config = match read_config_file(&path) {
        Ok(Some(config)) => config,
        Ok(None) => ConsoleConfig::default(),
        Err(error) => {
            tracing::warn!(target: "flowwatch_console", %error, "falling back to default configuration");
            ConsoleConfig::default()
        }
    };

    if let Ok(base_url) = env::var(BASE_URL_ENV)
        && !base_url.trim().is_empty()
    {
        config.base_url = base_url.trim().to_string();
    }
    config
}
