//! Configuration loading from file system
//!
//! Handles locating and parsing the JSON config file.

use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use super::defaults::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use super::types::Config;

/// Path of the config file: `$QUICKLAUNCH_CONFIG`, else ~/.quicklaunch/config.json
pub fn config_path() -> PathBuf {
    let raw = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    PathBuf::from(shellexpand::tilde(&raw).as_ref())
}

/// Load configuration from the default location.
///
/// Returns Config::default() if any step fails.
pub fn load_config() -> Config {
    load_config_from(&config_path())
}

/// Load configuration from an explicit path.
///
/// A missing file is normal and yields defaults. Unreadable or malformed
/// files are logged and also yield defaults, so a bad config never stops
/// the index from coming up.
#[instrument(name = "load_config")]
pub fn load_config_from(config_path: &Path) -> Config {
    if !config_path.exists() {
        info!(path = %config_path.display(), "Config file not found, using defaults");
        return Config::default();
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %config_path.display(), error = %e, "Failed to read config, using defaults");
            return Config::default();
        }
    };

    match serde_json::from_str::<Config>(&content) {
        Ok(config) => {
            info!(path = %config_path.display(), "Successfully loaded config");
            config
        }
        Err(e) => {
            let hint = if e.to_string().contains("invalid type") {
                "\n\nHint: weights and factors are numbers, e.g. {\"ranking\": {\"descriptionWeight\": 1.0}}"
            } else {
                ""
            };
            warn!(
                path = %config_path.display(),
                error = %e,
                hint = %hint,
                "Failed to parse config JSON, using defaults"
            );
            Config::default()
        }
    }
}
