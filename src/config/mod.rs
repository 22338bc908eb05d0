//! Configuration module - Ranking, debounce and tracking settings
//!
//! This module provides functionality for:
//! - Loading configuration from ~/.quicklaunch/config.json
//! - Default values for all settings
//! - Type definitions for config structures
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions (Config, RankingConfig, etc.)
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

pub use defaults::{
    DEFAULT_DEBOUNCE_INTERVAL_MS, DEFAULT_HISTORY_MAX_LENGTH, DEFAULT_MAX_RESULTS,
    DEFAULT_SLOW_CALLBACK_MS,
};

pub use types::{Config, DebounceConfig, QueryConfig, RankingConfig, TrackingConfig};

pub use loader::{config_path, load_config, load_config_from};

#[cfg(test)]
pub use defaults::*;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
