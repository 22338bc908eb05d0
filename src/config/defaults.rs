//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Default field weights for the ranking pipeline
pub const DEFAULT_NAME_WEIGHT: f64 = 2.0;
pub const DEFAULT_CATEGORY_WEIGHT: f64 = 2.0;
pub const DEFAULT_KEYWORDS_WEIGHT: f64 = 2.0;
pub const DEFAULT_DESCRIPTION_WEIGHT: f64 = 2.0;
pub const DEFAULT_FILE_WEIGHT: f64 = 1.0;

/// Tokens this short never score against the file origin (path fragments are noise)
pub const DEFAULT_FILE_MIN_TOKEN_LEN: usize = 5;

/// Multiplier for entries that carry an icon
pub const DEFAULT_ICON_BOOST: f64 = 3.0;

/// Multiplier for entries whose validation reported disabled or failed
pub const DEFAULT_DISABLED_FACTOR: f64 = 0.5;

/// Sort-key offset that sinks disabled entries below enabled ones
pub const DEFAULT_DISABLED_SORT_OFFSET: f64 = 10.0;

/// Entries at or below this unnormalized score are dropped
pub const DEFAULT_MIN_SCORE: f64 = 1.0;

/// Usage boost = min(factor * count / total, cap)
pub const DEFAULT_USAGE_BOOST_FACTOR: f64 = 10.0;
pub const DEFAULT_USAGE_BOOST_CAP: f64 = 2.0;

/// Default number of results per query
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Minimum interval between debounced catalog updates
pub const DEFAULT_DEBOUNCE_INTERVAL_MS: u64 = 250;

/// Default tracking settings
pub const DEFAULT_TRACKING_ENABLED: bool = true;
pub const DEFAULT_HISTORY_MAX_LENGTH: usize = 10;
pub const DEFAULT_TRACKING_PATH: &str = "~/.quicklaunch/tracking.json";

/// Callbacks slower than this are reported
pub const DEFAULT_SLOW_CALLBACK_MS: u64 = 200;

/// Config file location and its environment override
pub const DEFAULT_CONFIG_PATH: &str = "~/.quicklaunch/config.json";
pub const CONFIG_PATH_ENV: &str = "QUICKLAUNCH_CONFIG";
