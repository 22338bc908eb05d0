//! Configuration type definitions
//!
//! This module contains all the struct definitions for configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::*;

// ============================================
// RANKING CONFIG
// ============================================

/// Weights and factors of the query ranking pipeline.
///
/// The description weight is exposed here instead of being hard-coded:
/// historic builds scored descriptions at 1x and at 2x, neither is canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingConfig {
    #[serde(default = "default_name_weight")]
    pub name_weight: f64,
    #[serde(default = "default_category_weight")]
    pub category_weight: f64,
    #[serde(default = "default_keywords_weight")]
    pub keywords_weight: f64,
    #[serde(default = "default_description_weight")]
    pub description_weight: f64,
    #[serde(default = "default_file_weight")]
    pub file_weight: f64,
    /// Minimum token length (chars) before the file origin is scored
    #[serde(default = "default_file_min_token_len")]
    pub file_min_token_len: usize,
    #[serde(default = "default_icon_boost")]
    pub icon_boost: f64,
    #[serde(default = "default_disabled_factor")]
    pub disabled_factor: f64,
    #[serde(default = "default_disabled_sort_offset")]
    pub disabled_sort_offset: f64,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_usage_boost_factor")]
    pub usage_boost_factor: f64,
    #[serde(default = "default_usage_boost_cap")]
    pub usage_boost_cap: f64,
    /// Scorer fuzziness in [0, 1]; None disables fuzzy matching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness: Option<f64>,
}

fn default_name_weight() -> f64 {
    DEFAULT_NAME_WEIGHT
}
fn default_category_weight() -> f64 {
    DEFAULT_CATEGORY_WEIGHT
}
fn default_keywords_weight() -> f64 {
    DEFAULT_KEYWORDS_WEIGHT
}
fn default_description_weight() -> f64 {
    DEFAULT_DESCRIPTION_WEIGHT
}
fn default_file_weight() -> f64 {
    DEFAULT_FILE_WEIGHT
}
fn default_file_min_token_len() -> usize {
    DEFAULT_FILE_MIN_TOKEN_LEN
}
fn default_icon_boost() -> f64 {
    DEFAULT_ICON_BOOST
}
fn default_disabled_factor() -> f64 {
    DEFAULT_DISABLED_FACTOR
}
fn default_disabled_sort_offset() -> f64 {
    DEFAULT_DISABLED_SORT_OFFSET
}
fn default_min_score() -> f64 {
    DEFAULT_MIN_SCORE
}
fn default_usage_boost_factor() -> f64 {
    DEFAULT_USAGE_BOOST_FACTOR
}
fn default_usage_boost_cap() -> f64 {
    DEFAULT_USAGE_BOOST_CAP
}

impl Default for RankingConfig {
    fn default() -> Self {
        RankingConfig {
            name_weight: DEFAULT_NAME_WEIGHT,
            category_weight: DEFAULT_CATEGORY_WEIGHT,
            keywords_weight: DEFAULT_KEYWORDS_WEIGHT,
            description_weight: DEFAULT_DESCRIPTION_WEIGHT,
            file_weight: DEFAULT_FILE_WEIGHT,
            file_min_token_len: DEFAULT_FILE_MIN_TOKEN_LEN,
            icon_boost: DEFAULT_ICON_BOOST,
            disabled_factor: DEFAULT_DISABLED_FACTOR,
            disabled_sort_offset: DEFAULT_DISABLED_SORT_OFFSET,
            min_score: DEFAULT_MIN_SCORE,
            usage_boost_factor: DEFAULT_USAGE_BOOST_FACTOR,
            usage_boost_cap: DEFAULT_USAGE_BOOST_CAP,
            fuzziness: None,
        }
    }
}

impl RankingConfig {
    /// Fuzziness clamped to [0, 1]; NaN is treated as disabled
    pub fn effective_fuzziness(&self) -> Option<f64> {
        self.fuzziness
            .filter(|f| !f.is_nan())
            .map(|f| f.clamp(0.0, 1.0))
    }
}

// ============================================
// QUERY CONFIG
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    /// Maximum number of results returned by a query (default: 10)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

// ============================================
// DEBOUNCE CONFIG
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebounceConfig {
    /// Minimum time between two debounced runs (default: 250ms)
    #[serde(default = "default_debounce_interval_ms")]
    pub interval_ms: u64,
}

fn default_debounce_interval_ms() -> u64 {
    DEFAULT_DEBOUNCE_INTERVAL_MS
}

impl Default for DebounceConfig {
    fn default() -> Self {
        DebounceConfig {
            interval_ms: DEFAULT_DEBOUNCE_INTERVAL_MS,
        }
    }
}

impl DebounceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ============================================
// TRACKING CONFIG
// ============================================

/// Configuration for usage tracking (execution counts and recent history)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingConfig {
    /// Whether usage counts and history are loaded and saved (default: true)
    #[serde(default = "default_tracking_enabled")]
    pub enabled: bool,
    /// Where the usage map is stored (default: ~/.quicklaunch/tracking.json)
    #[serde(default = "default_tracking_path")]
    pub path: String,
    /// Number of recently executed commands remembered (default: 10)
    #[serde(default = "default_history_max_length")]
    pub history_max_length: usize,
}

fn default_tracking_enabled() -> bool {
    DEFAULT_TRACKING_ENABLED
}
fn default_tracking_path() -> String {
    DEFAULT_TRACKING_PATH.to_string()
}
fn default_history_max_length() -> usize {
    DEFAULT_HISTORY_MAX_LENGTH
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            enabled: DEFAULT_TRACKING_ENABLED,
            path: DEFAULT_TRACKING_PATH.to_string(),
            history_max_length: DEFAULT_HISTORY_MAX_LENGTH,
        }
    }
}

impl TrackingConfig {
    /// The tracking path with `~` expanded
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).as_ref())
    }
}

// ============================================
// MAIN CONFIG
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<RankingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce: Option<DebounceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<TrackingConfig>,
    /// Action/validation calls slower than this are logged (milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_callback_ms: Option<u64>,
    /// Extra command manifests loaded by the CLI host
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifests: Vec<String>,
}

impl Config {
    /// Returns the ranking configuration, or defaults if not configured
    pub fn get_ranking(&self) -> RankingConfig {
        self.ranking.clone().unwrap_or_default()
    }

    /// Returns the query configuration, or defaults if not configured
    pub fn get_query(&self) -> QueryConfig {
        self.query.clone().unwrap_or_default()
    }

    /// Returns the debounce configuration, or defaults if not configured
    pub fn get_debounce(&self) -> DebounceConfig {
        self.debounce.clone().unwrap_or_default()
    }

    /// Returns the tracking configuration, or defaults if not configured
    pub fn get_tracking(&self) -> TrackingConfig {
        self.tracking.clone().unwrap_or_default()
    }

    /// Returns the slow-callback threshold
    pub fn get_slow_callback(&self) -> Duration {
        Duration::from_millis(self.slow_callback_ms.unwrap_or(DEFAULT_SLOW_CALLBACK_MS))
    }

    /// Manifest paths with `~` expanded
    pub fn manifest_paths(&self) -> Vec<PathBuf> {
        self.manifests
            .iter()
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
            .collect()
    }
}
