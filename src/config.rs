// src/config.rs - alarmtrail configuration

use crate::error::{HistoryError, Result};
use crate::extractor::IdentityMatch;
use crate::fetcher::DEFAULT_PREFETCH_THRESHOLD;
use crate::query::{QueryParameterBuilder, DEFAULT_PAGE_SIZE};
use crate::time_window::{TimeWindowResolver, FALLBACK_HOURS};
use crate::validation::{DEFAULT_MAX_RANGE_DAYS, MAX_RANGE_DAYS_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding `api.base_url`
pub const ENV_BASE_URL: &str = "ALARMTRAIL_BASE_URL";

/// Environment variable supplying the bearer credential
pub const ENV_TOKEN: &str = "ALARMTRAIL_TOKEN";

// ============================================================================
// MAIN CONFIGURATION
// ============================================================================

/// Main alarmtrail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend paging API
    pub api: ApiConfig,

    /// Query and pagination behaviour
    #[serde(default)]
    pub query: QueryConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL; `/alarm-history` is appended
    pub base_url: String,

    /// Upper bound for a single page request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Pre-resolved bearer credential (prefer the environment variable)
    #[serde(default)]
    pub bearer_token: Option<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Query construction and paging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Longest accepted custom range
    #[serde(default = "default_max_range_days")]
    pub max_custom_range_days: i64,

    /// Window used when a custom range is rejected
    #[serde(default = "default_fallback_hours")]
    pub fallback_hours: u32,

    /// Items from the end of the visible list that trigger the next page
    #[serde(default = "default_prefetch_threshold")]
    pub prefetch_threshold: usize,

    #[serde(default)]
    pub identity_match: IdentityMatch,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_custom_range_days: default_max_range_days(),
            fallback_hours: default_fallback_hours(),
            prefetch_threshold: default_prefetch_threshold(),
            identity_match: IdentityMatch::default(),
        }
    }
}

impl QueryConfig {
    pub fn builder(&self) -> QueryParameterBuilder {
        QueryParameterBuilder::new(
            self.page_size,
            TimeWindowResolver::new(self.fallback_hours, self.max_custom_range_days),
        )
    }
}

// ============================================================================
// LOADING AND VALIDATION
// ============================================================================

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        debug!("Loaded configuration from {}", path.as_ref().display());
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ALARMTRAIL_BASE_URL` / `ALARMTRAIL_TOKEN` when set.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        self.apply_overrides(
            std::env::var(ENV_BASE_URL).ok(),
            std::env::var(ENV_TOKEN).ok(),
        );
        self.validate()?;
        Ok(self)
    }

    fn apply_overrides(&mut self, base_url: Option<String>, token: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.api.bearer_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if url.is_empty() {
            return Err(HistoryError::Config("api.base_url must not be empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(HistoryError::Config(format!(
                "api.base_url '{}' must be an http(s) URL",
                url
            )));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(HistoryError::Config("api.request_timeout_secs must be positive".into()));
        }
        if self.query.page_size == 0 {
            return Err(HistoryError::Config("query.page_size must be positive".into()));
        }
        if !(1..=MAX_RANGE_DAYS_LIMIT).contains(&self.query.max_custom_range_days) {
            return Err(HistoryError::Config(format!(
                "query.max_custom_range_days must be between 1 and {}",
                MAX_RANGE_DAYS_LIMIT
            )));
        }
        if self.query.fallback_hours == 0 {
            return Err(HistoryError::Config("query.fallback_hours must be positive".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }
}

fn default_request_timeout() -> u64 { 30 }
fn default_user_agent() -> String { format!("alarmtrail/{}", crate::VERSION) }
fn default_page_size() -> u32 { DEFAULT_PAGE_SIZE }
fn default_max_range_days() -> i64 { DEFAULT_MAX_RANGE_DAYS }
fn default_fallback_hours() -> u32 { FALLBACK_HOURS }
fn default_prefetch_threshold() -> usize { DEFAULT_PREFETCH_THRESHOLD }
