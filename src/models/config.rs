//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Ten years.
const MAX_RATING_TTL_HOURS: u64 = 24 * 365 * 10;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API access settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Scheduling and worker pool behavior
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Database location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log filter used when `--verbose` is not given
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.credential_header.trim().is_empty() {
            return Err(AppError::validation("api.credential_header is empty"));
        }
        if self.api.regional_base_url.trim().is_empty() {
            return Err(AppError::validation("api.regional_base_url is empty"));
        }
        if self.api.platform_base_url.trim().is_empty() {
            return Err(AppError::validation("api.platform_base_url is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.harvest.page_size == 0 {
            return Err(AppError::validation("harvest.page_size must be > 0"));
        }
        if self.harvest.max_concurrent == 0 {
            return Err(AppError::validation("harvest.max_concurrent must be > 0"));
        }
        if self.harvest.max_failure_percent > 100 {
            return Err(AppError::validation(
                "harvest.max_failure_percent must be <= 100",
            ));
        }
        if self.storage.database_path.trim().is_empty() {
            return Err(AppError::validation("storage.database_path is empty"));
        }
        Ok(())
    }
}

/// Remote API access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Static credential. Falls back to the `api_key_env` variable when absent.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable holding the credential
    #[serde(default = "defaults::api_key_env")]
    pub api_key_env: String,

    /// Header the credential is attached under
    #[serde(default = "defaults::credential_header")]
    pub credential_header: String,

    /// Host serving match history (regional routing)
    #[serde(default = "defaults::regional_base_url")]
    pub regional_base_url: String,

    /// Host serving league entries (platform routing)
    #[serde(default = "defaults::platform_base_url")]
    pub platform_base_url: String,

    /// Queue filter for match listings; `None` lists every queue
    #[serde(default = "defaults::queue")]
    pub queue: Option<u32>,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Consecutive 429 responses tolerated for a single request
    #[serde(default = "defaults::max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
}

impl ApiConfig {
    /// Resolve the credential from the config file or the environment.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.trim().to_string());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AppError::config(format!(
                    "no api.api_key configured and {} is not set",
                    self.api_key_env
                ))
            })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: defaults::api_key_env(),
            credential_header: defaults::credential_header(),
            regional_base_url: defaults::regional_base_url(),
            platform_base_url: defaults::platform_base_url(),
            queue: defaults::queue(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_rate_limit_retries: defaults::max_rate_limit_retries(),
        }
    }
}

/// Scheduling and worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Match ids requested per listing page
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Matches processed concurrently within a round
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Ratings younger than this are not fetched again
    #[serde(default = "defaults::rating_ttl_hours")]
    pub rating_ttl_hours: u64,

    /// Pause after a failed round, in milliseconds
    #[serde(default = "defaults::idle_delay")]
    pub idle_delay_ms: u64,

    /// Retryable failures above this share of a batch hold the player's freshness
    #[serde(default = "defaults::max_failure_percent")]
    pub max_failure_percent: u8,

    /// Holds in a row before freshness advances regardless
    #[serde(default = "defaults::max_consecutive_holds")]
    pub max_consecutive_holds: u32,

    /// Bootstrap player used instead of the apex ladder lookup
    #[serde(default)]
    pub seed_player: Option<String>,
}

impl HarvestConfig {
    pub fn rating_ttl(&self) -> chrono::Duration {
        let hours = self.rating_ttl_hours.min(MAX_RATING_TTL_HOURS);
        chrono::Duration::hours(hours as i64)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::page_size(),
            max_concurrent: defaults::max_concurrent(),
            rating_ttl_hours: defaults::rating_ttl_hours(),
            idle_delay_ms: defaults::idle_delay(),
            max_failure_percent: defaults::max_failure_percent(),
            max_consecutive_holds: defaults::max_consecutive_holds(),
            seed_player: None,
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file
    #[serde(default = "defaults::database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: defaults::database_path(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // API defaults
    pub fn api_key_env() -> String {
        "RIOT_API_KEY".into()
    }
    pub fn credential_header() -> String {
        "X-Riot-Token".into()
    }
    pub fn regional_base_url() -> String {
        "https://americas.api.riotgames.com/".into()
    }
    pub fn platform_base_url() -> String {
        "https://br1.api.riotgames.com/".into()
    }
    pub fn queue() -> Option<u32> {
        // Ranked solo/duo
        Some(420)
    }
    pub fn user_agent() -> String {
        "harvester/0.1".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn max_rate_limit_retries() -> u32 {
        10
    }

    // Harvest defaults
    pub fn page_size() -> usize {
        100
    }
    pub fn max_concurrent() -> usize {
        5
    }
    pub fn rating_ttl_hours() -> u64 {
        24
    }
    pub fn idle_delay() -> u64 {
        5_000
    }
    pub fn max_failure_percent() -> u8 {
        20
    }
    pub fn max_consecutive_holds() -> u32 {
        3
    }

    // Storage defaults
    pub fn database_path() -> String {
        "data/harvest.db".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.api.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.harvest.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.harvest.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_percent_above_hundred() {
        let mut config = Config::default();
        config.harvest.max_failure_percent = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            api_key = "RGAPI-test"

            [harvest]
            max_concurrent = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.api.api_key.as_deref(), Some("RGAPI-test"));
        assert_eq!(config.api.credential_header, "X-Riot-Token");
        assert_eq!(config.api.queue, Some(420));
        assert_eq!(config.harvest.max_concurrent, 2);
        assert_eq!(config.harvest.page_size, 100);
        assert_eq!(config.storage.database_path, "data/harvest.db");
    }

    #[test]
    fn configured_api_key_wins_over_environment() {
        let api = ApiConfig {
            api_key: Some(" RGAPI-inline ".into()),
            api_key_env: "HARVESTER_TEST_UNSET_VARIABLE".into(),
            ..ApiConfig::default()
        };
        assert_eq!(api.resolve_api_key().unwrap(), "RGAPI-inline");
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let api = ApiConfig {
            api_key: None,
            api_key_env: "HARVESTER_TEST_UNSET_VARIABLE".into(),
            ..ApiConfig::default()
        };
        assert!(matches!(api.resolve_api_key(), Err(AppError::Config(_))));
    }

    #[test]
    fn load_reads_file_and_falls_back_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage]\ndatabase_path = \"x/h.db\"\n").unwrap();

        assert_eq!(Config::load(&path).unwrap().storage.database_path, "x/h.db");

        let missing = Config::load_or_default(dir.path().join("absent.toml"));
        assert_eq!(missing.storage.database_path, "data/harvest.db");
    }

    #[test]
    fn rating_ttl_is_expressed_in_hours() {
        let harvest = HarvestConfig::default();
        assert_eq!(harvest.rating_ttl(), chrono::Duration::days(1));
    }

    #[test]
    fn huge_rating_ttl_is_capped() {
        let harvest = HarvestConfig {
            rating_ttl_hours: u64::MAX,
            ..HarvestConfig::default()
        };
        assert_eq!(
            harvest.rating_ttl(),
            chrono::Duration::hours(MAX_RATING_TTL_HOURS as i64)
        );
    }
}
