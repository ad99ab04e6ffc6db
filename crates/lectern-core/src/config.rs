use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::constants::{
    DEFAULT_CACHE_HORIZON_DAYS, DEFAULT_CACHE_REFRESH_SECS, DEFAULT_JOINED_TTL_SECS,
};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub store: StoreConfig,
    pub source: SourceConfig,
    pub cache: CacheConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Path to the rule/booking seed document the daemon rebuilds from.
    pub seed_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Days of availability covered by one rebuild window.
    pub horizon_days: u32,
    /// Seconds between scheduled rebuilds.
    pub refresh_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// TTL in seconds for joined-session state.
    pub joined_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file and environment variables into a `Settings`.
    /// Environment variables take precedence over `.env` file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("store.url", "redis://127.0.0.1:6379")?
            .set_default("source.seed_file", "availability-seed.json")?
            .set_default("cache.horizon_days", DEFAULT_CACHE_HORIZON_DAYS)?
            .set_default("cache.refresh_secs", DEFAULT_CACHE_REFRESH_SECS)?
            .set_default("session.joined_ttl_secs", DEFAULT_JOINED_TTL_SECS)?
            .set_default("logging.level", "debug")?
            // Env file
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Rejects settings no daemon run can do anything useful with.
    ///
    /// ## Errors
    /// Returns [`CoreError::InvalidConfiguration`] when the cache horizon or
    /// the refresh period is zero.
    pub fn validate(&self) -> CoreResult<()> {
        if self.cache.horizon_days == 0 {
            return Err(CoreError::InvalidConfiguration(
                "cache.horizon_days must be at least 1".to_owned(),
            ));
        }
        if self.cache.refresh_secs == 0 {
            return Err(CoreError::InvalidConfiguration(
                "cache.refresh_secs must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
