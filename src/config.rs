use anyhow::{ensure, Context, Result};
use ::config::{Config, Environment};
use serde::Deserialize;
use std::time::Duration;

/// Service settings: built-in defaults overridden by environment variables
/// (`LINE_PROVIDER_URL`, `DATABASE_URL`, `SWEEP_INTERVAL_SECS`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub line_provider_url: String,
    pub database_url: String,
    pub bind_addr: String,
    pub sweep_interval_secs: u64,
    pub oracle_timeout_secs: u64,
    pub max_concurrent_lookups: usize,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_env(Environment::default().try_parsing(true))
    }

    pub fn from_env(env: Environment) -> Result<Self> {
        let settings: Settings = Config::builder()
            .set_default("line_provider_url", "http://line_provider:8000")?
            .set_default("database_url", "bets.db")?
            .set_default("bind_addr", "0.0.0.0:8000")?
            .set_default("sweep_interval_secs", 10_i64)?
            .set_default("oracle_timeout_secs", 10_i64)?
            .set_default("max_concurrent_lookups", 8_i64)?
            .add_source(env)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        ensure!(settings.sweep_interval_secs > 0, "SWEEP_INTERVAL_SECS must be positive");
        ensure!(settings.oracle_timeout_secs > 0, "ORACLE_TIMEOUT_SECS must be positive");
        ensure!(settings.max_concurrent_lookups > 0, "MAX_CONCURRENT_LOOKUPS must be positive");

        Ok(settings)
    }

    /// SQLite path with any `sqlite://` scheme stripped.
    pub fn database_path(&self) -> &str {
        self.database_url
            .strip_prefix("sqlite://")
            .unwrap_or(&self.database_url)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }
}
