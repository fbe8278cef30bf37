//! Result-cache configuration: where the forecast document lives and how
//! long it stays fresh.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub path: PathBuf,
    /// Entries older than this trigger a refresh; younger ones are served
    /// unchanged.
    pub max_age_hours: u64,
}

impl CacheConfig {
    pub fn from_env() -> Result<Self> {
        let path = PathBuf::from(
            env::var("CACHE_PATH").unwrap_or_else(|_| "data/forecast_cache.json".to_string()),
        );
        let max_age_hours = env::var("CACHE_MAX_AGE_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse::<u64>()
            .context("Failed to parse CACHE_MAX_AGE_HOURS")?;

        Ok(Self {
            path,
            max_age_hours,
        })
    }

    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_age_hours as i64)
    }
}
