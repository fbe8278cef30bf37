//! Configuration module for stockcast.
//!
//! Structured configuration loading from environment variables, organized by
//! concern: data universe, forecasting parameters, and result cache.

mod cache_config;
mod data_config;
mod forecast_config;

pub use cache_config::CacheConfig;
pub use data_config::{DataConfig, MacroSpec, SourceMode};
pub use forecast_config::ForecastConfig;

use anyhow::{Context, Result};

/// Main application configuration, aggregated from the sub-modules.
#[derive(Debug, Clone)]
pub struct Config {
    pub data: DataConfig,
    pub forecast: ForecastConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let data = DataConfig::from_env().context("Failed to load data config")?;
        let forecast = ForecastConfig::from_env().context("Failed to load forecast config")?;
        let cache = CacheConfig::from_env().context("Failed to load cache config")?;

        Ok(Self {
            data,
            forecast,
            cache,
        })
    }
}
