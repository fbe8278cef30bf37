//! Forecasting parameters: horizons, labeling dead-zone, confidence
//! threshold, and the walk-forward trainer's window sizes.

use crate::application::boosting::BoostingParams;
use crate::application::trainer::TrainerConfig;
use anyhow::{Context, Result, bail};
use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ForecastConfig {
    /// Horizons in trading days (dashboard tabs: 1, 5, 20).
    pub horizons: Vec<usize>,
    /// Symmetric dead-zone around zero forward return; |r| <= dead_zone is
    /// Flat. Recorded on every model artifact.
    pub dead_zone: f64,
    /// Minimum winning-class probability before BUY/SHORT is issued.
    pub confidence_threshold: f64,
    pub trainer: TrainerConfig,
}

impl ForecastConfig {
    pub fn from_env() -> Result<Self> {
        let horizons: Vec<usize> = env::var("FORECAST_HORIZONS")
            .unwrap_or_else(|_| "1,5,20".to_string())
            .split(',')
            .map(|s| {
                s.trim()
                    .parse::<usize>()
                    .context("Failed to parse FORECAST_HORIZONS")
            })
            .collect::<Result<_>>()?;
        if horizons.is_empty() || horizons.contains(&0) {
            bail!("FORECAST_HORIZONS must list positive trading-day counts");
        }

        let dead_zone = Self::parse_f64("DEAD_ZONE", 0.005)?;
        if dead_zone < 0.0 {
            bail!("DEAD_ZONE must be non-negative");
        }

        let confidence_threshold = Self::parse_f64("CONFIDENCE_THRESHOLD", 0.6)?;
        if !(0.0..=1.0).contains(&confidence_threshold) {
            bail!("CONFIDENCE_THRESHOLD must be within [0, 1]");
        }
        if confidence_threshold <= 0.5 {
            warn!(
                confidence_threshold,
                "Threshold <= 0.5 allows both directional classes to clear it"
            );
        }

        let trainer = TrainerConfig {
            train_window: Self::parse_usize("TRAIN_WINDOW", 120)?,
            test_window: Self::parse_usize("TEST_WINDOW", 21)?,
            min_class_count: Self::parse_usize("MIN_CLASS_COUNT", 5)?,
            boosting: BoostingParams {
                rounds: Self::parse_usize("BOOSTING_ROUNDS", 50)?,
                learning_rate: Self::parse_f64("LEARNING_RATE", 0.1)?,
                max_depth: Self::parse_usize("MAX_TREE_DEPTH", 3)? as u16,
                min_samples_leaf: Self::parse_usize("MIN_SAMPLES_LEAF", 5)?,
                min_samples_split: Self::parse_usize("MIN_SAMPLES_SPLIT", 10)?,
            },
        };
        if trainer.train_window == 0 || trainer.test_window == 0 {
            bail!("TRAIN_WINDOW and TEST_WINDOW must be positive");
        }

        Ok(Self {
            horizons,
            dead_zone,
            confidence_threshold,
            trainer,
        })
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_f64(key: &str, default: f64) -> Result<f64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<f64>()
            .context(format!("Failed to parse {}", key))
    }
}
