use crate::application::features::FeatureBuilder;
use crate::application::predictor::MultiHorizonPredictor;
use crate::application::trainer::WalkForwardTrainer;
use crate::config::Config;
use crate::domain::errors::ForecastError;
use crate::domain::labels::Labeler;
use crate::domain::ports::{MacroDataSource, MarketDataSource};
use crate::domain::prediction::{CacheDocument, HorizonForecast, TickerForecast, horizon_name};
use crate::domain::recommendation::recommend;
use crate::domain::series::{AlignedSeries, MacroSeries, SeriesBundle};
use anyhow::{Context, Result};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Runs the full forecasting batch: fetch series, build features, walk
/// forward per (ticker, horizon), predict, recommend, and assemble the cache
/// document.
///
/// Market-wide inputs (index, volatility index, macro indicators) are
/// required: losing them fails the run and the stale cache entry keeps being
/// served. A single ticker's source failure only skips that ticker for the
/// cycle.
pub struct ForecastPipeline {
    market: Arc<dyn MarketDataSource>,
    macros: Arc<dyn MacroDataSource>,
    config: Arc<Config>,
}

impl ForecastPipeline {
    pub fn new(
        market: Arc<dyn MarketDataSource>,
        macros: Arc<dyn MacroDataSource>,
        config: Config,
    ) -> Self {
        Self {
            market,
            macros,
            config: Arc::new(config),
        }
    }

    pub async fn run(&self) -> Result<CacheDocument> {
        let start = self.config.data.start_date;
        info!(
            tickers = self.config.data.tickers.len(),
            %start,
            "Starting forecast pipeline run"
        );

        let index = self
            .market
            .daily_closes(&self.config.data.index_symbol, start)
            .await
            .context("Market index series is required for every forecast")?;
        let vix = self
            .market
            .daily_closes(&self.config.data.vix_symbol, start)
            .await
            .context("Volatility index series is required for every forecast")?;

        // Macro reads go back an extra year so YoY transforms are defined
        // from the first trading day onward.
        let macro_start = start - chrono::Duration::days(400);
        let mut macro_series = Vec::with_capacity(self.config.data.macro_series.len());
        for spec in &self.config.data.macro_series {
            let series = self
                .macros
                .indicator(&spec.series_id, macro_start)
                .await
                .with_context(|| format!("Macro series {} is required", spec.series_id))?;
            macro_series.push(MacroSeries {
                name: spec.name.clone(),
                transform: spec.transform,
                series,
            });
        }

        // Per-ticker fetch; an unavailable ticker is skipped for this cycle.
        let mut fetched: Vec<(String, AlignedSeries)> = Vec::new();
        for ticker in &self.config.data.tickers {
            match self.market.daily_closes(ticker, start).await {
                Ok(prices) => fetched.push((ticker.clone(), prices)),
                Err(e) if e.is_recoverable() => {
                    warn!(ticker = %ticker, error = %e, "Skipping ticker for this cycle");
                }
                Err(e) => return Err(e).context("Market data source failed"),
            }
        }

        // Training is CPU-bound and independent across tickers.
        let config = self.config.clone();
        let tickers: BTreeMap<String, TickerForecast> = tokio::task::spawn_blocking(move || {
            fetched
                .into_par_iter()
                .filter_map(|(ticker, prices)| {
                    match forecast_ticker(
                        &config,
                        &ticker,
                        prices,
                        index.clone(),
                        vix.clone(),
                        macro_series.clone(),
                    ) {
                        Ok(forecast) => Some((ticker, forecast)),
                        Err(e) if e.is_recoverable() => {
                            warn!(ticker = %ticker, error = %e, "Ticker not modeled this cycle");
                            None
                        }
                        Err(e) => {
                            error!(ticker = %ticker, error = %e, "Ticker forecast failed");
                            None
                        }
                    }
                })
                .collect()
        })
        .await
        .context("Forecast worker pool panicked")?;

        let model_run_date = tickers.values().map(|t| t.as_of).max();
        let document = CacheDocument {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            model_run_date,
            tickers,
        };

        info!(
            run_id = %document.run_id,
            modeled = document.tickers.len(),
            "Pipeline run complete"
        );
        Ok(document)
    }
}

/// Forecast every configured horizon for one ticker. Horizons without enough
/// history or without a fittable window are absent from the result; a ticker
/// with no available horizon at all is reported as not modeled.
fn forecast_ticker(
    config: &Config,
    ticker: &str,
    prices: AlignedSeries,
    index: AlignedSeries,
    vix: AlignedSeries,
    macros: Vec<MacroSeries>,
) -> Result<TickerForecast, ForecastError> {
    let bundle = SeriesBundle::assemble(ticker, prices, index, vix, macros).ok_or_else(|| {
        ForecastError::DataUnavailable {
            symbol: ticker.to_string(),
            reason: "no overlap with the reference trading calendar".to_string(),
        }
    })?;

    let features = FeatureBuilder::build_all(&bundle);
    let latest = features
        .last()
        .cloned()
        .ok_or_else(|| ForecastError::InsufficientHistory {
            symbol: ticker.to_string(),
            have: 0,
            need: config.forecast.trainer.train_window + config.forecast.trainer.test_window,
        })?;
    let (as_of, last_close) = match bundle.prices.last() {
        Some(last) => last,
        None => {
            return Err(ForecastError::DataUnavailable {
                symbol: ticker.to_string(),
                reason: "empty price series after alignment".to_string(),
            });
        }
    };

    let trainer = WalkForwardTrainer::new(config.forecast.trainer.clone());
    let dead_zone = config.forecast.dead_zone;
    let mut horizons = BTreeMap::new();

    for &horizon in &config.forecast.horizons {
        let labeler = Labeler::new(horizon, dead_zone);
        let rows: Vec<_> = features
            .iter()
            .filter_map(|fv| {
                let idx = bundle.prices.index_of(fv.date())?;
                let label = labeler.label(&bundle.prices, idx)?;
                Some((fv.clone(), label))
            })
            .collect();

        let outcome = match trainer.run(ticker, horizon, dead_zone, &rows) {
            Ok(outcome) => outcome,
            Err(e @ ForecastError::InsufficientHistory { .. }) => {
                info!(ticker, horizon, error = %e, "Horizon unavailable");
                continue;
            }
            Err(e) => {
                warn!(ticker, horizon, error = %e, "Walk-forward failed; horizon unavailable");
                continue;
            }
        };

        let Some(artifact) = outcome.artifact else {
            info!(
                ticker,
                horizon, "No fittable training window; horizon unavailable"
            );
            continue;
        };

        let probabilities = match MultiHorizonPredictor::predict(&artifact, &latest) {
            Ok(triple) => triple,
            Err(e) => {
                // Prediction for this horizon is aborted; consumers keep
                // reading whatever the previous cycle published.
                error!(ticker, horizon, error = %e, "Prediction aborted");
                continue;
            }
        };

        let recommendation = recommend(&probabilities, config.forecast.confidence_threshold);
        horizons.insert(
            horizon_name(horizon),
            HorizonForecast {
                horizon_days: horizon,
                probabilities,
                recommendation: recommendation.action,
                confidence: recommendation.confidence,
                backtest: outcome.report.summary(),
            },
        );
    }

    if horizons.is_empty() {
        return Err(ForecastError::InsufficientHistory {
            symbol: ticker.to_string(),
            have: features.len(),
            need: config.forecast.trainer.train_window
                + config.forecast.trainer.test_window
                + config.forecast.horizons.iter().min().copied().unwrap_or(1),
        });
    }

    Ok(TickerForecast {
        ticker: ticker.to_string(),
        as_of,
        last_close,
        horizons,
    })
}
