//! stockcast - cache-gated stock direction forecasts.
//!
//! Runs the forecasting pipeline (or serves the cached document when it is
//! still fresh) and prints per-ticker recommendations, mirroring the daily
//! launcher flow: check cache age, recompute only when stale, hand the
//! document to the dashboard.
//!
//! # Usage
//! ```sh
//! DATA_SOURCE=synthetic cargo run -- --json
//! ```
//!
//! # Environment Variables
//! - `DATA_SOURCE` - 'csv' (ETL exports in DATA_DIR) or 'synthetic' (default: csv)
//! - `TICKERS` - comma-separated universe (default: NVDA,ORCL,THAR,SOFI,RR,RGTI)
//! - `CACHE_MAX_AGE_HOURS` - freshness window for cached results (default: 24)

use anyhow::Result;
use chrono::{Datelike, Utc};
use clap::Parser;
use std::sync::Arc;
use stockcast::application::cache::ResultCache;
use stockcast::application::pipeline::ForecastPipeline;
use stockcast::config::{Config, SourceMode};
use stockcast::domain::ports::{MacroDataSource, MarketDataSource};
use stockcast::infrastructure::cache_store::CacheStore;
use stockcast::infrastructure::csv_source::CsvDataSource;
use stockcast::infrastructure::mock::{SeriesSpec, SyntheticDataSource};
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force a pipeline run even when the cached document is fresh
    #[arg(long)]
    refresh: bool,

    /// Print only this ticker's forecast
    #[arg(long)]
    ticker: Option<String>,

    /// Emit the full cache document as JSON instead of the summary table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    info!(
        "stockcast {} | {} tickers, horizons {:?}",
        env!("CARGO_PKG_VERSION"),
        config.data.tickers.len(),
        config.forecast.horizons
    );

    let (market, macros) = build_sources(&config);
    let store = CacheStore::new(config.cache.path.clone());
    let max_age = if args.refresh {
        chrono::Duration::zero()
    } else {
        config.cache.max_age()
    };
    let pipeline = ForecastPipeline::new(market, macros, config);
    let cache = ResultCache::new(pipeline, store);

    let document = cache.get_or_refresh(max_age).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(document.as_ref())?);
        return Ok(());
    }

    if let Some(run_date) = document.model_run_date {
        println!(
            "Model run: {} (generated {})",
            run_date,
            document.generated_at.format("%Y-%m-%d %H:%M UTC")
        );
    }

    let tickers: Vec<&str> = match &args.ticker {
        Some(t) => vec![t.as_str()],
        None => document.tickers.keys().map(|k| k.as_str()).collect(),
    };

    for ticker in tickers {
        match document.get(ticker) {
            Some(forecast) => {
                println!(
                    "\n{}  close {:.2} on {}",
                    forecast.ticker, forecast.last_close, forecast.as_of
                );
                for (name, horizon) in &forecast.horizons {
                    println!(
                        "  {:<9} {}  (conf {:.1}%)  Down {:.1}% / Flat {:.1}% / Up {:.1}%  [backtest acc {}]",
                        name,
                        horizon.recommendation,
                        horizon.confidence * 100.0,
                        horizon.probabilities.down * 100.0,
                        horizon.probabilities.flat * 100.0,
                        horizon.probabilities.up * 100.0,
                        horizon
                            .backtest
                            .mean_accuracy
                            .map(|a| format!("{:.1}%", a * 100.0))
                            .unwrap_or_else(|| "n/a".to_string()),
                    );
                }
            }
            None => println!("\n{ticker}  not yet modeled"),
        }
    }

    Ok(())
}

fn build_sources(config: &Config) -> (Arc<dyn MarketDataSource>, Arc<dyn MacroDataSource>) {
    match config.data.source_mode {
        SourceMode::Csv => {
            let source = Arc::new(CsvDataSource::new(config.data.data_dir.clone()));
            (
                source.clone() as Arc<dyn MarketDataSource>,
                source as Arc<dyn MacroDataSource>,
            )
        }
        SourceMode::Synthetic => {
            let today = Utc::now().date_naive();
            let span_days = (today - config.data.start_date).num_days().max(365);
            // Calendar days to business days, plus slack for the macro
            // series' earlier fetch start.
            let business_days = (span_days * 5 / 7 + 120) as usize;

            let mut source = SyntheticDataSource::new(20240601, business_days)
                .with_series(&config.data.index_symbol, SeriesSpec::equity(4700.0, 0.0003, 0.008))
                .with_series(&config.data.vix_symbol, SeriesSpec::equity(16.0, 0.0, 0.03));
            for (i, ticker) in config.data.tickers.iter().enumerate() {
                let drift = 0.0002 + 0.0002 * (i % 5) as f64;
                let vol = 0.012 + 0.004 * (i % 3) as f64;
                source = source.with_series(
                    ticker,
                    SeriesSpec::equity(40.0 + 25.0 * i as f64, drift, vol),
                );
            }
            for spec in &config.data.macro_series {
                let level = match spec.series_id.as_str() {
                    "FEDFUNDS" => 5.25,
                    "UNRATE" => 3.9,
                    _ => 300.0 + (today.year() % 10) as f64,
                };
                source = source.with_series(&spec.series_id, SeriesSpec::monthly(level, 0.0001));
            }

            let source = Arc::new(source);
            (
                source.clone() as Arc<dyn MarketDataSource>,
                source as Arc<dyn MacroDataSource>,
            )
        }
    }
}
