//! End-to-end scenarios: synthetic price histories through the full
//! pipeline (features -> labels -> walk-forward training -> prediction ->
//! recommendation -> cache document).

use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use stockcast::application::boosting::BoostingParams;
use stockcast::application::pipeline::ForecastPipeline;
use stockcast::application::trainer::TrainerConfig;
use stockcast::config::{CacheConfig, Config, DataConfig, ForecastConfig, SourceMode};
use stockcast::domain::labels::{Direction, Labeler};
use stockcast::domain::ports::MarketDataSource;
use stockcast::domain::recommendation::Action;
use stockcast::infrastructure::mock::{SeriesSpec, SyntheticDataSource};
use uuid::Uuid;

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn temp_cache_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("stockcast_e2e_{}_{}.json", name, Uuid::new_v4()))
}

fn test_config(tickers: Vec<&str>, cache_path: PathBuf, min_class_count: usize) -> Config {
    Config {
        data: DataConfig {
            source_mode: SourceMode::Synthetic,
            data_dir: PathBuf::from("unused"),
            tickers: tickers.into_iter().map(String::from).collect(),
            index_symbol: "^GSPC".to_string(),
            vix_symbol: "^VIX".to_string(),
            macro_series: vec![],
            start_date: start_date(),
        },
        forecast: ForecastConfig {
            horizons: vec![5],
            dead_zone: 0.001,
            confidence_threshold: 0.6,
            trainer: TrainerConfig {
                train_window: 60,
                test_window: 15,
                min_class_count,
                boosting: BoostingParams {
                    rounds: 20,
                    ..Default::default()
                },
            },
        },
        cache: CacheConfig {
            path: cache_path,
            max_age_hours: 24,
        },
    }
}

/// 100 trading days of a constant +0.5% daily return, horizon 5, dead-zone
/// 0.1%: every label in the back half is Up, the trained model predicts
/// P(Up) > 0.9 for the final vector, and tau = 0.6 yields BUY.
#[tokio::test]
async fn test_constant_growth_yields_confident_buy() {
    let source = Arc::new(
        SyntheticDataSource::new(42, 100)
            .with_series("X", SeriesSpec::equity(100.0, 0.005, 0.0))
            .with_series("^GSPC", SeriesSpec::equity(4700.0, 0.0003, 0.0))
            .with_series("^VIX", SeriesSpec::equity(16.0, 0.0, 0.0)),
    );

    // Labels first: the back half of the series must be uniformly Up.
    let prices = source.daily_closes("X", start_date()).await.unwrap();
    let labeler = Labeler::new(5, 0.001);
    for idx in prices.len() / 2..prices.len() - 5 {
        assert_eq!(labeler.label(&prices, idx), Some(Direction::Up));
    }

    let cache_path = temp_cache_path("buy");
    // A one-class world is genuinely learnable here, so the degenerate-window
    // guard is off for this scenario.
    let config = test_config(vec!["X"], cache_path.clone(), 0);
    let pipeline = ForecastPipeline::new(source.clone(), source.clone(), config);

    let document = pipeline.run().await.unwrap();
    let forecast = document.get("X").expect("X must be modeled");
    let horizon = forecast.horizons.get("one_week").expect("horizon 5");

    assert!(horizon.probabilities.is_normalized());
    assert!(
        horizon.probabilities.up > 0.9,
        "P(Up) was {}",
        horizon.probabilities.up
    );
    assert_eq!(horizon.recommendation, Action::Buy);
    assert!(horizon.confidence > 0.9);

    let _ = std::fs::remove_file(cache_path);
}

/// Every probability triple in a document is a valid distribution.
#[tokio::test]
async fn test_probability_triples_are_normalized() {
    let source = Arc::new(
        SyntheticDataSource::new(7, 160)
            .with_series("A", SeriesSpec::equity(50.0, 0.001, 0.02))
            .with_series("B", SeriesSpec::equity(80.0, -0.0005, 0.025))
            .with_series("^GSPC", SeriesSpec::equity(4700.0, 0.0003, 0.008))
            .with_series("^VIX", SeriesSpec::equity(16.0, 0.0, 0.03)),
    );

    let cache_path = temp_cache_path("norm");
    let config = test_config(vec!["A", "B"], cache_path.clone(), 3);
    let pipeline = ForecastPipeline::new(source.clone(), source.clone(), config);

    let document = pipeline.run().await.unwrap();
    for forecast in document.tickers.values() {
        for horizon in forecast.horizons.values() {
            let p = &horizon.probabilities;
            assert!((p.sum() - 1.0).abs() <= 1e-6);
            for component in [p.down, p.flat, p.up] {
                assert!((0.0..=1.0).contains(&component));
            }
        }
    }

    let _ = std::fs::remove_file(cache_path);
}

/// A ticker with fewer history points than one train+test span is reported
/// as not modeled -- absent from the document, never a fabricated HOLD.
#[tokio::test]
async fn test_short_history_is_unavailable_not_hold() {
    let source = Arc::new(
        SyntheticDataSource::new(11, 100)
            .with_series("X", SeriesSpec::equity(100.0, 0.002, 0.01))
            // Listed ~21 business days before the end of the span.
            .with_series("TINY", SeriesSpec::equity(10.0, 0.002, 0.01).listed_after(110))
            .with_series("^GSPC", SeriesSpec::equity(4700.0, 0.0003, 0.005))
            .with_series("^VIX", SeriesSpec::equity(16.0, 0.0, 0.01)),
    );

    let cache_path = temp_cache_path("tiny");
    let config = test_config(vec!["X", "TINY"], cache_path.clone(), 0);
    let pipeline = ForecastPipeline::new(source.clone(), source.clone(), config);

    let document = pipeline.run().await.unwrap();

    assert!(document.get("X").is_some(), "long-history ticker still modeled");
    assert!(
        document.get("TINY").is_none(),
        "short-history ticker must be absent, not defaulted"
    );

    let _ = std::fs::remove_file(cache_path);
}

/// A ticker whose data source errors is skipped for the cycle; the rest of
/// the run completes.
#[tokio::test]
async fn test_unavailable_ticker_skipped_for_cycle() {
    let source = Arc::new(
        SyntheticDataSource::new(13, 100)
            .with_series("X", SeriesSpec::equity(100.0, 0.002, 0.01))
            // "MISSING" is never registered: the source reports not-found.
            .with_series("^GSPC", SeriesSpec::equity(4700.0, 0.0003, 0.005))
            .with_series("^VIX", SeriesSpec::equity(16.0, 0.0, 0.01)),
    );

    let cache_path = temp_cache_path("skip");
    let config = test_config(vec!["X", "MISSING"], cache_path.clone(), 0);
    let pipeline = ForecastPipeline::new(source.clone(), source.clone(), config);

    let document = pipeline.run().await.unwrap();
    assert!(document.get("X").is_some());
    assert!(document.get("MISSING").is_none());

    let _ = std::fs::remove_file(cache_path);
}
