use crate::domain::labels::Direction;
use crate::domain::recommendation::Action;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Tolerance for the "probabilities sum to 1" invariant.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Normalized class probabilities for one (ticker, horizon).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityTriple {
    pub down: f64,
    pub flat: f64,
    pub up: f64,
}

impl ProbabilityTriple {
    pub fn new(down: f64, flat: f64, up: f64) -> Self {
        Self { down, flat, up }
    }

    pub fn sum(&self) -> f64 {
        self.down + self.flat + self.up
    }

    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= PROBABILITY_TOLERANCE
            && [self.down, self.flat, self.up]
                .iter()
                .all(|p| (0.0..=1.0).contains(p) && p.is_finite())
    }

    pub fn of(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Down => self.down,
            Direction::Flat => self.flat,
            Direction::Up => self.up,
        }
    }

    /// Winning class and its probability. Ties resolve Down < Flat < Up by
    /// taking the last maximum, which never matters for normalized triples
    /// compared under a threshold > 0.5.
    pub fn max_class(&self) -> (Direction, f64) {
        let mut best = (Direction::Down, self.down);
        if self.flat >= best.1 {
            best = (Direction::Flat, self.flat);
        }
        if self.up >= best.1 {
            best = (Direction::Up, self.up);
        }
        best
    }
}

/// Human-readable horizon key used in the cache document, matching the
/// dashboard's tabs.
pub fn horizon_name(days: usize) -> String {
    match days {
        1 => "next_day".to_string(),
        5 => "one_week".to_string(),
        20 => "one_month".to_string(),
        d => format!("{d}d"),
    }
}

/// Backtest summary carried alongside each horizon's probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    /// Mean of per-window out-of-sample accuracies.
    pub mean_accuracy: Option<f64>,
    pub evaluated_windows: usize,
    pub skipped_windows: usize,
}

/// One horizon's forecast for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonForecast {
    pub horizon_days: usize,
    pub probabilities: ProbabilityTriple,
    pub recommendation: Action,
    /// Probability of the class that drove the recommendation.
    pub confidence: f64,
    pub backtest: BacktestSummary,
}

/// Everything cached for one ticker. Horizons with no trained model are
/// absent from the map ("unavailable"), never defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerForecast {
    pub ticker: String,
    /// Date of the most recent feature vector the forecasts were made from.
    pub as_of: NaiveDate,
    pub last_close: f64,
    pub horizons: BTreeMap<String, HorizonForecast>,
}

/// The single structured document the presentation layer reads. Replaced
/// wholesale by each completed pipeline run, never partially updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheDocument {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// As-of trading date of the run (the dashboard's "model run" caption).
    pub model_run_date: Option<NaiveDate>,
    pub tickers: BTreeMap<String, TickerForecast>,
}

impl CacheDocument {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.generated_at
    }

    /// Consumer read contract: the cached bundle for `ticker`, unmodified.
    /// None means "not yet modeled", distinct from "modeled with HOLD".
    pub fn get(&self, ticker: &str) -> Option<&TickerForecast> {
        self.tickers.get(ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_check() {
        let good = ProbabilityTriple::new(0.2, 0.3, 0.5);
        assert!(good.is_normalized());

        let off = ProbabilityTriple::new(0.2, 0.3, 0.6);
        assert!(!off.is_normalized());

        let negative = ProbabilityTriple::new(-0.1, 0.6, 0.5);
        assert!(!negative.is_normalized());
    }

    #[test]
    fn test_max_class() {
        let triple = ProbabilityTriple::new(0.7, 0.2, 0.1);
        assert_eq!(triple.max_class(), (Direction::Down, 0.7));

        let triple = ProbabilityTriple::new(0.1, 0.2, 0.7);
        assert_eq!(triple.max_class(), (Direction::Up, 0.7));
    }

    #[test]
    fn test_horizon_names_match_dashboard_tabs() {
        assert_eq!(horizon_name(1), "next_day");
        assert_eq!(horizon_name(5), "one_week");
        assert_eq!(horizon_name(20), "one_month");
        assert_eq!(horizon_name(15), "15d");
    }
}
