use crate::domain::errors::ForecastError;
use crate::domain::ports::{MacroDataSource, MarketDataSource};
use crate::domain::series::AlignedSeries;
use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

/// How often a synthetic series publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Every business day (prices, indices).
    Daily,
    /// First business day of each month (macro indicators).
    Monthly,
}

/// Shape of one synthetic series: geometric drift plus uniform noise.
#[derive(Debug, Clone, Copy)]
pub struct SeriesSpec {
    pub start_value: f64,
    pub drift: f64,
    pub vol: f64,
    pub cadence: Cadence,
    /// Calendar days after the requested start before the first observation
    /// (a recently listed ticker).
    pub lag_days: u64,
}

impl SeriesSpec {
    pub fn equity(start_value: f64, drift: f64, vol: f64) -> Self {
        Self {
            start_value,
            drift,
            vol,
            cadence: Cadence::Daily,
            lag_days: 0,
        }
    }

    pub fn monthly(start_value: f64, drift: f64) -> Self {
        Self {
            start_value,
            drift,
            vol: 0.0,
            cadence: Cadence::Monthly,
            lag_days: 0,
        }
    }

    pub fn listed_after(mut self, lag_days: u64) -> Self {
        self.lag_days = lag_days;
        self
    }
}

/// Deterministic synthetic data source for demo runs and tests.
///
/// Series are generated from a per-symbol seeded RNG, so the same
/// (seed, symbol, start) always yields the same history. Unregistered
/// symbols surface as `DataUnavailable`, mirroring a provider's not-found
/// condition.
pub struct SyntheticDataSource {
    seed: u64,
    business_days: usize,
    specs: HashMap<String, SeriesSpec>,
    calls: AtomicUsize,
}

impl SyntheticDataSource {
    pub fn new(seed: u64, business_days: usize) -> Self {
        Self {
            seed,
            business_days,
            specs: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_series(mut self, symbol: impl Into<String>, spec: SeriesSpec) -> Self {
        self.specs.insert(symbol.into(), spec);
        self
    }

    /// Number of series fetches served so far; lets tests assert that a
    /// cached cycle performed no second pipeline run.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn generate(&self, symbol: &str, start: NaiveDate) -> Result<AlignedSeries, ForecastError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let spec = self
            .specs
            .get(symbol)
            .ok_or_else(|| ForecastError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "symbol not registered with synthetic source".to_string(),
            })?;

        let mut hasher = DefaultHasher::new();
        symbol.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(self.seed ^ hasher.finish());

        let listed = start + Days::new(spec.lag_days);
        let mut points = Vec::new();
        let mut value = spec.start_value;
        let mut day = start;
        let mut produced = 0usize;
        while produced < self.business_days {
            if !is_weekend(day) {
                let publish = day >= listed
                    && match spec.cadence {
                        Cadence::Daily => true,
                        Cadence::Monthly => points
                            .last()
                            .map(|&(prev, _): &(NaiveDate, f64)| prev.month() != day.month())
                            .unwrap_or(true),
                    };
                if publish {
                    points.push((day, value));
                }
                let noise: f64 = rng.random_range(-1.0..=1.0);
                value *= 1.0 + spec.drift + spec.vol * noise;
                value = value.max(0.01);
                produced += 1;
            }
            day = day + Days::new(1);
        }

        AlignedSeries::new(symbol, points).map_err(|e| ForecastError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })
    }
}

fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

#[async_trait]
impl MarketDataSource for SyntheticDataSource {
    async fn daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
    ) -> Result<AlignedSeries, ForecastError> {
        self.generate(symbol, start)
    }
}

#[async_trait]
impl MacroDataSource for SyntheticDataSource {
    async fn indicator(
        &self,
        series_id: &str,
        start: NaiveDate,
    ) -> Result<AlignedSeries, ForecastError> {
        self.generate(series_id, start)
    }
}
