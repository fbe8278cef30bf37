use crate::domain::errors::ForecastError;
use crate::domain::series::AlignedSeries;
use async_trait::async_trait;
use chrono::NaiveDate;

// Need async_trait for async functions in traits
/// Supplies daily closing prices for equities and market/volatility indices.
///
/// Implementations own network calls, rate limiting, and retries. A symbol
/// the source cannot supply surfaces as `DataUnavailable`, which the pipeline
/// treats as recoverable: the ticker is skipped for the cycle and the prior
/// cached value kept.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
    ) -> Result<AlignedSeries, ForecastError>;
}

/// Supplies macroeconomic indicator series (rates, unemployment, price
/// indices), keyed by provider series id, dated by publication date.
#[async_trait]
pub trait MacroDataSource: Send + Sync {
    async fn indicator(
        &self,
        series_id: &str,
        start: NaiveDate,
    ) -> Result<AlignedSeries, ForecastError>;
}
