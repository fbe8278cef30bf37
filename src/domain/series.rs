use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("Series {symbol} has dates out of order at position {position}")]
    OutOfOrder { symbol: String, position: usize },

    #[error("Series {symbol} has duplicate date {date}")]
    DuplicateDate { symbol: String, date: NaiveDate },

    #[error("Series {symbol} has a non-finite value at {date}")]
    NonFinite { symbol: String, date: NaiveDate },
}

/// An ordered, gap-checked (date, value) series for one symbol or indicator.
///
/// Dates are strictly increasing with no duplicates; values are finite.
/// Immutable once built for a given pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    symbol: String,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl AlignedSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        let mut dates = Vec::with_capacity(points.len());
        let mut values = Vec::with_capacity(points.len());

        for (position, (date, value)) in points.into_iter().enumerate() {
            if let Some(&prev) = dates.last() {
                if date == prev {
                    return Err(SeriesError::DuplicateDate { symbol, date });
                }
                if date < prev {
                    return Err(SeriesError::OutOfOrder { symbol, position });
                }
            }
            if !value.is_finite() {
                return Err(SeriesError::NonFinite { symbol, date });
            }
            dates.push(date);
            values.push(value);
        }

        Ok(Self {
            symbol,
            dates,
            values,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn date_at(&self, index: usize) -> NaiveDate {
        self.dates[index]
    }

    pub fn value_at(&self, index: usize) -> f64 {
        self.values[index]
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        match (self.dates.last(), self.values.last()) {
            (Some(&d), Some(&v)) => Some((d, v)),
            _ => None,
        }
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Most recent observation dated on or before `date`.
    ///
    /// This is the point-in-time read used for macro indicators: a value
    /// published after `date` is never visible.
    pub fn latest_on_or_before(&self, date: NaiveDate) -> Option<(NaiveDate, f64)> {
        let upper = self.dates.partition_point(|&d| d <= date);
        if upper == 0 {
            return None;
        }
        Some((self.dates[upper - 1], self.values[upper - 1]))
    }

    /// Year-over-year change of a level series, read point-in-time at `date`.
    pub fn yoy_change(&self, date: NaiveDate) -> Option<f64> {
        let (_, current) = self.latest_on_or_before(date)?;
        let year_ago = date.checked_sub_days(Days::new(365))?;
        let (_, prior) = self.latest_on_or_before(year_ago)?;
        if prior == 0.0 {
            return None;
        }
        Some(current / prior - 1.0)
    }

    /// Forward-fill this series onto a reference trading calendar.
    ///
    /// Calendar dates before the first observation are dropped (a leading gap
    /// stays a gap); every later calendar date carries the most recent
    /// observed value.
    pub fn aligned_to(&self, calendar: &[NaiveDate]) -> AlignedSeries {
        let mut dates = Vec::new();
        let mut values = Vec::new();
        let mut cursor = 0usize;
        let mut current: Option<f64> = None;

        for &day in calendar {
            while cursor < self.dates.len() && self.dates[cursor] <= day {
                current = Some(self.values[cursor]);
                cursor += 1;
            }
            if let Some(value) = current {
                dates.push(day);
                values.push(value);
            }
        }

        AlignedSeries {
            symbol: self.symbol.clone(),
            dates,
            values,
        }
    }

    /// Simple daily returns, one entry per date starting at index 1.
    pub fn daily_returns(&self) -> Vec<f64> {
        self.values
            .windows(2)
            .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
            .collect()
    }
}

/// How a macro indicator enters the feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroTransform {
    /// Use the latest published level as-is (rates, unemployment).
    Level,
    /// Year-over-year change of the level (price indices).
    YearOverYear,
}

#[derive(Debug, Clone)]
pub struct MacroSeries {
    pub name: String,
    pub transform: MacroTransform,
    pub series: AlignedSeries,
}

impl MacroSeries {
    /// Point-in-time feature value at `date`, or None before first publication.
    pub fn value_as_of(&self, date: NaiveDate) -> Option<f64> {
        match self.transform {
            MacroTransform::Level => self.series.latest_on_or_before(date).map(|(_, v)| v),
            MacroTransform::YearOverYear => self.series.yoy_change(date),
        }
    }
}

/// All series a single ticker's forecast needs, aligned to one trading
/// calendar (the market index's dates, restricted to the span where the
/// ticker itself has history).
#[derive(Debug, Clone)]
pub struct SeriesBundle {
    pub ticker: String,
    pub calendar: Vec<NaiveDate>,
    pub prices: AlignedSeries,
    pub index: AlignedSeries,
    pub vix: AlignedSeries,
    pub macros: Vec<MacroSeries>,
}

impl SeriesBundle {
    /// Assemble a per-ticker bundle. The reference calendar is the index's
    /// date vector from the first date where both the index and the ticker
    /// have an observation; prices and the volatility index are forward-filled
    /// onto it. Macro series are kept on their own publication dates and read
    /// point-in-time.
    pub fn assemble(
        ticker: impl Into<String>,
        prices: AlignedSeries,
        index: AlignedSeries,
        vix: AlignedSeries,
        macros: Vec<MacroSeries>,
    ) -> Option<SeriesBundle> {
        let ticker = ticker.into();
        let price_start = prices.first_date()?;
        let vix_start = vix.first_date()?;
        let start = price_start.max(vix_start);

        let calendar: Vec<NaiveDate> = index
            .dates()
            .iter()
            .copied()
            .filter(|&d| d >= start)
            .collect();
        if calendar.is_empty() {
            return None;
        }

        let prices = prices.aligned_to(&calendar);
        let index = index.aligned_to(&calendar);
        let vix = vix.aligned_to(&calendar);
        if prices.len() != calendar.len() || index.len() != calendar.len() {
            return None;
        }

        Some(SeriesBundle {
            ticker,
            calendar,
            prices,
            index,
            vix,
            macros,
        })
    }

    pub fn len(&self) -> usize {
        self.calendar.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calendar.is_empty()
    }
}
