use crate::domain::errors::ForecastError;
use crate::domain::ports::{MacroDataSource, MarketDataSource};
use crate::domain::series::AlignedSeries;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Daily OHLCV row as exported by the ETL job. Only the close feeds the
/// forecasting pipeline; the other columns are carried by the file format.
#[derive(Debug, Deserialize)]
struct PriceRecord {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Open")]
    _open: f64,
    #[serde(rename = "High")]
    _high: f64,
    #[serde(rename = "Low")]
    _low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    _volume: f64,
}

/// Macro indicator row: publication date and level.
#[derive(Debug, Deserialize)]
struct IndicatorRecord {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Value")]
    value: f64,
}

/// File-backed data source reading the ETL job's per-symbol CSV exports:
/// `<data_dir>/<SYMBOL>.csv` with `Date,Open,High,Low,Close,Volume` columns
/// for equities and indices, `Date,Value` for macro indicators. Index
/// symbols like `^GSPC` map to `GSPC.csv`.
pub struct CsvDataSource {
    data_dir: PathBuf,
}

impl CsvDataSource {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn file_for(&self, symbol: &str) -> PathBuf {
        let name: String = symbol
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.data_dir.join(format!("{name}.csv"))
    }

    fn open(path: &Path, symbol: &str) -> Result<csv::Reader<BufReader<File>>, ForecastError> {
        if !path.exists() {
            return Err(ForecastError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("no CSV file at {path:?}"),
            });
        }
        let file = File::open(path).map_err(|e| ForecastError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: format!("failed to open {path:?}: {e}"),
        })?;
        Ok(csv::Reader::from_reader(BufReader::new(file)))
    }

    fn build_series(
        symbol: &str,
        mut points: Vec<(NaiveDate, f64)>,
        start: NaiveDate,
    ) -> Result<AlignedSeries, ForecastError> {
        points.retain(|(date, _)| *date >= start);
        points.sort_by_key(|(date, _)| *date);
        debug!(symbol, rows = points.len(), "Loaded CSV series");

        if points.is_empty() {
            return Err(ForecastError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("no rows on or after {start}"),
            });
        }

        AlignedSeries::new(symbol, points).map_err(|e| ForecastError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl MarketDataSource for CsvDataSource {
    async fn daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
    ) -> Result<AlignedSeries, ForecastError> {
        let path = self.file_for(symbol);
        let mut reader = Self::open(&path, symbol)?;

        let mut points = Vec::new();
        for row in reader.deserialize::<PriceRecord>() {
            let record = row.map_err(|e| ForecastError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("malformed row in {path:?}: {e}"),
            })?;
            points.push((record.date, record.close));
        }
        Self::build_series(symbol, points, start)
    }
}

#[async_trait]
impl MacroDataSource for CsvDataSource {
    async fn indicator(
        &self,
        series_id: &str,
        start: NaiveDate,
    ) -> Result<AlignedSeries, ForecastError> {
        let path = self.file_for(series_id);
        let mut reader = Self::open(&path, series_id)?;

        let mut points = Vec::new();
        for row in reader.deserialize::<IndicatorRecord>() {
            let record = row.map_err(|e| ForecastError::DataUnavailable {
                symbol: series_id.to_string(),
                reason: format!("malformed row in {path:?}: {e}"),
            })?;
            points.push((record.date, record.value));
        }
        Self::build_series(series_id, points, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("stockcast_csv_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_reads_etl_price_layout() {
        let dir = temp_dir();
        let mut file = File::create(dir.join("NVDA.csv")).unwrap();
        writeln!(file, "Date,Open,High,Low,Close,Volume").unwrap();
        writeln!(file, "2024-01-02,48.0,49.5,47.8,49.0,1000000").unwrap();
        writeln!(file, "2024-01-03,49.0,50.1,48.6,50.0,1100000").unwrap();

        let source = CsvDataSource::new(dir.clone());
        let series = source
            .daily_closes("NVDA", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .await
            .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.values(), &[49.0, 50.0]);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_missing_file_is_recoverable() {
        let dir = temp_dir();
        let source = CsvDataSource::new(dir.clone());
        let result = source
            .daily_closes("NOPE", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .await;

        match result {
            Err(e) => assert!(e.is_recoverable()),
            Ok(_) => panic!("expected DataUnavailable"),
        }
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_index_symbol_maps_to_plain_filename() {
        let dir = temp_dir();
        let mut file = File::create(dir.join("GSPC.csv")).unwrap();
        writeln!(file, "Date,Open,High,Low,Close,Volume").unwrap();
        writeln!(file, "2024-01-02,4700,4750,4690,4720,0").unwrap();

        let source = CsvDataSource::new(dir.clone());
        let series = source
            .daily_closes("^GSPC", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(series.len(), 1);

        let _ = std::fs::remove_dir_all(dir);
    }
}
