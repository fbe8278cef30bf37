//! Data-universe configuration: which tickers, indices, and macro series the
//! pipeline tracks, and which source implementation supplies them.

use crate::domain::features::FEATURE_NAMES;
use crate::domain::series::MacroTransform;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Which data source implementation backs the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// CSV files exported by the daily ETL job.
    Csv,
    /// Deterministic synthetic series (demo runs and tests).
    Synthetic,
}

impl FromStr for SourceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(SourceMode::Csv),
            "synthetic" | "mock" => Ok(SourceMode::Synthetic),
            _ => bail!("Invalid DATA_SOURCE: {}. Must be 'csv' or 'synthetic'", s),
        }
    }
}

/// One tracked macro indicator: provider series id, feature name, and how the
/// raw level enters the feature vector.
#[derive(Debug, Clone)]
pub struct MacroSpec {
    pub series_id: String,
    pub name: String,
    pub transform: MacroTransform,
}

impl FromStr for MacroSpec {
    type Err = anyhow::Error;

    /// Format: `SERIES_ID:feature_name:level|yoy`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            bail!("Invalid macro spec '{}': expected ID:name:transform", s);
        }
        let transform = match parts[2].to_lowercase().as_str() {
            "level" => MacroTransform::Level,
            "yoy" => MacroTransform::YearOverYear,
            other => bail!("Invalid macro transform '{}': expected level or yoy", other),
        };
        Ok(MacroSpec {
            series_id: parts[0].to_string(),
            name: parts[1].to_string(),
            transform,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DataConfig {
    pub source_mode: SourceMode,
    pub data_dir: PathBuf,
    pub tickers: Vec<String>,
    pub index_symbol: String,
    pub vix_symbol: String,
    pub macro_series: Vec<MacroSpec>,
    pub start_date: NaiveDate,
}

const DEFAULT_TICKERS: &str = "NVDA,ORCL,THAR,SOFI,RR,RGTI";
const DEFAULT_MACROS: &str =
    "FEDFUNDS:interest_rate:level,UNRATE:unemployment_rate:level,CPIAUCSL:inflation_yoy:yoy";

impl DataConfig {
    pub fn from_env() -> Result<Self> {
        let source_mode = env::var("DATA_SOURCE")
            .unwrap_or_else(|_| "csv".to_string())
            .parse::<SourceMode>()?;

        let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));

        let tickers: Vec<String> = env::var("TICKERS")
            .unwrap_or_else(|_| DEFAULT_TICKERS.to_string())
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if tickers.is_empty() {
            bail!("TICKERS must name at least one symbol");
        }

        let index_symbol = env::var("INDEX_SYMBOL").unwrap_or_else(|_| "^GSPC".to_string());
        let vix_symbol = env::var("VIX_SYMBOL").unwrap_or_else(|_| "^VIX".to_string());

        let macro_series: Vec<MacroSpec> = env::var("MACRO_SERIES")
            .unwrap_or_else(|_| DEFAULT_MACROS.to_string())
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<MacroSpec>())
            .collect::<Result<_>>()?;
        validate_macro_names(&macro_series)?;

        let start_date = env::var("HISTORY_START")
            .unwrap_or_else(|_| "2021-01-01".to_string())
            .parse::<NaiveDate>()
            .context("Failed to parse HISTORY_START (expected YYYY-MM-DD)")?;

        Ok(Self {
            source_mode,
            data_dir,
            tickers,
            index_symbol,
            vix_symbol,
            macro_series,
            start_date,
        })
    }
}

/// The macro specs feed the tail of the feature vector by position: their
/// names and order must match the schema, or feature meanings would shift
/// silently between runs.
fn validate_macro_names(specs: &[MacroSpec]) -> Result<()> {
    if specs.len() > FEATURE_NAMES.len() {
        bail!("More macro series than feature schema slots");
    }
    let schema_tail = &FEATURE_NAMES[FEATURE_NAMES.len() - specs.len()..];
    for (spec, &expected) in specs.iter().zip(schema_tail) {
        if spec.name != expected {
            bail!(
                "Macro series '{}' does not match feature schema slot '{}'",
                spec.name,
                expected
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_spec_parsing() {
        let spec: MacroSpec = "CPIAUCSL:inflation_yoy:yoy".parse().unwrap();
        assert_eq!(spec.series_id, "CPIAUCSL");
        assert_eq!(spec.name, "inflation_yoy");
        assert_eq!(spec.transform, MacroTransform::YearOverYear);

        assert!("CPIAUCSL".parse::<MacroSpec>().is_err());
        assert!("CPIAUCSL:x:median".parse::<MacroSpec>().is_err());
    }

    #[test]
    fn test_default_macros_match_schema() {
        let specs: Vec<MacroSpec> = DEFAULT_MACROS
            .split(',')
            .map(|s| s.parse().unwrap())
            .collect();
        assert!(validate_macro_names(&specs).is_ok());
    }

    #[test]
    fn test_misordered_macros_rejected() {
        let specs = vec![
            MacroSpec {
                series_id: "UNRATE".to_string(),
                name: "unemployment_rate".to_string(),
                transform: MacroTransform::Level,
            },
            MacroSpec {
                series_id: "FEDFUNDS".to_string(),
                name: "interest_rate".to_string(),
                transform: MacroTransform::Level,
            },
        ];
        assert!(validate_macro_names(&specs).is_err());
    }
}
