use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Version tag stored on every model artifact. Bump on ANY change to
/// `FEATURE_NAMES`, the lookback constants, or the fill policy, so a model
/// trained on an older layout is rejected instead of silently misaligned.
pub const FEATURE_SCHEMA_VERSION: &str = "v1";

/// Ordered list of feature names. The order IS the wire layout of every
/// feature vector; any change here is a breaking change for trained models.
pub const FEATURE_NAMES: &[&str] = &[
    // Own history
    "ret_1d",
    "ret_5d",
    "ret_15d",
    "ret_30d",
    "momentum_21d",
    "volatility_21d",
    "rsi_14",
    "drawdown_63d",
    // Market conditions
    "index_ret_1d",
    "index_ret_5d",
    "index_ret_30d",
    "index_volatility_21d",
    // Volatility regime
    "vix_level",
    "vix_change_5d",
    // Macro
    "interest_rate",
    "unemployment_rate",
    "inflation_yoy",
];

/// Fill value for features whose lookback exceeds the available history, and
/// for macro indicators not yet published at the target date. Applied
/// uniformly so backtest windows stay internally consistent.
pub const FEATURE_FILL_VALUE: f64 = 0.0;

pub fn feature_count() -> usize {
    FEATURE_NAMES.len()
}

/// A fixed-width feature vector for one (ticker, date).
///
/// Values are stored in `FEATURE_NAMES` order. Construction is only possible
/// with exactly that many finite values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    date: NaiveDate,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(date: NaiveDate, values: Vec<f64>) -> Option<FeatureVector> {
        if values.len() != FEATURE_NAMES.len() {
            return None;
        }
        if values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(FeatureVector { date, values })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| self.values[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_length_is_enforced() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert!(FeatureVector::new(date, vec![0.0; FEATURE_NAMES.len()]).is_some());
        assert!(FeatureVector::new(date, vec![0.0; FEATURE_NAMES.len() - 1]).is_none());
        assert!(FeatureVector::new(date, vec![]).is_none());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let mut values = vec![0.0; FEATURE_NAMES.len()];
        values[3] = f64::NAN;
        assert!(FeatureVector::new(date, values).is_none());
    }

    #[test]
    fn test_lookup_by_name() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let mut values = vec![0.0; FEATURE_NAMES.len()];
        values[6] = 55.0; // rsi_14
        let fv = FeatureVector::new(date, values).unwrap();
        assert_eq!(fv.get("rsi_14"), Some(55.0));
        assert_eq!(fv.get("not_a_feature"), None);
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = FEATURE_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FEATURE_NAMES.len());
    }
}
