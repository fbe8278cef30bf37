use crate::domain::features::{FEATURE_FILL_VALUE, FeatureVector, feature_count};
use crate::domain::series::SeriesBundle;
use statrs::statistics::Statistics;
use ta::Next;
use ta::indicators::RelativeStrengthIndex;

// Lookbacks are part of the feature schema: changing any of them means
// bumping FEATURE_SCHEMA_VERSION.
const RETURN_WINDOWS: [usize; 4] = [1, 5, 15, 30];
const INDEX_RETURN_WINDOWS: [usize; 3] = [1, 5, 30];
const MOMENTUM_WINDOW: usize = 21;
const VOLATILITY_WINDOW: usize = 21;
const RSI_PERIOD: usize = 14;
const DRAWDOWN_WINDOW: usize = 63;
const VIX_CHANGE_WINDOW: usize = 5;

/// Builds fixed-schema feature vectors from an aligned series bundle.
///
/// Point-in-time discipline: the vector for calendar position `i` is computed
/// exclusively from observations at positions <= i (and macro publications
/// dated on or before that day). Nothing dated later may influence it.
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Feature vectors for every calendar position of the bundle, in date
    /// order. Positions whose lookbacks are not yet filled carry the
    /// documented fill value so training windows stay internally consistent.
    pub fn build_all(bundle: &SeriesBundle) -> Vec<FeatureVector> {
        let ctx = FeatureContext::prepare(bundle);
        (0..bundle.len())
            .filter_map(|i| ctx.vector_at(bundle, i))
            .collect()
    }

    /// The vector for one calendar position.
    pub fn build(bundle: &SeriesBundle, index: usize) -> Option<FeatureVector> {
        if index >= bundle.len() {
            return None;
        }
        FeatureContext::prepare(bundle).vector_at(bundle, index)
    }
}

/// Per-bundle precomputed state. Every entry at position i is derived only
/// from inputs at positions <= i, so indexing at i preserves the
/// point-in-time property.
struct FeatureContext {
    rsi: Vec<f64>,
    price_returns: Vec<f64>,
    index_returns: Vec<f64>,
}

impl FeatureContext {
    fn prepare(bundle: &SeriesBundle) -> FeatureContext {
        // Constant periods are always valid RSI configurations.
        let mut rsi_indicator = RelativeStrengthIndex::new(RSI_PERIOD).unwrap();
        let rsi = bundle
            .prices
            .values()
            .iter()
            .map(|&price| rsi_indicator.next(price))
            .collect();

        FeatureContext {
            rsi,
            price_returns: padded_daily_returns(bundle.prices.values()),
            index_returns: padded_daily_returns(bundle.index.values()),
        }
    }

    fn vector_at(&self, bundle: &SeriesBundle, i: usize) -> Option<FeatureVector> {
        let date = bundle.calendar[i];
        let prices = bundle.prices.values();
        let index = bundle.index.values();
        let vix = bundle.vix.values();

        let mut values = Vec::with_capacity(feature_count());

        for window in RETURN_WINDOWS {
            values.push(trailing_return(prices, i, window).unwrap_or(FEATURE_FILL_VALUE));
        }
        values.push(trailing_return(prices, i, MOMENTUM_WINDOW).unwrap_or(FEATURE_FILL_VALUE));
        values.push(
            rolling_std(&self.price_returns, i, VOLATILITY_WINDOW).unwrap_or(FEATURE_FILL_VALUE),
        );
        values.push(self.rsi[i]);
        values.push(trailing_drawdown(prices, i, DRAWDOWN_WINDOW).unwrap_or(FEATURE_FILL_VALUE));

        for window in INDEX_RETURN_WINDOWS {
            values.push(trailing_return(index, i, window).unwrap_or(FEATURE_FILL_VALUE));
        }
        values.push(
            rolling_std(&self.index_returns, i, VOLATILITY_WINDOW).unwrap_or(FEATURE_FILL_VALUE),
        );

        values.push(vix[i]);
        values.push(trailing_return(vix, i, VIX_CHANGE_WINDOW).unwrap_or(FEATURE_FILL_VALUE));

        for series in &bundle.macros {
            values.push(series.value_as_of(date).unwrap_or(FEATURE_FILL_VALUE));
        }
        // Bundles may carry fewer macro series than the schema (a source was
        // skipped); missing ones take the fill value.
        while values.len() < feature_count() {
            values.push(FEATURE_FILL_VALUE);
        }

        FeatureVector::new(date, values)
    }
}

/// Daily simple returns padded to series length: position i holds the return
/// from i-1 to i, position 0 holds the fill value.
fn padded_daily_returns(values: &[f64]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(values.len());
    returns.push(FEATURE_FILL_VALUE);
    for w in values.windows(2) {
        returns.push(if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 });
    }
    returns
}

fn trailing_return(values: &[f64], i: usize, window: usize) -> Option<f64> {
    if i < window || values[i - window] == 0.0 {
        return None;
    }
    Some(values[i] / values[i - window] - 1.0)
}

/// Sample standard deviation of the last `window` daily returns ending at i.
fn rolling_std(padded_returns: &[f64], i: usize, window: usize) -> Option<f64> {
    if i < window {
        return None;
    }
    let slice = &padded_returns[i + 1 - window..=i];
    let std = slice.iter().copied().std_dev();
    std.is_finite().then_some(std)
}

/// Fractional distance below the trailing `window`-day maximum (<= 0).
fn trailing_drawdown(values: &[f64], i: usize, window: usize) -> Option<f64> {
    if i + 1 < window {
        return None;
    }
    let peak = values[i + 1 - window..=i]
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    if peak <= 0.0 {
        return None;
    }
    Some(values[i] / peak - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::{FEATURE_NAMES, FEATURE_SCHEMA_VERSION};
    use crate::domain::series::{AlignedSeries, MacroSeries, MacroTransform, SeriesBundle};
    use chrono::{Days, NaiveDate};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn series_from(symbol: &str, values: &[f64]) -> AlignedSeries {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (start() + Days::new(i as u64), v))
            .collect();
        AlignedSeries::new(symbol, points).unwrap()
    }

    fn bundle_with_prices(values: &[f64]) -> SeriesBundle {
        let n = values.len();
        let index = series_from("^GSPC", &vec![4000.0; n]);
        let vix = series_from("^VIX", &vec![15.0; n]);
        SeriesBundle::assemble("X", series_from("X", values), index, vix, vec![]).unwrap()
    }

    #[test]
    fn test_schema_width_and_version() {
        assert_eq!(FEATURE_SCHEMA_VERSION, "v1");
        let prices: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let vectors = FeatureBuilder::build_all(&bundle_with_prices(&prices));
        assert_eq!(vectors.len(), 80);
        for v in &vectors {
            assert_eq!(v.values().len(), FEATURE_NAMES.len());
        }
    }

    #[test]
    fn test_fill_policy_at_series_start() {
        let prices: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let vectors = FeatureBuilder::build_all(&bundle_with_prices(&prices));

        // Day 0 has no lookback for any return window.
        assert_eq!(vectors[0].get("ret_30d"), Some(FEATURE_FILL_VALUE));
        assert_eq!(vectors[0].get("volatility_21d"), Some(FEATURE_FILL_VALUE));
        // Day 40 has every own-history lookback filled.
        let r30 = vectors[40].get("ret_30d").unwrap();
        assert!((r30 - (140.0 / 110.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_point_in_time_spike_after_target_date() {
        let mut prices: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let baseline = FeatureBuilder::build(&bundle_with_prices(&prices), 60).unwrap();

        // A violent spike strictly after the target date must not change the
        // vector for that date.
        prices[70] = 10_000.0;
        let spiked = FeatureBuilder::build(&bundle_with_prices(&prices), 60).unwrap();

        assert_eq!(baseline, spiked);
    }

    #[test]
    fn test_macro_values_are_point_in_time() {
        let n = 40;
        let prices: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let index = series_from("^GSPC", &vec![4000.0; n]);
        let vix = series_from("^VIX", &vec![15.0; n]);
        // Published on day 10; unknown before that.
        let rate = AlignedSeries::new("FEDFUNDS", vec![(start() + Days::new(10), 5.25)]).unwrap();
        let macros = vec![MacroSeries {
            name: "interest_rate".to_string(),
            transform: MacroTransform::Level,
            series: rate,
        }];
        let bundle =
            SeriesBundle::assemble("X", series_from("X", &prices), index, vix, macros).unwrap();

        let before = FeatureBuilder::build(&bundle, 5).unwrap();
        let after = FeatureBuilder::build(&bundle, 15).unwrap();
        assert_eq!(before.get("interest_rate"), Some(FEATURE_FILL_VALUE));
        assert_eq!(after.get("interest_rate"), Some(5.25));
    }

    #[test]
    fn test_drawdown_is_non_positive() {
        let mut prices: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        prices[70] = 120.0; // dip below the trailing peak
        let vectors = FeatureBuilder::build_all(&bundle_with_prices(&prices));
        let dd = vectors[70].get("drawdown_63d").unwrap();
        assert!(dd < 0.0);
        let dd_at_peak = vectors[69].get("drawdown_63d").unwrap();
        assert_eq!(dd_at_peak, 0.0);
    }
}
