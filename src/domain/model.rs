use crate::domain::labels::Direction;
use crate::domain::prediction::BacktestSummary;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-class precision/recall for one evaluated test window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    pub precision: f64,
    pub recall: f64,
    /// Realized examples of this class in the test window.
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WindowOutcome {
    Evaluated {
        accuracy: f64,
        per_class: [ClassStats; Direction::COUNT],
    },
    /// Too few examples of some class; the window was skipped, not fit with a
    /// degenerate model. The walk continues.
    Skipped { reason: String },
}

/// One step of the walk: a training window and the strictly later test
/// window scored against the model it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
    pub outcome: WindowOutcome,
}

impl WindowReport {
    pub fn accuracy(&self) -> Option<f64> {
        match &self.outcome {
            WindowOutcome::Evaluated { accuracy, .. } => Some(*accuracy),
            WindowOutcome::Skipped { .. } => None,
        }
    }
}

/// Statistics across every window of one (ticker, horizon) walk. Superseded
/// artifacts' windows are all retained here for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub windows: Vec<WindowReport>,
    /// Realized label distribution across the whole backtest span.
    pub label_counts: [usize; Direction::COUNT],
}

impl BacktestReport {
    pub fn evaluated_windows(&self) -> usize {
        self.windows.iter().filter(|w| w.accuracy().is_some()).count()
    }

    pub fn skipped_windows(&self) -> usize {
        self.windows.len() - self.evaluated_windows()
    }

    /// Mean of per-window test accuracies. Deliberately NOT pooled accuracy:
    /// pooling would let long stable windows dominate the metric.
    pub fn mean_accuracy(&self) -> Option<f64> {
        let accuracies: Vec<f64> = self.windows.iter().filter_map(|w| w.accuracy()).collect();
        if accuracies.is_empty() {
            return None;
        }
        Some(accuracies.iter().sum::<f64>() / accuracies.len() as f64)
    }

    pub fn summary(&self) -> BacktestSummary {
        BacktestSummary {
            mean_accuracy: self.mean_accuracy(),
            evaluated_windows: self.evaluated_windows(),
            skipped_windows: self.skipped_windows(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn evaluated(accuracy: f64) -> WindowOutcome {
        WindowOutcome::Evaluated {
            accuracy,
            per_class: [ClassStats {
                precision: 0.0,
                recall: 0.0,
                support: 0,
            }; 3],
        }
    }

    #[test]
    fn test_mean_accuracy_is_per_window_mean() {
        let report = BacktestReport {
            windows: vec![
                WindowReport {
                    train_start: day(1),
                    train_end: day(10),
                    test_start: day(11),
                    test_end: day(15),
                    outcome: evaluated(0.8),
                },
                WindowReport {
                    train_start: day(6),
                    train_end: day(15),
                    test_start: day(16),
                    test_end: day(20),
                    outcome: evaluated(0.4),
                },
                WindowReport {
                    train_start: day(11),
                    train_end: day(20),
                    test_start: day(21),
                    test_end: day(25),
                    outcome: WindowOutcome::Skipped {
                        reason: "insufficient data".to_string(),
                    },
                },
            ],
            label_counts: [10, 5, 10],
        };

        assert_eq!(report.evaluated_windows(), 2);
        assert_eq!(report.skipped_windows(), 1);
        assert!((report.mean_accuracy().unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_empty_report_has_no_accuracy() {
        let report = BacktestReport::default();
        assert_eq!(report.mean_accuracy(), None);
        assert_eq!(report.summary().evaluated_windows, 0);
    }
}
