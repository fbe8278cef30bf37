use crate::application::boosting::{BoostingParams, GradientBoostClassifier, argmax_direction};
use crate::domain::errors::ForecastError;
use crate::domain::features::{FEATURE_SCHEMA_VERSION, FeatureVector};
use crate::domain::labels::Direction;
use crate::domain::model::{BacktestReport, ClassStats, WindowOutcome, WindowReport};
use chrono::NaiveDate;
use tracing::debug;

/// Walk-forward configuration. The training window has a fixed length of
/// `train_window` rows and is always immediately followed by a disjoint
/// `test_window`-row evaluation span; both slide forward by one test-window
/// length per step.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub train_window: usize,
    pub test_window: usize,
    /// A window is fit only when every class has at least this many examples.
    pub min_class_count: usize,
    pub boosting: BoostingParams,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            train_window: 120,
            test_window: 21,
            min_class_count: 5,
            boosting: BoostingParams::default(),
        }
    }
}

/// The fitted classifier for one (ticker, horizon) plus everything needed to
/// interpret it later. Superseded wholesale by the next walk, never mutated.
pub struct ModelArtifact {
    pub ticker: String,
    pub horizon: usize,
    pub schema_version: String,
    pub dead_zone: f64,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    /// Accuracy of the last evaluated out-of-sample window.
    pub oos_accuracy: Option<f64>,
    pub model: GradientBoostClassifier,
}

pub struct WalkOutcome {
    /// None when no window in the walk (including the final one) had enough
    /// examples of every class.
    pub artifact: Option<ModelArtifact>,
    pub report: BacktestReport,
}

enum WalkState {
    Training,
    Evaluating,
    Advancing,
    Finalizing,
}

/// Walks forward through a ticker's labeled history, fitting on each training
/// window and scoring on the strictly later test window.
pub struct WalkForwardTrainer {
    config: TrainerConfig,
}

impl WalkForwardTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        ticker: &str,
        horizon: usize,
        dead_zone: f64,
        rows: &[(FeatureVector, Direction)],
    ) -> Result<WalkOutcome, ForecastError> {
        let train_len = self.config.train_window;
        let test_len = self.config.test_window;
        let need = train_len + test_len;

        // Initializing: accumulate enough history for one full train+test pair.
        if rows.len() < need {
            return Err(ForecastError::InsufficientHistory {
                symbol: ticker.to_string(),
                have: rows.len(),
                need,
            });
        }

        let mut report = BacktestReport::default();
        for (_, label) in rows {
            report.label_counts[label.index()] += 1;
        }

        let mut start = 0usize;
        let mut state = WalkState::Training;
        let mut fitted: Option<(GradientBoostClassifier, usize)> = None;
        let mut last_walk_fit: Option<(GradientBoostClassifier, usize)> = None;
        let mut last_accuracy: Option<f64> = None;

        let artifact = loop {
            match state {
                WalkState::Training => {
                    let window = &rows[start..start + train_len];
                    match self.fit_window(horizon, window) {
                        Ok(model) => {
                            fitted = Some((model, start));
                            state = WalkState::Evaluating;
                        }
                        Err(reason) => {
                            report.windows.push(self.window_report(
                                rows,
                                start,
                                WindowOutcome::Skipped { reason },
                            ));
                            state = WalkState::Advancing;
                        }
                    }
                }
                WalkState::Evaluating => {
                    let (model, _) = fitted.as_ref().expect("Evaluating follows a fit");
                    let test = &rows[start + train_len..start + train_len + test_len];
                    let outcome = evaluate(model, test);
                    if let WindowOutcome::Evaluated { accuracy, .. } = outcome {
                        last_accuracy = Some(accuracy);
                    }
                    report
                        .windows
                        .push(self.window_report(rows, start, outcome));
                    last_walk_fit = fitted.take();
                    state = WalkState::Advancing;
                }
                WalkState::Advancing => {
                    start += test_len;
                    state = if start + need > rows.len() {
                        WalkState::Finalizing
                    } else {
                        WalkState::Training
                    };
                }
                WalkState::Finalizing => {
                    // The window has reached the present: the freshest full
                    // training window produces the live model. If its labels
                    // are imbalanced, the last model fitted during the walk
                    // stays live instead.
                    let final_start = rows.len() - train_len;
                    let live = match self.fit_window(horizon, &rows[final_start..]) {
                        Ok(model) => Some((model, final_start)),
                        Err(reason) => {
                            debug!(ticker, horizon, %reason, "Final window not fittable");
                            last_walk_fit.take()
                        }
                    };
                    break live.map(|(model, fit_start)| ModelArtifact {
                        ticker: ticker.to_string(),
                        horizon,
                        schema_version: FEATURE_SCHEMA_VERSION.to_string(),
                        dead_zone,
                        train_start: rows[fit_start].0.date(),
                        train_end: rows[fit_start + train_len - 1].0.date(),
                        oos_accuracy: last_accuracy,
                        model,
                    });
                }
            }
        };

        Ok(WalkOutcome { artifact, report })
    }

    /// Fit one training window, or explain why it must be skipped.
    fn fit_window(
        &self,
        horizon: usize,
        window: &[(FeatureVector, Direction)],
    ) -> Result<GradientBoostClassifier, String> {
        let mut counts = [0usize; Direction::COUNT];
        for (_, label) in window {
            counts[label.index()] += 1;
        }
        for direction in Direction::ALL {
            let count = counts[direction.index()];
            if count < self.config.min_class_count {
                return Err(ForecastError::LabelImbalance {
                    horizon,
                    class: direction.name().to_string(),
                    count,
                }
                .to_string());
            }
        }

        let x: Vec<Vec<f64>> = window.iter().map(|(f, _)| f.values().to_vec()).collect();
        let y: Vec<Direction> = window.iter().map(|(_, l)| *l).collect();
        GradientBoostClassifier::fit(&x, &y, self.config.boosting.clone())
            .map_err(|e| format!("fit failed: {e}"))
    }

    fn window_report(
        &self,
        rows: &[(FeatureVector, Direction)],
        start: usize,
        outcome: WindowOutcome,
    ) -> WindowReport {
        let train_len = self.config.train_window;
        let test_len = self.config.test_window;
        WindowReport {
            train_start: rows[start].0.date(),
            train_end: rows[start + train_len - 1].0.date(),
            test_start: rows[start + train_len].0.date(),
            test_end: rows[start + train_len + test_len - 1].0.date(),
            outcome,
        }
    }
}

/// Score a fitted model on a strictly out-of-sample test window.
fn evaluate(model: &GradientBoostClassifier, test: &[(FeatureVector, Direction)]) -> WindowOutcome {
    let x: Vec<Vec<f64>> = test.iter().map(|(f, _)| f.values().to_vec()).collect();
    let probs = match model.predict_proba_batch(&x) {
        Ok(p) => p,
        Err(e) => {
            return WindowOutcome::Skipped {
                reason: format!("evaluation failed: {e}"),
            };
        }
    };

    // confusion[actual][predicted]
    let mut confusion = [[0usize; Direction::COUNT]; Direction::COUNT];
    for ((_, actual), row) in test.iter().zip(&probs) {
        let predicted = argmax_direction(row);
        confusion[actual.index()][predicted.index()] += 1;
    }

    let correct: usize = (0..Direction::COUNT).map(|k| confusion[k][k]).sum();
    let accuracy = correct as f64 / test.len() as f64;

    let per_class = std::array::from_fn(|k| {
        let predicted: usize = (0..Direction::COUNT).map(|a| confusion[a][k]).sum();
        let support: usize = confusion[k].iter().sum();
        ClassStats {
            precision: ratio(confusion[k][k], predicted),
            recall: ratio(confusion[k][k], support),
            support,
        }
    });

    WindowOutcome::Evaluated {
        accuracy,
        per_class,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
