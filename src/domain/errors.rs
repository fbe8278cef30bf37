use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling series, fitting per-ticker models, and
/// persisting forecast results.
///
/// `DataUnavailable` and `InsufficientHistory` are recoverable: the pipeline
/// skips the affected ticker or horizon for the current cycle and keeps the
/// previously cached result. `LabelImbalance` is recorded per window and never
/// halts a walk.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("Insufficient history for {symbol}: {have} rows, need {need}")]
    InsufficientHistory {
        symbol: String,
        have: usize,
        need: usize,
    },

    #[error("Training window lacks {class} examples at horizon {horizon}d: {count} found")]
    LabelImbalance {
        horizon: usize,
        class: String,
        count: usize,
    },

    #[error("Probabilities for {symbol} horizon {horizon}d sum to {sum} after normalization")]
    NormalizationFailure {
        symbol: String,
        horizon: usize,
        sum: f64,
    },

    #[error("Feature schema mismatch: model trained on {expected}, current schema is {found}")]
    SchemaMismatch { expected: String, found: String },

    #[error("Failed to persist cache document to {path:?}: {reason}")]
    CacheWriteFailure { path: PathBuf, reason: String },
}

impl ForecastError {
    /// Recoverable errors skip one ticker for the cycle instead of failing the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ForecastError::DataUnavailable { .. } | ForecastError::InsufficientHistory { .. }
        )
    }
}
