// Multinomial gradient boosting over regression trees
pub mod boosting;

// Result cache with single-flight refresh
pub mod cache;

// Feature vector construction
pub mod features;

// Batch orchestration
pub mod pipeline;

// Probability production from trained artifacts
pub mod predictor;

// Walk-forward training and backtesting
pub mod trainer;
