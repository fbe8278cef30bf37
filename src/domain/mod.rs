// Domain-specific error types
pub mod errors;

// Feature schema registry
pub mod features;

// Directional labels
pub mod labels;

// Backtest reporting
pub mod model;

// Port interfaces
pub mod ports;

// Forecast output types
pub mod prediction;

// Probability -> action mapping
pub mod recommendation;

// Aligned time series
pub mod series;
