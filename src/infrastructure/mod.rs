// On-disk cache document persistence
pub mod cache_store;

// ETL CSV exports as a data source
pub mod csv_source;

// Deterministic synthetic data source (demo mode and tests)
pub mod mock;
