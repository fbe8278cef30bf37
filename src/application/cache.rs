use crate::application::pipeline::ForecastPipeline;
use crate::domain::prediction::{CacheDocument, TickerForecast};
use crate::infrastructure::cache_store::CacheStore;
use anyhow::Result;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

/// Serves the current forecast document and governs when the expensive
/// pipeline re-runs.
///
/// Reads only clone an `Arc` out of a briefly-held `RwLock`; no reader ever
/// blocks on a refresh it did not trigger. Refreshes are single-flight: the
/// `refresh_guard` mutex serializes them process-wide, and the freshness
/// check is repeated under the guard so late arrivals read the result of the
/// run that beat them instead of starting another.
///
/// The entry is replaced wholesale and only after a fully completed,
/// persisted run; a run that fails partway leaves the previous entry in
/// place ("stale but present" is a normal operating state).
pub struct ResultCache {
    pipeline: ForecastPipeline,
    store: CacheStore,
    current: RwLock<Option<Arc<CacheDocument>>>,
    refresh_guard: Mutex<()>,
}

impl ResultCache {
    /// Builds the cache, reloading the previous run's document from disk so
    /// a fresh process can serve inside the freshness window without
    /// recomputing.
    pub fn new(pipeline: ForecastPipeline, store: CacheStore) -> Self {
        let persisted = store.load().map(Arc::new);
        Self {
            pipeline,
            store,
            current: RwLock::new(persisted),
            refresh_guard: Mutex::new(()),
        }
    }

    /// The current document if one exists, at any age.
    pub async fn current(&self) -> Option<Arc<CacheDocument>> {
        self.current.read().await.clone()
    }

    /// Consumer read contract: the cached bundle for one ticker, unmodified.
    /// None means the ticker is not yet modeled.
    pub async fn get_ticker(&self, ticker: &str) -> Option<TickerForecast> {
        self.current
            .read()
            .await
            .as_ref()
            .and_then(|doc| doc.get(ticker).cloned())
    }

    /// Returns the cached document if its age is within `max_age`, otherwise
    /// runs the pipeline (once, process-wide) and atomically replaces the
    /// entry. When a refresh fails and a stale entry exists, the stale entry
    /// is served and the error only logged; the next scheduled attempt
    /// retries in full.
    pub async fn get_or_refresh(&self, max_age: Duration) -> Result<Arc<CacheDocument>> {
        if let Some(fresh) = self.fresh_entry(max_age).await {
            return Ok(fresh);
        }

        let _guard = self.refresh_guard.lock().await;

        // Double-check under the guard: a concurrent caller may have just
        // finished the refresh this caller queued behind.
        if let Some(fresh) = self.fresh_entry(max_age).await {
            return Ok(fresh);
        }

        info!("Cache entry missing or stale; running forecast pipeline");
        match self.refresh().await {
            Ok(document) => Ok(document),
            Err(e) => match self.current().await {
                Some(stale) => {
                    warn!(error = %e, "Refresh failed; serving stale cache entry");
                    Ok(stale)
                }
                None => Err(e.context("Refresh failed with no cached entry to fall back on")),
            },
        }
    }

    async fn fresh_entry(&self, max_age: Duration) -> Option<Arc<CacheDocument>> {
        let entry = self.current.read().await.clone()?;
        (entry.age(Utc::now()) <= max_age).then_some(entry)
    }

    async fn refresh(&self) -> Result<Arc<CacheDocument>> {
        let document = self.pipeline.run().await?;

        // Persist before publishing: a result that cannot be written is
        // discarded so disk and memory never disagree.
        if let Err(e) = self.store.save(&document) {
            error!(error = %e, "Cache write failed; discarding run result");
            return Err(e.into());
        }

        let document = Arc::new(document);
        *self.current.write().await = Some(document.clone());
        Ok(document)
    }
}
