use crate::domain::errors::ForecastError;
use crate::domain::prediction::CacheDocument;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// On-disk persistence for the forecast cache document.
///
/// The document is the sole artifact the presentation layer reads, so writes
/// are atomic: serialize to a temp file, then rename over the previous one. A
/// run that cannot be persisted is discarded rather than half-written.
pub struct CacheStore {
    file_path: PathBuf,
}

impl CacheStore {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.file_path
    }

    /// The previous run's document, if one is on disk and parseable. A
    /// corrupt file is treated as absent, not fatal: the next refresh
    /// rewrites it.
    pub fn load(&self) -> Option<CacheDocument> {
        if !self.file_path.exists() {
            return None;
        }
        let content = match fs::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = ?self.file_path, error = %e, "Failed to read cache file");
                return None;
            }
        };
        match serde_json::from_str::<CacheDocument>(&content) {
            Ok(document) => {
                info!(
                    path = ?self.file_path,
                    generated_at = %document.generated_at,
                    "Loaded cached forecast document"
                );
                Some(document)
            }
            Err(e) => {
                warn!(path = ?self.file_path, error = %e, "Cache file is not parseable");
                None
            }
        }
    }

    pub fn save(&self, document: &CacheDocument) -> Result<(), ForecastError> {
        self.write_atomically(document)
            .map_err(|e| ForecastError::CacheWriteFailure {
                path: self.file_path.clone(),
                reason: format!("{e:#}"),
            })
    }

    fn write_atomically(&self, document: &CacheDocument) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create cache directory")?;
            }
        }

        let content =
            serde_json::to_string_pretty(document).context("Failed to serialize cache document")?;

        // Atomic write: write to temp file then rename
        let temp_path = self.file_path.with_extension("tmp");
        fs::write(&temp_path, content).context("Failed to write temp cache file")?;
        fs::rename(&temp_path, &self.file_path).context("Failed to rename cache file")?;

        info!(path = ?self.file_path, "Saved forecast cache document");
        Ok(())
    }
}
