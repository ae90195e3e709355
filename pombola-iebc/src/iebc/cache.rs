//! On-disk cache of raw IEBC responses
//!
//! Each request maps to one JSON file. Cached files are reused on later runs
//! so that re-running the import after fixing a correction table does not hit
//! the API again and sees exactly the same data.

use serde_json::Value;
use std::path::PathBuf;

use super::client::ApiError;

pub struct ResponseCache {
    directory: PathBuf,
    /// Ignore existing files and overwrite them with fresh responses
    refresh: bool,
}

impl ResponseCache {
    /// Open the cache, creating the directory if needed
    pub fn open(directory: impl Into<PathBuf>, refresh: bool) -> Result<Self, ApiError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|e| {
            ApiError::CacheError(format!("Create {} failed: {}", directory.display(), e))
        })?;
        Ok(Self { directory, refresh })
    }

    /// Path for a cache entry; the name is reduced to a safe file name
    pub fn path_for(&self, name: &str) -> PathBuf {
        let safe: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(safe.trim_start_matches('.'))
    }

    /// Cached value, unless missing or a refresh was requested
    pub fn load(&self, name: &str) -> Result<Option<Value>, ApiError> {
        if self.refresh {
            return Ok(None);
        }

        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ApiError::CacheError(format!("Read {} failed: {}", path.display(), e)))?;
        let value = serde_json::from_str(&content).map_err(|e| {
            ApiError::CacheError(format!("Parse {} failed: {}", path.display(), e))
        })?;

        tracing::debug!(file = %path.display(), "Using cached IEBC response");
        Ok(Some(value))
    }

    /// Write a value atomically (temp file + rename)
    pub fn store(&self, name: &str, value: &Value) -> Result<(), ApiError> {
        let path = self.path_for(name);
        let temp_path = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(value)
            .map_err(|e| ApiError::CacheError(format!("Serialize {} failed: {}", name, e)))?;
        std::fs::write(&temp_path, content).map_err(|e| {
            ApiError::CacheError(format!("Write {} failed: {}", temp_path.display(), e))
        })?;
        std::fs::rename(&temp_path, &path).map_err(|e| {
            ApiError::CacheError(format!("Rename to {} failed: {}", path.display(), e))
        })?;

        Ok(())
    }
}
