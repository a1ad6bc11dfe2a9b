//! Crash-recovery cache of the last assembled document.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::document::schema::ConfigDocument;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache file {path} is not a valid config document: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type CacheResult<T> = Result<T, CacheError>;

/// JSON file holding the last document this agent assembled.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached document. `Ok(None)` when no cache exists yet.
    pub fn load(&self) -> CacheResult<Option<ConfigDocument>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = File::open(&self.path).map_err(|source| self.io_error(source))?;
        let doc = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            CacheError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        Ok(Some(doc))
    }

    /// Persist the document. Written to a sibling temp file first and
    /// renamed over the target, so a crash never leaves a torn cache.
    pub fn save(&self, doc: &ConfigDocument) -> CacheResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp).map_err(|source| self.io_error(source))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, doc).map_err(|source| CacheError::Json {
                path: tmp.clone(),
                source,
            })?;
            writer.flush().map_err(|source| self.io_error(source))?;
        }
        fs::rename(&tmp, &self.path).map_err(|source| self.io_error(source))?;

        tracing::debug!(path = %self.path.display(), "Saved local config cache");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_cache_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested").join("caddy-output.json"));

        let doc = ConfigDocument::skeleton("0.0.0.0:2019", &[":80".to_string()]);
        store.save(&doc).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_corrupt_cache_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caddy-output.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = CacheStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CacheError::Json { .. }));
    }
}
