use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use parking_lot::Mutex;

use super::error::FetchError;

/// Source of raw asset bytes.
///
/// Called from loader threads. Timeouts and retries are the transport's
/// business and surface as [`FetchError`].
pub trait Fetcher: Send + Sync {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError>;
}

/// Reads assets from a directory on disk.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FetchError> {
        let rel = Path::new(path);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(FetchError::new(path, "locator must stay inside the asset root"));
        }
        Ok(self.root.join(rel))
    }
}

impl Fetcher for FsFetcher {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let full = self.resolve(path)?;
        std::fs::read(&full).map_err(|e| FetchError::new(path, e.to_string()))
    }
}

/// In-memory blobs keyed by locator, with a per-locator fetch counter.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    blobs:  Mutex<HashMap<String, Vec<u8>>>,
    counts: Mutex<HashMap<String, usize>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.blobs.lock().insert(path.into(), bytes.into());
    }

    /// Number of fetch attempts made for `path`, including failed ones.
    pub fn fetch_count(&self, path: &str) -> usize {
        self.counts.lock().get(path).copied().unwrap_or(0)
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        *self.counts.lock().entry(path.to_string()).or_insert(0) += 1;
        self.blobs
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::new(path, "not found"))
    }
}
