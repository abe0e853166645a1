use std::collections::HashMap;

use thiserror::Error;

/// Storage requests. Routed as immediate events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageRequest {
    Save { key: String, data: Vec<u8> },
    Load { key: String },
    Delete { key: String },
    DeleteAll,
}

/// Storage results. Routed as queued events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageNotice {
    Saved { key: String },
    /// `data` is `None` when nothing is stored under `key`.
    Loaded { key: String, data: Option<Vec<u8>> },
    Deleted { key: String },
    DeletedAll,
    /// `key` is `None` for `DeleteAll`.
    Failed { key: Option<String>, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage error: {0}")]
pub struct StorageError(pub String);

/// Opaque key/blob store.
pub trait StorageBackend {
    fn save(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError>;
    fn load(&mut self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;
    fn delete_all(&mut self) -> Result<(), StorageError>;
}

/// Process-local storage that forgets everything on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn save(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.blobs.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn load(&mut self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.blobs.remove(key);
        Ok(())
    }

    fn delete_all(&mut self) -> Result<(), StorageError> {
        self.blobs.clear();
        Ok(())
    }
}

/// Executes `request` against `backend` and describes the result.
pub(crate) fn apply(backend: &mut dyn StorageBackend, request: StorageRequest) -> StorageNotice {
    let failed = |key: Option<String>, e: StorageError| {
        log::warn!("{e}");
        StorageNotice::Failed { key, reason: e.0 }
    };

    match request {
        StorageRequest::Save { key, data } => match backend.save(&key, &data) {
            Ok(()) => StorageNotice::Saved { key },
            Err(e) => failed(Some(key), e),
        },
        StorageRequest::Load { key } => match backend.load(&key) {
            Ok(data) => StorageNotice::Loaded { key, data },
            Err(e) => failed(Some(key), e),
        },
        StorageRequest::Delete { key } => match backend.delete(&key) {
            Ok(()) => StorageNotice::Deleted { key },
            Err(e) => failed(Some(key), e),
        },
        StorageRequest::DeleteAll => match backend.delete_all() {
            Ok(()) => StorageNotice::DeletedAll,
            Err(e) => failed(None, e),
        },
    }
}
