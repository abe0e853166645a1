use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, RwLock};

use super::descriptor::{AssetDescriptor, AssetKind};
use super::error::AssetError;
use super::prepare::AssetHandle;

/// Load state of a declared asset.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AssetState {
    Unregistered,
    Fetching,
    Preparing,
    Available,
    /// Text only: bytes live in the startup context, never in the registry.
    AvailableAtStartupOnly,
    Failed,
}

impl AssetState {
    /// Owned by a running load.
    pub fn is_in_flight(self) -> bool {
        matches!(self, AssetState::Fetching | AssetState::Preparing)
    }

    /// Usable without another fetch (`Available` or cached startup text).
    pub fn is_cached(self) -> bool {
        matches!(self, AssetState::Available | AssetState::AvailableAtStartupOnly)
    }
}

#[derive(Debug)]
struct Record {
    descriptor:    AssetDescriptor,
    state:         AssetState,
    handle:        Option<AssetHandle>,
    failure:       Option<AssetError>,
    fetched_bytes: usize,
}

/// Wakes loads waiting for another load to release a name.
#[derive(Debug, Default)]
struct Settle {
    lock: Mutex<()>,
    cond: Condvar,
}

/// Shared registry of asset declarations and their load state.
///
/// Cloning yields another handle to the same registry. Every mutation takes
/// the write lock; the view path only reads.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    inner:  Arc<RwLock<HashMap<String, Record>>>,
    settle: Arc<Settle>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an asset in the `Unregistered` state.
    ///
    /// Re-declaring a name with the same kind keeps the existing record (and
    /// its state); a different kind is a conflict.
    pub fn declare(&self, descriptor: AssetDescriptor) -> Result<(), AssetError> {
        let mut map = self.inner.write();

        if let Some(existing) = map.get(&descriptor.name) {
            if existing.descriptor.kind != descriptor.kind {
                return Err(AssetError::DuplicateNameConflict {
                    name: descriptor.name,
                    existing: existing.descriptor.kind,
                    requested: descriptor.kind,
                });
            }
            return Ok(());
        }

        log::debug!("asset '{}' declared ({})", descriptor.name, descriptor.kind);
        map.insert(
            descriptor.name.clone(),
            Record {
                descriptor,
                state: AssetState::Unregistered,
                handle: None,
                failure: None,
                fetched_bytes: 0,
            },
        );
        Ok(())
    }

    /// `Unregistered → Fetching`.
    ///
    /// Also accepted from settled states (`Available`, `Failed`, cached text)
    /// so an explicit reload starts from scratch; the old handle is dropped.
    pub fn begin_load(&self, name: &str) -> Result<(), AssetError> {
        self.transition(name, "begin loading", |rec| {
            if rec.state.is_in_flight() {
                return false;
            }
            rec.state = AssetState::Fetching;
            rec.handle = None;
            rec.failure = None;
            true
        })
    }

    /// `Fetching → Preparing`. Only the byte count is recorded.
    pub fn mark_fetched(&self, name: &str, bytes: &[u8]) -> Result<(), AssetError> {
        self.transition(name, "finish fetching", |rec| {
            if rec.state != AssetState::Fetching {
                return false;
            }
            rec.state = AssetState::Preparing;
            rec.fetched_bytes = bytes.len();
            true
        })
    }

    /// `Preparing → Available`, storing the ready handle.
    ///
    /// Text assets are rejected; use [`mark_startup_only`](Self::mark_startup_only).
    pub fn mark_prepared(&self, name: &str, handle: AssetHandle) -> Result<(), AssetError> {
        self.transition(name, "become available", |rec| {
            if rec.state != AssetState::Preparing || rec.descriptor.kind == AssetKind::Text {
                return false;
            }
            rec.state = AssetState::Available;
            rec.handle = Some(handle);
            true
        })
    }

    /// `Preparing → AvailableAtStartupOnly` for text assets.
    pub fn mark_startup_only(&self, name: &str) -> Result<(), AssetError> {
        self.transition(name, "become startup text", |rec| {
            if rec.state != AssetState::Preparing || rec.descriptor.kind != AssetKind::Text {
                return false;
            }
            rec.state = AssetState::AvailableAtStartupOnly;
            true
        })
    }

    /// Any in-flight or unregistered state `→ Failed`. Terminal until an
    /// explicit reload.
    pub fn mark_failed(&self, name: &str, cause: AssetError) -> Result<(), AssetError> {
        self.transition(name, "fail", |rec| {
            if matches!(
                rec.state,
                AssetState::Available | AssetState::AvailableAtStartupOnly | AssetState::Failed
            ) {
                return false;
            }
            rec.state = AssetState::Failed;
            rec.handle = None;
            rec.failure = Some(cause);
            true
        })
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.state(name) == Some(AssetState::Available)
    }

    pub fn handle(&self, name: &str) -> Option<AssetHandle> {
        self.inner.read().get(name).and_then(|rec| rec.handle.clone())
    }

    /// `None` when the name was never declared.
    pub fn state(&self, name: &str) -> Option<AssetState> {
        self.inner.read().get(name).map(|rec| rec.state)
    }

    pub fn descriptor(&self, name: &str) -> Option<AssetDescriptor> {
        self.inner.read().get(name).map(|rec| rec.descriptor.clone())
    }

    /// Cause recorded by the last `mark_failed`.
    pub fn failure(&self, name: &str) -> Option<AssetError> {
        self.inner.read().get(name).and_then(|rec| rec.failure.clone())
    }

    pub fn fetched_bytes(&self, name: &str) -> usize {
        self.inner.read().get(name).map_or(0, |rec| rec.fetched_bytes)
    }

    /// Blocks while `name` is being fetched or prepared, then returns its
    /// settled state. `None` when the name was never declared.
    ///
    /// Only call from a loader thread that holds no in-flight name itself.
    pub fn wait_settled(&self, name: &str) -> Option<AssetState> {
        let mut guard = self.settle.lock.lock();
        loop {
            match self.state(name) {
                Some(state) if state.is_in_flight() => self.settle.cond.wait(&mut guard),
                other => return other,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    fn transition<F>(&self, name: &str, action: &'static str, apply: F) -> Result<(), AssetError>
    where
        F: FnOnce(&mut Record) -> bool,
    {
        let mut map = self.inner.write();
        let rec = map.get_mut(name).ok_or_else(|| AssetError::UnknownAsset {
            name: name.to_string(),
        })?;

        let from = rec.state;
        if !apply(rec) {
            return Err(AssetError::InvalidTransition {
                name: name.to_string(),
                from,
                action,
            });
        }

        let to = rec.state;
        drop(map);
        log::debug!("asset '{name}': {from:?} -> {to:?}");

        // Waiters check state under `settle.lock`; taking it here after the
        // write lock is released means no wakeup is missed.
        if from.is_in_flight() && !to.is_in_flight() {
            let _guard = self.settle.lock.lock();
            self.settle.cond.notify_all();
        }
        Ok(())
    }
}
