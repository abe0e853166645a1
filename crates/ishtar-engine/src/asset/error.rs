use thiserror::Error;

use super::descriptor::AssetKind;
use super::registry::AssetState;
use super::bundle::BindingKey;

/// Failures of the asset subsystem.
///
/// Declaration-time variants (`DuplicateNameConflict`, `DuplicateKeyInFlight`)
/// are returned synchronously to the caller. Per-item variants are recorded in
/// the registry and reported through queued bundle notifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("asset '{name}' already declared as {existing}, cannot redeclare as {requested}")]
    DuplicateNameConflict {
        name: String,
        existing: AssetKind,
        requested: AssetKind,
    },

    #[error("unknown asset '{name}'")]
    UnknownAsset { name: String },

    #[error("failed to fetch asset '{name}' from '{path}': {reason}")]
    Fetch {
        name: String,
        path: String,
        reason: String,
    },

    #[error("unsupported image '{name}': {reason}")]
    UnsupportedImage { name: String, reason: String },

    #[error("unsupported audio '{name}': {reason}")]
    UnsupportedAudio { name: String, reason: String },

    #[error("bundle '{key}' is already in flight")]
    DuplicateKeyInFlight { key: BindingKey },

    #[error("asset '{name}' cannot {action} while {from:?}")]
    InvalidTransition {
        name: String,
        from: AssetState,
        action: &'static str,
    },
}

impl AssetError {
    /// Name of the asset this error concerns, if any.
    pub fn asset_name(&self) -> Option<&str> {
        match self {
            AssetError::DuplicateNameConflict { name, .. }
            | AssetError::UnknownAsset { name }
            | AssetError::Fetch { name, .. }
            | AssetError::UnsupportedImage { name, .. }
            | AssetError::UnsupportedAudio { name, .. }
            | AssetError::InvalidTransition { name, .. } => Some(name),
            AssetError::DuplicateKeyInFlight { .. } => None,
        }
    }
}

/// Transport-level fetch failure returned by a [`Fetcher`].
///
/// [`Fetcher`]: super::Fetcher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to fetch '{path}': {reason}")]
pub struct FetchError {
    pub path: String,
    pub reason: String,
}

impl FetchError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { path: path.into(), reason: reason.into() }
    }
}
