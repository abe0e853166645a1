//! Asset subsystem.
//!
//! Declarations and load state live in the [`AssetRegistry`]. The
//! [`AssetLoader`] fetches, decodes and prepares declared assets; the
//! [`BundleLoader`] runs keyed batches of loads on background workers and
//! reports their lifecycle through the event queue.
//!
//! Text assets are never held by the registry. Their bytes go to a
//! [`TextStore`] and are only readable through a [`StartupContext`] during
//! application initialization.

mod bundle;
mod descriptor;
mod error;
mod fetch;
mod loader;
mod prepare;
mod registry;
mod startup;

pub use bundle::{AssetRequest, BindingKey, Bundle, BundleEvent, BundleLoader};
pub use descriptor::{AssetDescriptor, AssetKind};
pub use error::{AssetError, FetchError};
pub use fetch::{Fetcher, FsFetcher, MemoryFetcher};
pub use loader::{percent, AssetLoader, LoadOutcome, LoadProgress, LoadRun};
pub use prepare::{
    AssetHandle,
    ImagePreparer,
    PreparedImage,
    Rgba8Preparer,
    SoundBuffer,
    MAX_IMAGE_DIMENSION,
};
pub use registry::{AssetRegistry, AssetState};
pub use startup::{StartupContext, TextStore};

#[cfg(test)]
pub(crate) use prepare::fixtures;
