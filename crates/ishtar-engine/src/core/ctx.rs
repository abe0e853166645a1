use std::sync::Arc;

use crate::asset::{AssetHandle, AssetRegistry, PreparedImage, SoundBuffer};
use crate::input::{InputFrame, InputState};
use crate::time::FrameTime;

/// Per-frame context passed to the view-model and view steps.
///
/// Everything is read-only; `'a` is the duration of the callback.
pub struct FrameCtx<'a, S> {
    /// State after this frame's dispatch.
    pub state:       &'a S,
    pub input:       &'a InputState,
    pub input_frame: &'a InputFrame,
    pub assets:      &'a AssetRegistry,
    pub time:        FrameTime,
}

impl<'a, S> FrameCtx<'a, S> {
    pub fn is_available(&self, name: &str) -> bool {
        self.assets.is_available(name)
    }

    /// Prepared pixels of an available image asset.
    pub fn image(&self, name: &str) -> Option<Arc<PreparedImage>> {
        match self.assets.handle(name)? {
            AssetHandle::Image(img) => Some(img),
            AssetHandle::Audio(_) => None,
        }
    }

    pub fn sound(&self, name: &str) -> Option<Arc<SoundBuffer>> {
        match self.assets.handle(name)? {
            AssetHandle::Audio(snd) => Some(snd),
            AssetHandle::Image(_) => None,
        }
    }
}
