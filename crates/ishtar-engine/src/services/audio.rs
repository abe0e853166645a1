use std::sync::Arc;

use crate::asset::SoundBuffer;

/// Playback requests. Routed as immediate events.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioRequest {
    Play { asset: String, looped: bool, volume: f32 },
    Stop { asset: String },
    StopAll,
}

/// Playback results. Routed as queued events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioNotice {
    Failed { asset: String, reason: String },
}

/// Audio device backend.
///
/// Only ever handed buffers of assets that are `Available`.
pub trait AudioSink {
    fn play(&mut self, asset: &str, sound: Arc<SoundBuffer>, looped: bool, volume: f32) -> Result<(), String>;
    fn stop(&mut self, asset: Option<&str>);
}

/// Sink that accepts and discards everything.
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, asset: &str, sound: Arc<SoundBuffer>, _looped: bool, _volume: f32) -> Result<(), String> {
        log::trace!("audio '{asset}' ({:.2}s) discarded", sound.duration_secs());
        Ok(())
    }

    fn stop(&mut self, _asset: Option<&str>) {}
}
