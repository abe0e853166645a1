use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::asset::{AssetRequest, BundleEvent};
use crate::input::InputEvent;
use crate::services::{
    AudioNotice,
    AudioRequest,
    NetworkNotice,
    NetworkRequest,
    StorageNotice,
    StorageRequest,
};
use crate::time::FrameTime;

/// Scene navigation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    pub scene: String,
}

impl Route {
    pub fn new(scene: impl Into<String>) -> Self {
        Self { scene: scene.into() }
    }
}

/// Application-defined event with an opaque payload.
#[derive(Clone)]
pub struct CustomEvent {
    tag:     String,
    payload: Arc<dyn Any + Send + Sync>,
}

impl CustomEvent {
    pub fn new<T: Any + Send + Sync>(tag: impl Into<String>, payload: T) -> Self {
        Self { tag: tag.into(), payload: Arc::new(payload) }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for CustomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEvent")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

/// Every event the engine knows how to route.
///
/// Requests (`Asset`, `Audio`, `Storage`, `Network`) are acted on the moment
/// they are routed. Everything else waits for the next frame boundary.
#[derive(Debug, Clone)]
pub enum Event {
    /// Frame tick; always the last event of a frame.
    Tick(FrameTime),
    Input(InputEvent),
    Navigate(Route),
    Bundle(BundleEvent),
    Asset(AssetRequest),
    Audio(AudioRequest),
    AudioNotice(AudioNotice),
    Storage(StorageRequest),
    StorageNotice(StorageNotice),
    Network(NetworkRequest),
    NetworkNotice(NetworkNotice),
    Custom(CustomEvent),
}

impl Event {
    pub fn custom<T: Any + Send + Sync>(tag: impl Into<String>, payload: T) -> Self {
        Event::Custom(CustomEvent::new(tag, payload))
    }

    pub fn is_tick(&self) -> bool {
        matches!(self, Event::Tick(_))
    }

    /// Tag of a custom event, `None` for core events.
    pub fn custom_tag(&self) -> Option<&str> {
        match self {
            Event::Custom(c) => Some(c.tag()),
            _ => None,
        }
    }
}

impl From<InputEvent> for Event {
    fn from(ev: InputEvent) -> Self {
        Event::Input(ev)
    }
}

impl From<AssetRequest> for Event {
    fn from(req: AssetRequest) -> Self {
        Event::Asset(req)
    }
}

impl From<AudioRequest> for Event {
    fn from(req: AudioRequest) -> Self {
        Event::Audio(req)
    }
}

impl From<StorageRequest> for Event {
    fn from(req: StorageRequest) -> Self {
        Event::Storage(req)
    }
}

impl From<NetworkRequest> for Event {
    fn from(req: NetworkRequest) -> Self {
        Event::Network(req)
    }
}
