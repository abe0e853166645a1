use crate::asset::{AssetError, AssetHandle, AssetRegistry, AssetRequest, BundleLoader};
use crate::services::{
    apply_storage,
    AudioNotice,
    AudioRequest,
    AudioSink,
    MemoryStorage,
    NetworkTransport,
    NullAudio,
    NullTransport,
    StorageBackend,
};

use super::queue::QueueWriter;
use super::types::Event;

/// Delivery class of an event.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EventClass {
    /// Acted on by its owning subsystem the moment it is routed.
    Immediate,
    /// Deferred to the next frame boundary.
    Queued,
}

/// Total classification of every event.
///
/// Requests to the asset, audio, storage and network subsystems are
/// immediate. Notices, input, navigation, ticks, bundle lifecycle and custom
/// events are queued.
pub fn classify(event: &Event) -> EventClass {
    match event {
        Event::Asset(_) | Event::Audio(_) | Event::Storage(_) | Event::Network(_) => {
            EventClass::Immediate
        }
        Event::Tick(_)
        | Event::Input(_)
        | Event::Navigate(_)
        | Event::Bundle(_)
        | Event::AudioNotice(_)
        | Event::StorageNotice(_)
        | Event::NetworkNotice(_)
        | Event::Custom(_) => EventClass::Queued,
    }
}

impl Event {
    pub fn class(&self) -> EventClass {
        classify(self)
    }
}

/// Queue handle given to external backends for reporting completions.
///
/// Queued events go straight to the next frame. Immediate events cannot run
/// off the frame thread, so they are held and routed at the next frame
/// boundary, where their own notices follow the usual rules.
#[derive(Debug, Clone)]
pub struct Notifier {
    writer: QueueWriter,
}

impl Notifier {
    pub(crate) fn new(writer: QueueWriter) -> Self {
        Self { writer }
    }

    pub fn notify(&self, event: Event) {
        match event.class() {
            EventClass::Queued => self.writer.push(event),
            EventClass::Immediate => {
                log::debug!("deferring immediate event {event:?} to the frame boundary");
                self.writer.push_deferred(event);
            }
        }
    }
}

/// Sole ingress to the queued/immediate split.
///
/// Queued events are appended to the frame queue. Immediate events are
/// executed against their subsystem at once, and any notice they produce is
/// routed again as a queued event.
pub struct EventRouter {
    writer:   QueueWriter,
    registry: AssetRegistry,
    bundles:  BundleLoader,
    storage:  Box<dyn StorageBackend>,
    network:  Box<dyn NetworkTransport>,
    audio:    Box<dyn AudioSink>,
}

impl EventRouter {
    pub fn new(writer: QueueWriter, registry: AssetRegistry, bundles: BundleLoader) -> Self {
        Self {
            writer,
            registry,
            bundles,
            storage: Box::new(MemoryStorage::new()),
            network: Box::new(NullTransport),
            audio: Box::new(NullAudio),
        }
    }

    pub fn with_storage(mut self, storage: Box<dyn StorageBackend>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_network(mut self, network: Box<dyn NetworkTransport>) -> Self {
        self.network = network;
        self
    }

    pub fn with_audio(mut self, audio: Box<dyn AudioSink>) -> Self {
        self.audio = audio;
        self
    }

    pub fn notifier(&self) -> Notifier {
        Notifier::new(self.writer.clone())
    }

    pub fn bundles(&self) -> &BundleLoader {
        &self.bundles
    }

    /// Routes one event.
    ///
    /// Declaration-time conflicts from a bundle submission are returned to
    /// the caller and nothing is queued for them.
    pub fn route(&mut self, event: Event) -> Result<(), AssetError> {
        match event {
            Event::Asset(AssetRequest::LoadBundle { key, assets }) => {
                self.bundles.submit(key, assets)
            }
            Event::Asset(AssetRequest::Cancel { key }) => {
                if !self.bundles.cancel(&key) {
                    log::debug!("cancel for inactive bundle '{key}' ignored");
                }
                Ok(())
            }
            Event::Audio(request) => {
                self.play(request);
                Ok(())
            }
            Event::Storage(request) => {
                let notice = apply_storage(self.storage.as_mut(), request);
                self.writer.push(Event::StorageNotice(notice));
                Ok(())
            }
            Event::Network(request) => {
                let notifier = self.notifier();
                self.network.send(request, notifier);
                Ok(())
            }
            queued => {
                self.writer.push(queued);
                Ok(())
            }
        }
    }

    /// Routes each event in order, collecting rejections instead of stopping.
    pub fn route_all(&mut self, events: impl IntoIterator<Item = Event>) -> Vec<AssetError> {
        events
            .into_iter()
            .filter_map(|ev| self.route(ev).err())
            .collect()
    }

    fn play(&mut self, request: AudioRequest) {
        match request {
            AudioRequest::Play { asset, looped, volume } => {
                let sound = match self.registry.handle(&asset) {
                    Some(AssetHandle::Audio(sound)) => sound,
                    _ => {
                        self.fail_audio(asset, "asset is not available audio".to_string());
                        return;
                    }
                };
                if let Err(reason) = self.audio.play(&asset, sound, looped, volume) {
                    self.fail_audio(asset, reason);
                }
            }
            AudioRequest::Stop { asset } => self.audio.stop(Some(&asset)),
            AudioRequest::StopAll => self.audio.stop(None),
        }
    }

    fn fail_audio(&self, asset: String, reason: String) {
        log::warn!("audio '{asset}': {reason}");
        self.writer.push(Event::AudioNotice(AudioNotice::Failed { asset, reason }));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::asset::fixtures::WAV_BYTES;
    use crate::asset::{AssetDescriptor, AssetLoader, MemoryFetcher, SoundBuffer, TextStore};
    use crate::event::{EventQueue, Route};
    use crate::services::{NetworkNotice, NetworkRequest, SocketRequest, StorageNotice, StorageRequest};

    fn router(queue: &EventQueue) -> (EventRouter, AssetRegistry) {
        let fetcher = Arc::new(MemoryFetcher::new().with("beep.wav", WAV_BYTES.to_vec()));
        let registry = AssetRegistry::new();
        let loader = AssetLoader::new(registry.clone(), TextStore::new(), fetcher);
        let bundles = BundleLoader::new(loader, queue.writer(), 1);
        (EventRouter::new(queue.writer(), registry.clone(), bundles), registry)
    }

    #[derive(Default)]
    struct Recorder {
        played: Arc<parking_lot::Mutex<Vec<String>>>,
    }

    impl AudioSink for Recorder {
        fn play(&mut self, asset: &str, _: Arc<SoundBuffer>, _: bool, _: f32) -> Result<(), String> {
            self.played.lock().push(asset.to_string());
            Ok(())
        }
        fn stop(&mut self, _: Option<&str>) {}
    }

    // ── classification ────────────────────────────────────────────────────

    #[test]
    fn requests_are_immediate_everything_else_queued() {
        let immediate = [
            Event::Asset(AssetRequest::Cancel { key: "k".into() }),
            Event::Audio(AudioRequest::StopAll),
            Event::Storage(StorageRequest::DeleteAll),
            Event::Network(NetworkRequest::Socket(SocketRequest::Close { url: "u".into() })),
        ];
        for ev in &immediate {
            assert_eq!(ev.class(), EventClass::Immediate, "{ev:?}");
        }

        let queued = [
            Event::Navigate(Route::new("menu")),
            Event::StorageNotice(StorageNotice::DeletedAll),
            Event::custom("anything", 7u8),
        ];
        for ev in &queued {
            assert_eq!(ev.class(), EventClass::Queued, "{ev:?}");
        }
    }

    // ── routing ───────────────────────────────────────────────────────────

    #[test]
    fn queued_events_land_in_queue() {
        let queue = EventQueue::new();
        let (mut router, _) = router(&queue);
        router.route(Event::Navigate(Route::new("menu"))).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn storage_acts_now_and_queues_notice() {
        let queue = EventQueue::new();
        let (mut router, _) = router(&queue);
        router
            .route(Event::Storage(StorageRequest::Save { key: "s".into(), data: vec![1] }))
            .unwrap();

        let events = queue.drain().events;
        assert!(matches!(
            events.as_slice(),
            [Event::StorageNotice(StorageNotice::Saved { key })] if key == "s"
        ));
    }

    #[test]
    fn null_transport_reports_error_notice() {
        let queue = EventQueue::new();
        let (mut router, _) = router(&queue);
        router
            .route(Event::Network(NetworkRequest::Socket(SocketRequest::ConnectOnly {
                url: "ws://host".into(),
            })))
            .unwrap();

        let events = queue.drain().events;
        assert!(matches!(
            events.as_slice(),
            [Event::NetworkNotice(NetworkNotice::Error { url, .. })] if url == "ws://host"
        ));
    }

    #[test]
    fn playing_unavailable_audio_queues_failure() {
        let queue = EventQueue::new();
        let (mut router, _) = router(&queue);
        router
            .route(Event::Audio(AudioRequest::Play { asset: "beep".into(), looped: false, volume: 1.0 }))
            .unwrap();

        let events = queue.drain().events;
        assert!(matches!(
            events.as_slice(),
            [Event::AudioNotice(AudioNotice::Failed { asset, .. })] if asset == "beep"
        ));
    }

    #[test]
    fn playing_available_audio_reaches_sink() {
        let queue = EventQueue::new();
        let (router, _) = router(&queue);
        let sink = Recorder::default();
        let played = Arc::clone(&sink.played);
        let mut router = router.with_audio(Box::new(sink));

        router
            .route(Event::Asset(AssetRequest::LoadBundle {
                key: "sfx".into(),
                assets: vec![AssetDescriptor::audio("beep", "beep.wav")],
            }))
            .unwrap();
        router.bundles().wait_idle();
        queue.drain();

        router
            .route(Event::Audio(AudioRequest::Play { asset: "beep".into(), looped: true, volume: 0.5 }))
            .unwrap();
        assert_eq!(*played.lock(), vec!["beep".to_string()]);
        assert!(queue.is_empty());
    }

    #[test]
    fn duplicate_bundle_key_returned_not_queued() {
        let queue = EventQueue::new();
        let (mut router, _) = router(&queue);
        let submit = || Event::Asset(AssetRequest::LoadBundle {
            key: "k".into(),
            assets: vec![AssetDescriptor::audio("beep", "beep.wav")],
        });
        router.route(submit()).unwrap();
        let err = router.route(submit()).unwrap_err();
        assert!(matches!(err, AssetError::DuplicateKeyInFlight { .. }));
    }

    #[test]
    fn notifier_defers_immediate_events() {
        let queue = EventQueue::new();
        let (mut router, _) = router(&queue);
        let notifier = router.notifier();
        notifier.notify(Event::Network(NetworkRequest::Socket(SocketRequest::Send {
            url: "ws://host".into(),
            data: vec![1],
        })));
        notifier.notify(Event::StorageNotice(StorageNotice::DeletedAll));

        let drained = queue.drain();
        assert_eq!(drained.events.len(), 1);
        assert_eq!(drained.deferred.len(), 1);

        // Routing the held request reports the transport failure as a notice.
        assert!(router.route_all(drained.deferred).is_empty());
        assert!(matches!(
            queue.drain().events.as_slice(),
            [Event::NetworkNotice(NetworkNotice::Error { url, .. })] if url == "ws://host"
        ));
    }
}
