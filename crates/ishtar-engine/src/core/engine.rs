use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::asset::{
    AssetDescriptor,
    AssetError,
    AssetLoader,
    AssetRegistry,
    BundleLoader,
    Fetcher,
    FsFetcher,
    ImagePreparer,
    LoadOutcome,
    TextStore,
};
use crate::event::{EventQueue, EventRouter};
use crate::frame::FrameScheduler;
use crate::services::{AudioSink, NetworkTransport, StorageBackend};
use crate::time::FrameClock;

use super::app::App;

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Background threads running bundle loads.
    pub bundle_workers: usize,

    /// Frame clock clamps.
    pub dt_min: Duration,
    pub dt_max: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bundle_workers: 2,
            dt_min:         Duration::from_micros(100),
            dt_max:         Duration::from_millis(250),
        }
    }
}

/// Result of the eager startup load.
#[derive(Debug, Clone)]
pub struct StartupReport {
    pub outcome: LoadOutcome,
    /// Recorded cause for each failed startup asset.
    pub failed:  Vec<AssetError>,
}

impl StartupReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

impl Default for StartupReport {
    fn default() -> Self {
        Self { outcome: LoadOutcome::Success, failed: Vec::new() }
    }
}

/// Engine builder.
///
/// Collects backends and startup assets, then [`build`](Self::build)
/// resolves every startup asset before the application's first `init`.
///
/// ```rust,ignore
/// let mut engine = EngineBuilder::new()
///     .fetcher(Arc::new(FsFetcher::new("assets")))
///     .startup_asset(AssetDescriptor::image("font", "font.png"))
///     .startup_asset(AssetDescriptor::text("intro", "intro.txt"))
///     .build(MyApp::default())?;
///
/// loop {
///     let frame = engine.step();
///     present(&frame.view);
/// }
/// ```
pub struct EngineBuilder {
    config:   EngineConfig,
    fetcher:  Option<Arc<dyn Fetcher>>,
    preparer: Option<Arc<dyn ImagePreparer>>,
    storage:  Option<Box<dyn StorageBackend>>,
    network:  Option<Box<dyn NetworkTransport>>,
    audio:    Option<Box<dyn AudioSink>>,
    startup:  Vec<AssetDescriptor>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config:   EngineConfig::default(),
            fetcher:  None,
            preparer: None,
            storage:  None,
            network:  None,
            audio:    None,
            startup:  Vec::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Byte source for every asset. Defaults to the working directory.
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn image_preparer(mut self, preparer: Arc<dyn ImagePreparer>) -> Self {
        self.preparer = Some(preparer);
        self
    }

    /// Defaults to in-memory storage.
    pub fn storage(mut self, storage: Box<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Defaults to a transport that fails every request.
    pub fn transport(mut self, network: Box<dyn NetworkTransport>) -> Self {
        self.network = Some(network);
        self
    }

    /// Defaults to a sink that discards playback.
    pub fn audio(mut self, audio: Box<dyn AudioSink>) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Adds an asset that must resolve before the first frame.
    pub fn startup_asset(mut self, descriptor: AssetDescriptor) -> Self {
        self.startup.push(descriptor);
        self
    }

    pub fn startup_assets(mut self, descriptors: impl IntoIterator<Item = AssetDescriptor>) -> Self {
        self.startup.extend(descriptors);
        self
    }

    /// Loads startup assets, runs `App::init` and returns the ready
    /// scheduler.
    ///
    /// Declaration conflicts are fatal. Individual asset failures are not:
    /// they are logged and listed in the startup report.
    pub fn build<A: App>(self, app: A) -> Result<FrameScheduler<A>> {
        let config = self.config;
        if config.dt_min > config.dt_max {
            bail!("dt_min {:?} exceeds dt_max {:?}", config.dt_min, config.dt_max);
        }

        let registry = AssetRegistry::new();
        let texts = TextStore::new();
        let queue = EventQueue::new();

        let mut seen = HashSet::new();
        let mut startup = Vec::new();
        for desc in self.startup {
            let name = desc.name.clone();
            registry
                .declare(desc.clone())
                .with_context(|| format!("failed to declare startup asset '{name}'"))?;
            if seen.insert(name) {
                startup.push(desc);
            }
        }

        let fetcher = self.fetcher.unwrap_or_else(|| Arc::new(FsFetcher::new(".")));
        let mut loader = AssetLoader::new(registry.clone(), texts.clone(), fetcher);
        if let Some(preparer) = self.preparer {
            loader = loader.with_preparer(preparer);
        }

        let report = load_startup(&loader, startup);

        let bundles = BundleLoader::new(loader, queue.writer(), config.bundle_workers);
        let mut router = EventRouter::new(queue.writer(), registry.clone(), bundles);
        if let Some(storage) = self.storage {
            router = router.with_storage(storage);
        }
        if let Some(network) = self.network {
            router = router.with_network(network);
        }
        if let Some(audio) = self.audio {
            router = router.with_audio(audio);
        }

        let clock = FrameClock::with_clamps(config.dt_min, config.dt_max);
        Ok(FrameScheduler::start(app, queue, router, registry, texts, clock, report))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn load_startup(loader: &AssetLoader, startup: Vec<AssetDescriptor>) -> StartupReport {
    if startup.is_empty() {
        return StartupReport::default();
    }

    let mut run = loader.load(startup);
    for p in run.by_ref() {
        log::debug!("startup asset '{}' resolved ({}/{})", p.name, p.completed, p.total);
    }

    let outcome = run.outcome();
    let failed = match &outcome {
        LoadOutcome::Success => {
            log::info!("startup assets loaded ({})", run.total());
            Vec::new()
        }
        LoadOutcome::Failure { failed } => {
            log::warn!("{} of {} startup assets failed", failed.len(), run.total());
            failed
                .iter()
                .filter_map(|name| loader.registry().failure(name))
                .collect()
        }
    };

    StartupReport { outcome, failed }
}
