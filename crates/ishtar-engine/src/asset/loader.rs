use std::sync::Arc;

use super::descriptor::{AssetDescriptor, AssetKind};
use super::error::AssetError;
use super::fetch::Fetcher;
use super::prepare::{prepare_audio, prepare_image, AssetHandle, ImagePreparer, Rgba8Preparer};
use super::registry::{AssetRegistry, AssetState};
use super::startup::TextStore;

/// Integer percentage of `completed / total`, rounded down.
///
/// An empty batch counts as complete.
pub fn percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    (completed as u64 * 100 / total as u64) as u32
}

/// Result of one resolved item within a load run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProgress {
    pub name:      String,
    pub kind:      AssetKind,
    pub completed: usize,
    pub total:     usize,
    pub result:    Result<(), AssetError>,
}

impl LoadProgress {
    pub fn percent(&self) -> u32 {
        percent(self.completed, self.total)
    }
}

/// Aggregate outcome of a load run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Success,
    /// Names of the items that failed, in resolution order.
    Failure { failed: Vec<String> },
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadOutcome::Success)
    }
}

/// Fetches, decodes and prepares assets, updating the registry as it goes.
///
/// Cheap to clone; clones share registry, text store, fetcher and preparer.
#[derive(Clone)]
pub struct AssetLoader {
    registry: AssetRegistry,
    texts:    TextStore,
    fetcher:  Arc<dyn Fetcher>,
    preparer: Arc<dyn ImagePreparer>,
}

impl AssetLoader {
    pub fn new(registry: AssetRegistry, texts: TextStore, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            registry,
            texts,
            fetcher,
            preparer: Arc::new(Rgba8Preparer),
        }
    }

    pub fn with_preparer(mut self, preparer: Arc<dyn ImagePreparer>) -> Self {
        self.preparer = preparer;
        self
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn texts(&self) -> &TextStore {
        &self.texts
    }

    /// Starts a lazy load of `descriptors`.
    ///
    /// Nothing happens until the returned run is iterated; each `next()`
    /// resolves exactly one item. Names are loaded from scratch even when
    /// already available.
    pub fn load(&self, descriptors: Vec<AssetDescriptor>) -> LoadRun {
        LoadRun {
            loader:      self.clone(),
            total:       descriptors.len(),
            pending:     descriptors.into_iter(),
            completed:   0,
            failed:      Vec::new(),
        }
    }

    fn load_one(&self, desc: &AssetDescriptor) -> Result<(), AssetError> {
        if let Err(err) = self.registry.begin_load(&desc.name) {
            return self.join_in_flight(desc, err);
        }

        let result = self.fetch_and_prepare(desc);
        if let Err(err) = &result {
            log::warn!("asset '{}' failed: {err}", desc.name);
            if let Err(e) = self.registry.mark_failed(&desc.name, err.clone()) {
                log::debug!("could not record failure for '{}': {e}", desc.name);
            }
        }
        result
    }

    /// Another run owns `desc`: wait for it and report its outcome as ours.
    /// Any other refusal of `begin_load` is returned untouched.
    fn join_in_flight(&self, desc: &AssetDescriptor, refused: AssetError) -> Result<(), AssetError> {
        let name = desc.name.as_str();
        if !matches!(&refused, AssetError::InvalidTransition { from, .. } if from.is_in_flight()) {
            return Err(refused);
        }

        log::debug!("asset '{name}' is loading elsewhere; waiting");
        match self.registry.wait_settled(name) {
            Some(state) if state.is_cached() => Ok(()),
            Some(AssetState::Failed) => Err(self.registry.failure(name).unwrap_or(refused)),
            _ => Err(refused),
        }
    }

    fn fetch_and_prepare(&self, desc: &AssetDescriptor) -> Result<(), AssetError> {
        let name = desc.name.as_str();

        let bytes = self.fetcher.fetch(&desc.path).map_err(|e| AssetError::Fetch {
            name: name.to_string(),
            path: e.path,
            reason: e.reason,
        })?;
        self.registry.mark_fetched(name, &bytes)?;

        match desc.kind {
            AssetKind::Image => {
                let img = prepare_image(name, &bytes, &*self.preparer)?;
                self.registry.mark_prepared(name, AssetHandle::Image(Arc::new(img)))
            }
            AssetKind::Audio => {
                let snd = prepare_audio(name, &bytes)?;
                self.registry.mark_prepared(name, AssetHandle::Audio(Arc::new(snd)))
            }
            AssetKind::Text => {
                self.texts.insert(name, bytes);
                self.registry.mark_startup_only(name)
            }
        }
    }
}

/// Lazy, finite sequence of [`LoadProgress`] items for one `load` call.
pub struct LoadRun {
    loader:      AssetLoader,
    pending:     std::vec::IntoIter<AssetDescriptor>,
    completed:   usize,
    total:       usize,
    failed:      Vec<String>,
}

impl LoadRun {
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_finished(&self) -> bool {
        self.completed == self.total
    }

    /// Outcome of the items resolved so far.
    pub fn outcome(&self) -> LoadOutcome {
        if self.failed.is_empty() {
            LoadOutcome::Success
        } else {
            LoadOutcome::Failure { failed: self.failed.clone() }
        }
    }

    /// Resolves all remaining items and returns the aggregate outcome.
    pub fn finish(mut self) -> LoadOutcome {
        while self.next().is_some() {}
        self.outcome()
    }
}

impl Iterator for LoadRun {
    type Item = LoadProgress;

    fn next(&mut self) -> Option<LoadProgress> {
        let desc = self.pending.next()?;
        let result = self.loader.load_one(&desc);

        self.completed += 1;
        if result.is_err() {
            self.failed.push(desc.name.clone());
        }

        Some(LoadProgress {
            name: desc.name,
            kind: desc.kind,
            completed: self.completed,
            total: self.total,
            result,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pending.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::fetch::MemoryFetcher;
    use crate::asset::prepare::fixtures::{png, png_header_only, WAV_BYTES};

    fn setup(fetcher: MemoryFetcher, descs: &[AssetDescriptor]) -> (AssetLoader, Arc<MemoryFetcher>, TextStore) {
        let registry = AssetRegistry::new();
        for d in descs {
            registry.declare(d.clone()).unwrap();
        }
        let fetcher = Arc::new(fetcher);
        let texts = TextStore::new();
        let loader = AssetLoader::new(registry, texts.clone(), fetcher.clone());
        (loader, fetcher, texts)
    }

    // ── percent ───────────────────────────────────────────────────────────

    #[test]
    fn percent_rounds_down() {
        assert_eq!(percent(3, 7), 42);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 66);
        assert_eq!(percent(7, 7), 100);
        assert_eq!(percent(0, 0), 100);
    }

    // ── runs ──────────────────────────────────────────────────────────────

    #[test]
    fn run_is_lazy() {
        let descs = [AssetDescriptor::image("font", "font.png")];
        let (loader, fetcher, _) = setup(MemoryFetcher::new().with("font.png", png(4, 4, [0; 4])), &descs);

        let run = loader.load(descs.to_vec());
        assert_eq!(fetcher.fetch_count("font.png"), 0);
        assert_eq!(run.finish(), LoadOutcome::Success);
        assert_eq!(fetcher.fetch_count("font.png"), 1);
    }

    #[test]
    fn mixed_kinds_resolve_to_their_terminal_states() {
        let descs = [
            AssetDescriptor::image("font", "font.png"),
            AssetDescriptor::audio("beep", "beep.wav"),
            AssetDescriptor::text("intro", "intro.txt"),
        ];
        let fetcher = MemoryFetcher::new()
            .with("font.png", png(100, 100, [1, 2, 3, 255]))
            .with("beep.wav", WAV_BYTES.to_vec())
            .with("intro.txt", b"once upon a time".to_vec());
        let (loader, _, texts) = setup(fetcher, &descs);

        let progress: Vec<_> = loader.load(descs.to_vec()).collect();
        assert_eq!(
            progress.iter().map(|p| (p.completed, p.total)).collect::<Vec<_>>(),
            vec![(1, 3), (2, 3), (3, 3)]
        );
        assert!(progress.iter().all(|p| p.result.is_ok()));

        let reg = loader.registry();
        assert!(reg.is_available("font"));
        assert!(reg.is_available("beep"));
        assert!(!reg.is_available("intro"));
        assert_eq!(reg.state("intro"), Some(AssetState::AvailableAtStartupOnly));
        assert_eq!(texts.snapshot().get_str("intro"), Some("once upon a time"));
    }

    #[test]
    fn one_failure_does_not_abort_the_batch() {
        let descs = [
            AssetDescriptor::image("huge", "huge.png"),
            AssetDescriptor::image("missing", "missing.png"),
            AssetDescriptor::image("font", "font.png"),
        ];
        let fetcher = MemoryFetcher::new()
            .with("huge.png", png_header_only(5000, 5000))
            .with("font.png", png(8, 8, [0; 4]));
        let (loader, _, _) = setup(fetcher, &descs);

        let mut run = loader.load(descs.to_vec());
        let first = run.next().unwrap();
        assert!(matches!(first.result, Err(AssetError::UnsupportedImage { .. })));
        let second = run.next().unwrap();
        assert!(matches!(second.result, Err(AssetError::Fetch { .. })));

        assert_eq!(
            run.finish(),
            LoadOutcome::Failure { failed: vec!["huge".into(), "missing".into()] }
        );

        let reg = loader.registry();
        assert_eq!(reg.state("huge"), Some(AssetState::Failed));
        assert!(matches!(reg.failure("huge"), Some(AssetError::UnsupportedImage { .. })));
        assert!(reg.is_available("font"));
    }

    #[test]
    fn undeclared_asset_fails_without_record() {
        let (loader, fetcher, _) = setup(MemoryFetcher::new(), &[]);
        let outcome = loader.load(vec![AssetDescriptor::image("ghost", "ghost.png")]).finish();

        assert_eq!(outcome, LoadOutcome::Failure { failed: vec!["ghost".into()] });
        assert_eq!(loader.registry().state("ghost"), None);
        assert_eq!(fetcher.fetch_count("ghost.png"), 0);
    }

    #[test]
    fn fresh_load_refetches_available_names() {
        let descs = [AssetDescriptor::image("font", "font.png")];
        let (loader, fetcher, _) = setup(MemoryFetcher::new().with("font.png", png(2, 2, [0; 4])), &descs);

        loader.load(descs.to_vec()).finish();
        loader.load(descs.to_vec()).finish();
        assert_eq!(fetcher.fetch_count("font.png"), 2);
        assert!(loader.registry().is_available("font"));
    }

    // ── shared names ──────────────────────────────────────────────────────

    #[test]
    fn in_flight_name_takes_owners_success() {
        let descs = [AssetDescriptor::image("font", "font.png")];
        let (loader, fetcher, _) = setup(MemoryFetcher::new().with("font.png", png(2, 2, [0; 4])), &descs);

        // Another run owns the name and finishes a moment later.
        let registry = loader.registry().clone();
        registry.begin_load("font").unwrap();
        let owner = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            registry.mark_fetched("font", &[0]).unwrap();
            registry.mark_prepared("font", AssetHandle::Image(Arc::new(
                crate::asset::prepare::PreparedImage { width: 2, height: 2, pixels: vec![0; 16] },
            ))).unwrap();
        });

        assert_eq!(loader.load(descs.to_vec()).finish(), LoadOutcome::Success);
        assert_eq!(fetcher.fetch_count("font.png"), 0);
        owner.join().unwrap();
    }

    #[test]
    fn in_flight_name_takes_owners_failure() {
        let descs = [AssetDescriptor::image("font", "font.png")];
        let (loader, _, _) = setup(MemoryFetcher::new(), &descs);

        let registry = loader.registry().clone();
        registry.begin_load("font").unwrap();
        let cause = AssetError::Fetch { name: "font".into(), path: "font.png".into(), reason: "gone".into() };
        let owner = {
            let cause = cause.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(20));
                registry.mark_failed("font", cause).unwrap();
            })
        };

        let mut run = loader.load(descs.to_vec());
        assert_eq!(run.next().map(|p| p.result), Some(Err(cause)));
        owner.join().unwrap();
    }

    #[test]
    fn missing_text_is_not_stored() {
        let descs = [AssetDescriptor::text("intro", "intro.txt")];
        let (loader, _, texts) = setup(MemoryFetcher::new(), &descs);
        let mut run = loader.load(descs.to_vec());
        assert!(run.next().is_some_and(|p| p.result.is_err()));
        assert!(run.is_finished());
        assert!(texts.is_empty());
    }
}
