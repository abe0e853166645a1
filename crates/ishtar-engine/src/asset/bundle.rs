use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};

use crate::event::{Event, QueueWriter};
use crate::frame::RestartController;

use super::descriptor::AssetDescriptor;
use super::error::AssetError;
use super::loader::{AssetLoader, LoadOutcome};

/// Opaque correlation id chosen by the application for a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey(Arc<str>);

impl BindingKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BindingKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BindingKey {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle notification for one bundle key.
///
/// Per key: one `Started`, zero or more `Progress`, then exactly one of
/// `Success` / `Failure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleEvent {
    Started {
        key: BindingKey,
    },
    Progress {
        key:       BindingKey,
        percent:   u32,
        completed: usize,
        total:     usize,
    },
    Success {
        key: BindingKey,
    },
    Failure {
        key:    BindingKey,
        failed: Vec<String>,
    },
}

impl BundleEvent {
    pub fn key(&self) -> &BindingKey {
        match self {
            BundleEvent::Started { key }
            | BundleEvent::Progress { key, .. }
            | BundleEvent::Success { key }
            | BundleEvent::Failure { key, .. } => key,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BundleEvent::Success { .. } | BundleEvent::Failure { .. })
    }
}

/// Asset-load requests. Routed as immediate events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRequest {
    LoadBundle {
        key:    BindingKey,
        assets: Vec<AssetDescriptor>,
    },
    /// Late events for `key` are dropped at delivery; in-flight I/O finishes.
    Cancel {
        key: BindingKey,
    },
}

/// Progress snapshot of an active bundle.
///
/// `total` counts only the members that needed loading; cached members are
/// skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub key:       BindingKey,
    pub members:   Vec<AssetDescriptor>,
    pub completed: usize,
    pub total:     usize,
}

struct Entry {
    bundle: Bundle,
    live:   bool,
}

struct Job {
    key:     BindingKey,
    members: Vec<AssetDescriptor>,
    load:    Vec<AssetDescriptor>,
}

struct Shared {
    loader:      AssetLoader,
    writer:      QueueWriter,
    table:       Mutex<HashMap<BindingKey, Entry>>,
    outstanding: Mutex<usize>,
    idle:        Condvar,
}

struct WorkerPool {
    jobs:    Mutex<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel ends each worker's receive loop.
        self.jobs.lock().take();
        for handle in self.handles.lock().drain(..) {
            if handle.join().is_err() {
                log::error!("bundle worker panicked");
            }
        }
    }
}

/// Loads keyed batches of assets on background workers.
///
/// Lifecycle notifications are appended to the event queue and reach the
/// application at the next frame boundary. An entry stays active from
/// `submit` until its terminal event is delivered (or dropped as stale).
#[derive(Clone)]
pub struct BundleLoader {
    shared: Arc<Shared>,
    pool:   Arc<WorkerPool>,
}

impl BundleLoader {
    pub fn new(loader: AssetLoader, writer: QueueWriter, workers: usize) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded::<Job>();
        let shared = Arc::new(Shared {
            loader,
            writer,
            table: Mutex::new(HashMap::new()),
            outstanding: Mutex::new(0),
            idle: Condvar::new(),
        });

        let mut handles = Vec::new();
        for i in 0..workers.max(1) {
            let rx = rx.clone();
            let shared = Arc::clone(&shared);
            let spawned = std::thread::Builder::new()
                .name(format!("ishtar-bundle-{i}"))
                .spawn(move || {
                    for job in rx.iter() {
                        shared.run(job);
                    }
                });
            match spawned {
                Ok(h) => handles.push(h),
                Err(e) => log::error!("failed to spawn bundle worker {i}: {e}"),
            }
        }

        Self {
            shared,
            pool: Arc::new(WorkerPool {
                jobs: Mutex::new(Some(tx)),
                handles: Mutex::new(handles),
            }),
        }
    }

    /// Starts loading `assets` under `key`.
    ///
    /// Fails synchronously with `DuplicateKeyInFlight` while `key` is active,
    /// or `DuplicateNameConflict` if a member clashes with an existing
    /// declaration; nothing is queued in either case. Members already
    /// available (or cached startup text) are not fetched again.
    pub fn submit(&self, key: BindingKey, assets: Vec<AssetDescriptor>) -> Result<(), AssetError> {
        let registry = self.shared.loader.registry();
        let mut table = self.shared.table.lock();

        if table.contains_key(&key) {
            return Err(AssetError::DuplicateKeyInFlight { key });
        }

        let mut seen = HashSet::new();
        let members: Vec<AssetDescriptor> = assets
            .into_iter()
            .filter(|d| seen.insert(d.name.clone()))
            .collect();

        for d in &members {
            if let Some(existing) = registry.descriptor(&d.name) {
                if existing.kind != d.kind {
                    return Err(AssetError::DuplicateNameConflict {
                        name: d.name.clone(),
                        existing: existing.kind,
                        requested: d.kind,
                    });
                }
            }
        }
        for d in &members {
            registry.declare(d.clone())?;
        }

        let load: Vec<AssetDescriptor> = members
            .iter()
            .filter(|d| !registry.state(&d.name).is_some_and(|s| s.is_cached()))
            .cloned()
            .collect();

        log::debug!(
            "bundle '{key}': {} members, {} to load",
            members.len(),
            load.len()
        );

        table.insert(
            key.clone(),
            Entry {
                bundle: Bundle {
                    key: key.clone(),
                    members: members.clone(),
                    completed: 0,
                    total: load.len(),
                },
                live: true,
            },
        );
        drop(table);

        *self.shared.outstanding.lock() += 1;

        let job = Job { key: key.clone(), members, load };
        let sent = match self.pool.jobs.lock().as_ref() {
            Some(tx) => tx.send(job).map_err(|e| e.into_inner()),
            None => Err(job),
        };
        if let Err(job) = sent {
            log::error!("no bundle worker available for '{key}'");
            let failed = job.load.iter().map(|d| d.name.clone()).collect();
            self.shared.writer.push(Event::Bundle(BundleEvent::Started { key: key.clone() }));
            self.shared.writer.push(Event::Bundle(BundleEvent::Failure { key, failed }));
            self.shared.finish_job();
        }

        Ok(())
    }

    /// Marks `key` as no longer wanted. Returns `false` if it is not active.
    pub fn cancel(&self, key: &BindingKey) -> bool {
        match self.shared.table.lock().get_mut(key) {
            Some(entry) => {
                log::debug!("bundle '{key}' cancelled");
                entry.live = false;
                true
            }
            None => false,
        }
    }

    /// Cancels every active bundle whose key is not in `keep`.
    pub fn cancel_all_except(&self, keep: &[BindingKey]) {
        for (key, entry) in self.shared.table.lock().iter_mut() {
            if entry.live && !keep.contains(key) {
                log::debug!("bundle '{key}' discarded");
                entry.live = false;
            }
        }
    }

    pub fn is_live(&self, key: &BindingKey) -> bool {
        self.shared.table.lock().get(key).is_some_and(|e| e.live)
    }

    pub fn progress(&self, key: &BindingKey) -> Option<Bundle> {
        self.shared.table.lock().get(key).map(|e| e.bundle.clone())
    }

    /// Number of active keys (running or awaiting delivery of their terminal
    /// event).
    pub fn active(&self) -> usize {
        self.shared.table.lock().len()
    }

    /// Blocks until no job is running. Never call from the frame stepper.
    pub fn wait_idle(&self) {
        let mut outstanding = self.shared.outstanding.lock();
        while *outstanding > 0 {
            self.shared.idle.wait(&mut outstanding);
        }
    }

    /// Like [`wait_idle`](Self::wait_idle) with a deadline. Returns `true`
    /// when idle.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let mut outstanding = self.shared.outstanding.lock();
        while *outstanding > 0 {
            if self.shared.idle.wait_for(&mut outstanding, timeout).timed_out() {
                return *outstanding == 0;
            }
        }
        true
    }

    /// Liveness check at delivery time.
    ///
    /// Drops bundle events whose key was cancelled and retires a key once
    /// its terminal event passes through.
    pub(crate) fn admit(&self, events: &mut Vec<Event>) {
        let mut table = self.shared.table.lock();
        events.retain(|ev| {
            let Event::Bundle(bev) = ev else {
                return true;
            };
            let key = bev.key();
            let live = table.get(key).is_some_and(|e| e.live);
            if bev.is_terminal() {
                table.remove(key);
            }
            if !live {
                log::debug!("dropping stale bundle event {bev:?}");
            }
            live
        });
    }
}

impl Shared {
    fn run(&self, job: Job) {
        let Job { key, members, load } = job;
        self.writer.push(Event::Bundle(BundleEvent::Started { key: key.clone() }));

        let mut run = self.loader.load(load);
        for p in run.by_ref() {
            if let Some(entry) = self.table.lock().get_mut(&key) {
                entry.bundle.completed = p.completed;
            }
            self.writer.push(Event::Bundle(BundleEvent::Progress {
                key: key.clone(),
                percent: p.percent(),
                completed: p.completed,
                total: p.total,
            }));
        }

        match run.outcome() {
            LoadOutcome::Success => {
                let event = Event::Bundle(BundleEvent::Success { key: key.clone() });
                if RestartController::needs_restart(&members, self.loader.texts()) {
                    log::info!("bundle '{key}' brought new text; restart requested");
                    self.writer.push_restart(key, event);
                } else {
                    log::debug!("bundle '{key}' loaded");
                    self.writer.push(event);
                }
            }
            LoadOutcome::Failure { failed } => {
                log::warn!("bundle '{key}' failed: {}", failed.join(", "));
                self.writer.push(Event::Bundle(BundleEvent::Failure { key, failed }));
            }
        }

        self.finish_job();
    }

    fn finish_job(&self) {
        let mut outstanding = self.outstanding.lock();
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.idle.notify_all();
        }
    }
}
