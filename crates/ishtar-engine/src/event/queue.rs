use std::sync::Arc;

use parking_lot::Mutex;

use crate::asset::BindingKey;

use super::types::Event;

#[derive(Debug, Default)]
struct Pending {
    events:   Vec<Event>,
    restarts: Vec<BindingKey>,
    deferred: Vec<Event>,
}

/// Everything taken from the queue at one frame boundary.
#[derive(Debug, Default)]
pub(crate) struct Drained {
    pub events:   Vec<Event>,
    /// Bundles whose text completion asks for a restart, in arrival order.
    pub restarts: Vec<BindingKey>,
    /// Immediate events raised off the frame thread, to be routed at this
    /// boundary.
    pub deferred: Vec<Event>,
}

/// Buffer of queued events awaiting the next frame boundary.
///
/// Owned by the frame scheduler, which alone drains it. Other components
/// append through a [`QueueWriter`].
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Arc<Mutex<Pending>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writer(&self) -> QueueWriter {
        QueueWriter { pending: Arc::clone(&self.pending) }
    }

    /// Takes every pending event in insertion order, leaving the queue empty.
    pub(crate) fn drain(&self) -> Drained {
        let mut pending = self.pending.lock();
        Drained {
            events: std::mem::take(&mut pending.events),
            restarts: std::mem::take(&mut pending.restarts),
            deferred: std::mem::take(&mut pending.deferred),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().events.is_empty()
    }
}

/// Append-only handle to an [`EventQueue`].
#[derive(Debug, Clone)]
pub struct QueueWriter {
    pending: Arc<Mutex<Pending>>,
}

impl QueueWriter {
    pub(crate) fn push(&self, event: Event) {
        self.pending.lock().events.push(event);
    }

    /// Appends `event` and flags a restart for `key` under the same lock, so
    /// a drain never sees one without the other.
    pub(crate) fn push_restart(&self, key: BindingKey, event: Event) {
        let mut pending = self.pending.lock();
        pending.restarts.push(key);
        pending.events.push(event);
    }

    /// Holds an immediate event until the scheduler can route it.
    pub(crate) fn push_deferred(&self, event: Event) {
        self.pending.lock().deferred.push(event);
    }
}
