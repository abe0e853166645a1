use crate::asset::{AssetDescriptor, AssetKind, BindingKey, TextStore};
use crate::event::Event;

/// Decides when a completed bundle forces the application to re-initialize,
/// and what survives the reset.
///
/// Text is only ever interpreted by `App::init`. A bundle that brought new
/// text therefore discards the running state and re-runs initialization
/// with the text visible.
#[derive(Debug, Default)]
pub struct RestartController {
    restarts: u64,
}

impl RestartController {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when a text member of a successful bundle has not yet been
    /// shown to any `App::init`.
    ///
    /// Text cached by an earlier, failed run of the same bundle still
    /// counts. Text an initialization already saw never restarts again.
    pub fn needs_restart(members: &[AssetDescriptor], texts: &TextStore) -> bool {
        members
            .iter()
            .any(|d| d.kind == AssetKind::Text && texts.is_unseen(&d.name))
    }

    /// Filters a drained frame sequence down to what the fresh state should
    /// still see: input events and the lifecycle events of the bundles that
    /// triggered the restart.
    pub(crate) fn carry_over(triggers: &[BindingKey], events: Vec<Event>) -> Vec<Event> {
        let before = events.len();
        let kept: Vec<Event> = events
            .into_iter()
            .filter(|ev| match ev {
                Event::Input(_) => true,
                Event::Bundle(b) => triggers.contains(b.key()),
                _ => false,
            })
            .collect();
        if kept.len() < before {
            log::debug!("restart dropped {} stale events", before - kept.len());
        }
        kept
    }

    pub(crate) fn record(&mut self) {
        self.restarts += 1;
    }

    /// Number of restarts performed so far.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }
}
