//! Event taxonomy, frame queue and routing.
//!
//! Every event is classified as immediate or queued when it is routed.
//! Queued events wait in the [`EventQueue`] for the next frame boundary,
//! where the frame scheduler drains them in insertion order.

mod queue;
mod router;
mod types;

pub use queue::{EventQueue, QueueWriter};
pub(crate) use queue::Drained;
pub use router::{classify, EventClass, EventRouter, Notifier};
pub use types::{CustomEvent, Event, Route};
