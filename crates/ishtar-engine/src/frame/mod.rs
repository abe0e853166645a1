//! Frame-synchronous event loop.
//!
//! One [`FrameScheduler::step`] is one frame: drain the queue, append the
//! tick, thread the state through `App::update` for each event, derive
//! input, then build the view. Text-bundle completions divert through the
//! [`RestartController`] before dispatch.

mod restart;
mod scheduler;

pub use restart::RestartController;
pub use scheduler::{FrameOutput, FrameScheduler, SchedulerPhase};
