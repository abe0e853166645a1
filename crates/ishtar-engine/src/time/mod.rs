//! Time subsystem.
//!
//! One `FrameClock` per scheduler; each frame's tick event carries the
//! `FrameTime` it produced.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
