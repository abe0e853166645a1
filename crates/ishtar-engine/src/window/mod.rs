//! Host loops.
//!
//! Drives a [`FrameScheduler`](crate::frame::FrameScheduler) either
//! headless or from a `winit` window, handing each view to a
//! [`Presenter`].

mod runtime;

pub use runtime::{Presenter, Runtime, RuntimeConfig};
