//! Ishtar engine crate.
//!
//! A frame-synchronous event loop with an asynchronous asset pipeline.
//! Applications implement [`core::App`]; [`core::EngineBuilder`] resolves
//! startup assets and returns a [`frame::FrameScheduler`] that a host loop
//! from [`window`] steps once per frame.

pub mod asset;
pub mod core;
pub mod event;
pub mod frame;
pub mod input;
pub mod logging;
pub mod services;
pub mod time;
pub mod window;
