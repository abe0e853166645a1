//! Core engine-facing contracts.
//!
//! Defines the application trait driven by the frame scheduler, the
//! read-only per-frame context, and the builder that wires registry,
//! loaders and services together.

mod app;
mod ctx;
mod engine;

pub use app::{App, AppControl};
pub use ctx::FrameCtx;
pub use engine::{EngineBuilder, EngineConfig, StartupReport};
