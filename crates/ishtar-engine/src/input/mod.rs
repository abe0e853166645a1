//! Input subsystem.
//!
//! Platform-agnostic: hosts translate native events into [`InputEvent`]s
//! and submit them as queued events. The scheduler derives [`InputState`]
//! and [`InputFrame`] from each frame's delivered input.

mod frame;
mod platform;
mod state;
mod types;

pub use frame::InputFrame;
pub(crate) use platform::translate_window_event;
pub use state::InputState;
pub use types::{ButtonState, InputEvent, Key, Modifiers, MouseButton, WheelDelta};
