use std::collections::HashSet;

use super::types::{InputEvent, Key, MouseButton, WheelDelta};

/// Transitions observed during one frame.
///
/// Rebuilt from the frame's delivered input events and cleared once the
/// view has been built.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Input events in delivery order.
    pub events: Vec<InputEvent>,

    pub keys_pressed:     HashSet<Key>,
    pub keys_released:    HashSet<Key>,
    pub buttons_pressed:  HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,

    /// Text committed this frame, concatenated.
    pub text: String,

    /// Summed line-based scroll.
    pub scroll_lines: (f32, f32),

    /// Summed pixel-based scroll.
    pub scroll_pixels: (f32, f32),
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.text.clear();
        self.scroll_lines = (0.0, 0.0);
        self.scroll_pixels = (0.0, 0.0);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn add_scroll(&mut self, delta: WheelDelta) {
        let (acc, x, y) = match delta {
            WheelDelta::Line { x, y } => (&mut self.scroll_lines, x, y),
            WheelDelta::Pixel { x, y } => (&mut self.scroll_pixels, x, y),
        };
        acc.0 += x;
        acc.1 += y;
    }
}
