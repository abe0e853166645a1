use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{ButtonState, InputEvent, Key, Modifiers, MouseButton};

/// Persistent input state: what is held and where the pointer is.
///
/// Only the view-model and view steps see it; `App::update` works from the
/// raw input events instead.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub modifiers:    Modifiers,
    pub focused:      bool,
    pub pointer_pos:  Option<(f32, f32)>,
    pub keys_down:    HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Folds one event into the held state and records its transitions in
    /// `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = *m,

            InputEvent::Focused(focused) => {
                self.focused = *focused;
                if !focused {
                    // Releases are not reported while unfocused.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => self.pointer_pos = Some((*x, *y)),
            InputEvent::PointerLeft => self.pointer_pos = None,

            InputEvent::Key { key, state, modifiers, .. } => {
                self.modifiers = *modifiers;
                let changed = match state {
                    ButtonState::Pressed => self.keys_down.insert(*key),
                    ButtonState::Released => self.keys_down.remove(key),
                };
                if changed {
                    let set = match state {
                        ButtonState::Pressed => &mut frame.keys_pressed,
                        ButtonState::Released => &mut frame.keys_released,
                    };
                    set.insert(*key);
                }
            }

            InputEvent::PointerButton { button, state, x, y, modifiers } => {
                self.pointer_pos = Some((*x, *y));
                self.modifiers = *modifiers;
                let changed = match state {
                    ButtonState::Pressed => self.buttons_down.insert(*button),
                    ButtonState::Released => self.buttons_down.remove(button),
                };
                if changed {
                    let set = match state {
                        ButtonState::Pressed => &mut frame.buttons_pressed,
                        ButtonState::Released => &mut frame.buttons_released,
                    };
                    set.insert(*button);
                }
            }

            InputEvent::Wheel { delta, modifiers } => {
                self.modifiers = *modifiers;
                frame.add_scroll(*delta);
            }

            InputEvent::Text(text) => frame.text.push_str(text),
        }

        frame.events.push(ev);
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::WheelDelta;

    fn key(key: Key, state: ButtonState) -> InputEvent {
        InputEvent::Key { key, state, modifiers: Modifiers::default(), code: 0, repeat: false }
    }

    #[test]
    fn repeat_press_is_not_a_new_transition() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, key(Key::A, ButtonState::Pressed));
        frame.clear();
        state.apply_event(&mut frame, key(Key::A, ButtonState::Pressed));

        assert!(state.key_down(Key::A));
        assert!(frame.keys_pressed.is_empty());
        assert_eq!(frame.events.len(), 1);
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, key(Key::Shift, ButtonState::Pressed));
        state.apply_event(&mut frame, InputEvent::PointerButton {
            button: MouseButton::Left,
            state: ButtonState::Pressed,
            x: 3.0,
            y: 4.0,
            modifiers: Modifiers::default(),
        });
        state.apply_event(&mut frame, InputEvent::Focused(false));

        assert!(state.keys_down.is_empty());
        assert!(state.buttons_down.is_empty());
        assert_eq!(state.pointer_pos, Some((3.0, 4.0)));
    }

    #[test]
    fn scroll_and_text_accumulate_per_frame() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        let wheel = |y| InputEvent::Wheel {
            delta: WheelDelta::Line { x: 0.0, y },
            modifiers: Modifiers::default(),
        };
        state.apply_event(&mut frame, wheel(1.0));
        state.apply_event(&mut frame, wheel(2.0));
        state.apply_event(&mut frame, InputEvent::Text("hi".into()));
        state.apply_event(&mut frame, InputEvent::Text("!".into()));

        assert_eq!(frame.scroll_lines, (0.0, 3.0));
        assert_eq!(frame.text, "hi!");

        frame.clear();
        assert!(frame.is_empty());
        assert_eq!(frame.scroll_lines, (0.0, 0.0));
    }
}
