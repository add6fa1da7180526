use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{ButtonState, InputEvent, KeyCode, Modifiers, MouseButton};

/// Current input state for the window.
///
/// Holds "is down" information and the pointer position. Transitions are
/// recorded into an [`InputFrame`].
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub modifiers: Modifiers,
    pub focused: bool,
    /// Pointer position in logical pixels.
    pub pointer: Option<(f32, f32)>,
    pub keys_down: HashSet<KeyCode>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Applies `ev` and writes its transitions to `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: &InputEvent) {
        frame.event_count += 1;
        match *ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = m,

            InputEvent::Focused(f) => {
                self.focused = f;
                if !f {
                    // Avoid stuck keys/buttons when focus changes mid-press.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => self.pointer = Some((x, y)),

            InputEvent::PointerLeft => self.pointer = None,

            InputEvent::Key { code, state, .. } => match state {
                ButtonState::Pressed => {
                    if self.keys_down.insert(code) {
                        frame.keys_pressed.insert(code);
                    }
                }
                ButtonState::Released => {
                    if self.keys_down.remove(&code) {
                        frame.keys_released.insert(code);
                    }
                }
            },

            InputEvent::PointerButton { button, state } => match state {
                ButtonState::Pressed => {
                    if self.buttons_down.insert(button) {
                        frame.buttons_pressed.insert(button);
                    }
                }
                ButtonState::Released => {
                    if self.buttons_down.remove(&button) {
                        frame.buttons_released.insert(button);
                    }
                }
            },

            InputEvent::Wheel { dx, dy } => {
                frame.wheel.0 += dx;
                frame.wheel.1 += dy;
            }
        }
    }

    pub fn key_down(&self, code: KeyCode) -> bool {
        self.keys_down.contains(&code)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}
