use super::frame::InputFrame;
use super::state::InputState;
use super::types::{InputEvent, KeyCode, MouseButton};

/// Input as seen by one rendered frame.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    pub state: InputState,
    pub frame: InputFrame,
}

impl InputSnapshot {
    pub fn key_pressed(&self, code: KeyCode) -> bool {
        self.frame.keys_pressed.contains(&code)
    }

    pub fn button_pressed(&self, btn: MouseButton) -> bool {
        self.frame.buttons_pressed.contains(&btn)
    }

    pub fn pointer(&self) -> Option<(f32, f32)> {
        self.state.pointer
    }
}

/// Window-side accumulator. Events are applied as they arrive; the render
/// thread takes one snapshot per frame, which resets the per-frame deltas.
#[derive(Debug, Default)]
pub struct InputCollector {
    state: InputState,
    frame: InputFrame,
}

impl InputCollector {
    pub fn apply(&mut self, ev: &InputEvent) {
        self.state.apply_event(&mut self.frame, ev);
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }

    pub fn snapshot(&mut self) -> InputSnapshot {
        let snap = InputSnapshot {
            state: self.state.clone(),
            frame: self.frame.clone(),
        };
        self.frame.clear();
        snap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ButtonState;

    fn key(code: u32, state: ButtonState) -> InputEvent {
        InputEvent::Key {
            code: KeyCode(code),
            state,
            repeat: false,
        }
    }

    #[test]
    fn snapshot_resets_transitions_but_keeps_held_state() {
        let mut c = InputCollector::default();
        c.apply(&key(7, ButtonState::Pressed));
        c.apply(&InputEvent::Wheel { dx: 0.0, dy: 3.0 });

        let first = c.snapshot();
        assert!(first.key_pressed(KeyCode(7)));
        assert_eq!(first.frame.wheel, (0.0, 3.0));

        let second = c.snapshot();
        assert!(!second.key_pressed(KeyCode(7)));
        assert!(second.state.key_down(KeyCode(7)));
        assert!(second.frame.is_empty());
    }

    #[test]
    fn repeat_press_is_not_a_new_transition() {
        let mut c = InputCollector::default();
        c.apply(&key(1, ButtonState::Pressed));
        c.snapshot();
        c.apply(&key(1, ButtonState::Pressed));
        assert!(!c.snapshot().key_pressed(KeyCode(1)));
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut c = InputCollector::default();
        c.apply(&key(1, ButtonState::Pressed));
        c.apply(&InputEvent::PointerButton {
            button: MouseButton::Left,
            state: ButtonState::Pressed,
        });
        c.apply(&InputEvent::Focused(false));
        assert!(c.state().keys_down.is_empty());
        assert!(c.state().buttons_down.is_empty());
    }
}
