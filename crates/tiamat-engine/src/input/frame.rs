use std::collections::HashSet;

use super::types::{KeyCode, MouseButton};

/// Per-frame input transitions.
#[derive(Debug, Clone, Default)]
pub struct InputFrame {
    pub keys_pressed: HashSet<KeyCode>,
    pub keys_released: HashSet<KeyCode>,
    pub buttons_pressed: HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,
    /// Accumulated scroll in logical pixels.
    pub wheel: (f32, f32),
    /// Number of events folded into this frame.
    pub event_count: usize,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.wheel = (0.0, 0.0);
        self.event_count = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }
}
