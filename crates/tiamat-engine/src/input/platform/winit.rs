use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{ModifiersState, PhysicalKey};

use crate::input::{ButtonState, InputEvent, KeyCode, Modifiers, MouseButton};

/// Logical pixels per scroll line.
const LINE_HEIGHT: f32 = 20.0;

/// Translates a winit `WindowEvent` into an engine `InputEvent`.
///
/// Returns `None` for events not represented by the input subsystem.
pub fn translate_window_event(scale_factor: f64, event: &WindowEvent) -> Option<InputEvent> {
    match event {
        // winit 0.30: ModifiersChanged carries a wrapper with `.state()`.
        WindowEvent::ModifiersChanged(m) => Some(InputEvent::ModifiersChanged(map_modifiers(m.state()))),

        WindowEvent::Focused(f) => Some(InputEvent::Focused(*f)),

        WindowEvent::CursorLeft { .. } => Some(InputEvent::PointerLeft),

        WindowEvent::CursorMoved { position, .. } => {
            let (x, y) = to_logical(scale_factor, *position);
            Some(InputEvent::PointerMoved { x, y })
        }

        WindowEvent::MouseInput { state, button, .. } => Some(InputEvent::PointerButton {
            button: map_mouse_button(*button),
            state: map_state(*state),
        }),

        WindowEvent::MouseWheel { delta, .. } => {
            let (dx, dy) = match delta {
                MouseScrollDelta::LineDelta(x, y) => (x * LINE_HEIGHT, y * LINE_HEIGHT),
                MouseScrollDelta::PixelDelta(p) => to_logical(scale_factor, *p),
            };
            Some(InputEvent::Wheel { dx, dy })
        }

        WindowEvent::KeyboardInput { event, .. } => Some(InputEvent::Key {
            code: map_key(event.physical_key),
            state: map_state(event.state),
            repeat: event.repeat,
        }),

        _ => None,
    }
}

fn to_logical(scale_factor: f64, pos: PhysicalPosition<f64>) -> (f32, f32) {
    let logical = pos.to_logical::<f64>(scale_factor);
    (logical.x as f32, logical.y as f32)
}

fn map_state(s: ElementState) -> ButtonState {
    match s {
        ElementState::Pressed => ButtonState::Pressed,
        ElementState::Released => ButtonState::Released,
    }
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

impl From<winit::keyboard::KeyCode> for KeyCode {
    fn from(code: winit::keyboard::KeyCode) -> Self {
        KeyCode(code as u32)
    }
}

fn map_key(pk: PhysicalKey) -> KeyCode {
    match pk {
        PhysicalKey::Code(code) => code.into(),
        // NativeKeyCode has no stable numeric form.
        PhysicalKey::Unidentified(_) => KeyCode(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_is_translated() {
        let ev = translate_window_event(1.0, &WindowEvent::Focused(true));
        assert!(matches!(ev, Some(InputEvent::Focused(true))));
    }

    #[test]
    fn physical_keys_keep_their_code() {
        let code = winit::keyboard::KeyCode::F12;
        assert_eq!(map_key(PhysicalKey::Code(code)), KeyCode::from(code));
        assert_ne!(KeyCode::from(code), KeyCode::from(winit::keyboard::KeyCode::F11));
    }

    #[test]
    fn pixel_positions_become_logical() {
        assert_eq!(to_logical(2.0, PhysicalPosition::new(10.0, 4.0)), (5.0, 2.0));
    }
}
