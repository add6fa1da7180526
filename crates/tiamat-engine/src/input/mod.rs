//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types; the window
//! runtime translates platform events into [`InputEvent`]s.

mod frame;
pub mod platform;
mod snapshot;
mod state;
mod types;

pub use frame::InputFrame;
pub use snapshot::{InputCollector, InputSnapshot};
pub use state::InputState;
pub use types::{ButtonState, InputEvent, KeyCode, Modifiers, MouseButton};
