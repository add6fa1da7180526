//! Window + runtime loop.
//!
//! The `winit` event loop owns the window on the calling thread; frames are
//! rendered on a dedicated render thread started through the frame lock.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
pub use winit::window::CursorIcon;
