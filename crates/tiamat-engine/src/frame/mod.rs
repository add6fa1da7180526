//! Frame orchestration and the window/render thread handoff.
//!
//! - [`FrameOrchestrator`]: the per-frame render-thread sequence
//! - [`FrameLock`]: binary gate shared by the window and render threads
//! - [`WindowActions`]: closures marshalled onto the window thread
//! - [`WindowFault`]: first-wins fault slot polled by the window thread

mod actions;
mod error;
mod fault;
mod lock;
mod orchestrator;

pub use actions::{PendingWindowWork, WindowActions};
pub use error::FrameError;
pub use fault::WindowFault;
pub use lock::FrameLock;
pub use orchestrator::{FrameOrchestrator, FrameReport, GroupReport};
