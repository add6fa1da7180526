//! Backend abstraction.
//!
//! The scheduler never touches a native graphics API directly. Everything it needs
//! from one (devices, command buffers, render targets, framebuffers, buffers) is
//! reached through the traits in this module, so the same scheduling core runs on
//! the wgpu backend (`device::WgpuBackend`) and on test doubles.
//!
//! Lifecycle contract:
//! - handles are created once and released only under the manager-wide drawing lock
//! - a command buffer is begun and ended exactly once per recording cycle

mod error;
mod target;
mod traits;

pub use error::BackendError;
pub use target::{DrawParams, TargetDescriptor};
pub use traits::{Backend, BufferDesc, BufferUsage, CommandBuffer, FrameSurface, GpuDevice};
