//! wgpu backend.
//!
//! [`WindowSurface::new`] creates the device and configures the window surface;
//! everything after that goes through the backend traits.

mod backend;
mod command_list;
mod error;
mod init;
mod surface;
mod window_surface;

pub use backend::{WgpuBackend, WgpuDevice};
pub use command_list::WgpuCommandList;
pub use error::SurfaceErrorAction;
pub use init::GpuInit;
pub use window_surface::{SurfaceTarget, WindowSurface};
