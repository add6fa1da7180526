//! Tiamat engine crate.
//!
//! A draw-operation scheduler and GPU command-recording core: draw operations are
//! queued per command-list group, recorded in parallel on a worker runtime, and
//! submitted in group order once per frame. The platform shell (winit window,
//! wgpu device, render thread) sits on top.

pub mod backend;
pub mod capture;
pub mod config;
pub mod core;
pub mod device;
pub mod dispatch;
pub mod draw;
pub mod error;
pub mod frame;
pub mod input;
pub mod logging;
pub mod paint;
pub mod render;
pub mod resources;
mod sync;
pub mod time;
pub mod window;

#[cfg(test)]
mod testing;

pub use config::EngineConfig;
pub use error::DrawError;
