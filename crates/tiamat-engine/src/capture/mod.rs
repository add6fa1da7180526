//! Frame capture: one surface readback per frame, shared by screenshot
//! requests and frame hooks.
//!
//! - screenshots are one-shot: each request owns a writer and a completion
//!   signal; encoding happens on a blocking worker
//! - frame hooks are streams: captured frames go into a bounded queue polled by
//!   the consumer, every `frame_skip + 1` frames

mod encode;
mod error;
mod frame;
mod hook;
mod hub;

pub use encode::{ScreenshotFormat, encode};
pub use error::CaptureError;
pub use frame::CapturedFrame;
pub use hook::FrameHook;
pub use hub::{CaptureHub, CapturePlan, ScreenshotTicket};
