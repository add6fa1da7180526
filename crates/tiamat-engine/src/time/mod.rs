//! Frame timing.
//!
//! One `FrameClock` per render loop; `tick()` once per frame yields the
//! `FrameTime` whose `dt` feeds every dispatch.

mod frame_clock;

pub use frame_clock::{ClockConfig, FrameClock, FrameTime};
