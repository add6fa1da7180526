//! Per-group recording cycles.
//!
//! A [`CommandListDispatch`] owns one command buffer and turns the operations
//! drained from one group queue into a recorded, ended buffer ready for submit.

mod command_list;

pub use command_list::CommandListDispatch;
