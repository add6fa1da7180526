//! wgpu draw operations.
//!
//! Convention:
//! - geometry is in logical pixels (top-left origin, +Y down)
//! - group 0 is the target's view uniform, group 1 the operation's model data
//! - pipelines and static geometry live in the manager's resource cache

mod common;
mod quad;

pub use common::{ViewUniform, view_layout};
pub use quad::{Quad, QuadOp, QuadResources};
