//! Draw operations and their owner.
//!
//! A [`DrawOp`] pairs shared lifecycle state (owner, group, priority, transform,
//! readiness, GPU handles) with variant [`DrawHooks`]. A [`DrawManager`] owns
//! operations, registers them, and queues them per [`CommandListGroup`] in a
//! [`DrawQueue`] until a dispatch drains it.

mod group;
mod id;
mod lock;
mod manager;
mod op;
mod queue;
mod transform;

pub use group::{CommandListGroup, CommandListGroups};
pub use id::{DrawOpKey, ManagerId, OwnerHandle};
pub use lock::DrawingLock;
pub use manager::DrawManager;
pub use op::{
    DrawCtx, DrawHooks, DrawOp, DrawOperation, Readiness, RegisterCtx, ResourceSetDesc,
    ResourceSets,
};
pub use queue::{DrawQueue, Queued};
pub use transform::{ColorTransform, Rotation, Transform, TransformUniform, TransformUpdate};
