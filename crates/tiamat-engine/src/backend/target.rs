use std::sync::Arc;

use glam::{Mat4, Vec2};

use super::Backend;

/// Per-target parameters handed to every draw against that target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawParams {
    /// Logical size of the target.
    pub viewport: Vec2,
    /// Logical → physical pixel ratio.
    pub scale_factor: f32,
    /// Maps logical pixels (top-left origin, +Y down) to clip space.
    pub view_projection: Mat4,
}

impl DrawParams {
    /// Parameters for a pixel-space target of the given logical size.
    pub fn pixel_space(viewport: Vec2, scale_factor: f32) -> Self {
        let w = viewport.x.max(1.0);
        let h = viewport.y.max(1.0);
        Self {
            viewport,
            scale_factor,
            view_projection: Mat4::orthographic_rh(0.0, w, h, 0.0, -1.0, 1.0),
        }
    }
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            viewport: Vec2::ONE,
            scale_factor: 1.0,
            view_projection: Mat4::IDENTITY,
        }
    }
}

/// One render target as seen by a recording cycle: the target itself, the
/// framebuffer acquired for it this frame, and its draw parameters.
///
/// Both handles are non-optional; a descriptor cannot describe a missing target.
pub struct TargetDescriptor<B: Backend> {
    pub target: Arc<B::Target>,
    pub framebuffer: Arc<B::Framebuffer>,
    pub params: DrawParams,
}

impl<B: Backend> TargetDescriptor<B> {
    pub fn new(target: Arc<B::Target>, framebuffer: Arc<B::Framebuffer>, params: DrawParams) -> Self {
        Self {
            target,
            framebuffer,
            params,
        }
    }
}

// Manual impl: `derive(Clone)` would require `B: Clone`.
impl<B: Backend> Clone for TargetDescriptor<B> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            framebuffer: Arc::clone(&self.framebuffer),
            params: self.params,
        }
    }
}
