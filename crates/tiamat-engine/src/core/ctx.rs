use std::sync::Arc;

use tokio::runtime::Handle;
use winit::window::Window;

use crate::capture::CaptureHub;
use crate::device::WgpuBackend;
use crate::draw::{DrawManager, DrawOpKey, DrawOperation};
use crate::error::DrawError;
use crate::frame::{FrameReport, WindowActions};
use crate::input::InputSnapshot;
use crate::time::FrameTime;

/// Handles shared by both contexts.
#[derive(Clone, Copy)]
pub struct EngineHandles<'a> {
    pub manager: &'a Arc<DrawManager<WgpuBackend>>,
    pub capture: &'a Arc<CaptureHub>,
    pub window: &'a WindowActions<Window>,
    pub runtime: &'a Handle,
}

/// Context passed to [`App::setup`](super::App::setup).
pub struct SetupCtx<'a> {
    pub engine: EngineHandles<'a>,
}

impl SetupCtx<'_> {
    /// Adds `op` to the manager and registers it, blocking until it is ready.
    pub fn add(&self, op: Arc<dyn DrawOperation<WgpuBackend>>) -> Result<DrawOpKey, DrawError> {
        let manager = self.engine.manager;
        self.engine
            .runtime
            .block_on(manager.add_and_register(op))
    }
}

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
pub struct FrameCtx<'a> {
    pub engine: EngineHandles<'a>,
    pub time: FrameTime,
    pub input: &'a InputSnapshot,
    /// Report of the previous frame, if one was rendered.
    pub last_report: Option<&'a FrameReport>,
}

impl FrameCtx<'_> {
    /// Schedules `op` for this frame.
    pub fn draw(&self, op: Arc<dyn DrawOperation<WgpuBackend>>, priority: f32) -> Result<(), DrawError> {
        self.engine.manager.enqueue(op, priority)
    }

    /// Schedules `op` with its current priority.
    pub fn draw_default(&self, op: Arc<dyn DrawOperation<WgpuBackend>>) -> Result<(), DrawError> {
        self.engine.manager.enqueue_default(op)
    }
}
