use crate::capture::CapturedFrame;

use super::{BackendError, TargetDescriptor};

/// Bundle of opaque native handle types.
///
/// Implementors are marker types (`WgpuBackend`); the associated types carry the
/// actual handles.
pub trait Backend: Sized + Send + Sync + 'static {
    /// Logical device: creates resources and submits finished command buffers.
    type Device: GpuDevice<Self>;
    /// One recordable command sequence, submitted once per group per frame.
    type CommandBuffer: CommandBuffer;
    /// A render target (window surface, offscreen texture, ...).
    type Target: Send + Sync + 'static;
    /// The framebuffer acquired for a target for the current frame.
    type Framebuffer: Send + Sync + 'static;
    /// A GPU buffer.
    type Buffer: Send + Sync + 'static;
}

/// How a buffer is bound.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    Uniform,
    Vertex,
    Index,
}

/// Buffer creation parameters.
///
/// When `contents` is set the buffer is created initialized and `size` is ignored.
#[derive(Debug, Clone, Copy)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub usage: BufferUsage,
    pub size: u64,
    pub contents: Option<&'a [u8]>,
}

/// Device-level operations used by the scheduler.
pub trait GpuDevice<B: Backend>: Send + Sync + 'static {
    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<B::Buffer, BackendError>;

    /// Schedules a write into `buffer`. Visible to the next submission.
    fn write_buffer(&self, buffer: &B::Buffer, offset: u64, data: &[u8]);

    /// Releases the GPU memory behind `buffer`.
    ///
    /// Callers must hold the manager-wide drawing lock exclusively.
    fn destroy_buffer(&self, buffer: &B::Buffer);

    fn create_command_buffer(&self, label: &str) -> B::CommandBuffer;

    /// Submits an ended command buffer.
    fn submit(&self, buffer: &B::CommandBuffer) -> Result<(), BackendError>;
}

/// A command buffer that accepts concurrent recording between `begin` and `end`.
///
/// Recording is slotted: each concurrent recorder writes into its own slot and the
/// backend orders slots by index when the buffer is ended.
pub trait CommandBuffer: Send + Sync + 'static {
    /// Native recording handle passed to draw hooks.
    type Encoder;

    fn begin(&self) -> Result<(), BackendError>;

    /// Records into `slot`. May be called concurrently from several workers.
    fn record<R>(
        &self,
        slot: usize,
        f: impl FnOnce(&mut Self::Encoder) -> R,
    ) -> Result<R, BackendError>;

    fn end(&self) -> Result<(), BackendError>;
}

/// The presentation side of a frame, owned by the render thread.
pub trait FrameSurface<B: Backend>: Send {
    /// Acquires this frame's framebuffers.
    ///
    /// `Ok(None)` means the frame should be skipped (surface reconfigured,
    /// minimized, transient timeout).
    fn acquire(&mut self, device: &B::Device)
    -> Result<Option<Vec<TargetDescriptor<B>>>, BackendError>;

    /// Reads back the acquired frame. Called at most once per frame, after all
    /// command buffers were submitted and before `present`.
    fn read_back(&mut self, device: &B::Device) -> Result<CapturedFrame, BackendError>;

    /// Presents the acquired frame. No-op when nothing is held.
    fn present(&mut self, device: &B::Device);

    /// Applies a new physical size.
    fn resize(&mut self, device: &B::Device, width: u32, height: u32, scale_factor: f64);
}
