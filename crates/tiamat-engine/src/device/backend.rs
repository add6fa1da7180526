use wgpu::util::DeviceExt;

use crate::backend::{Backend, BackendError, BufferDesc, BufferUsage, GpuDevice};
use crate::resources::Disposable;

use super::{SurfaceTarget, WgpuCommandList};

/// The wgpu backend.
pub struct WgpuBackend;

impl Backend for WgpuBackend {
    type Device = WgpuDevice;
    type CommandBuffer = WgpuCommandList;
    type Target = SurfaceTarget;
    type Framebuffer = wgpu::TextureView;
    type Buffer = wgpu::Buffer;
}

/// Logical device plus its queue and the format of the window surface.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
}

impl WgpuDevice {
    pub(crate) fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
        }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    #[inline]
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }
}

fn usages(usage: BufferUsage) -> wgpu::BufferUsages {
    let bind = match usage {
        BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
        BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
        BufferUsage::Index => wgpu::BufferUsages::INDEX,
    };
    bind | wgpu::BufferUsages::COPY_DST
}

impl GpuDevice<WgpuBackend> for WgpuDevice {
    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<wgpu::Buffer, BackendError> {
        let size = desc.contents.map_or(desc.size, |c| c.len() as u64);
        if size > self.device.limits().max_buffer_size {
            return Err(BackendError::OutOfMemory);
        }

        let buffer = match desc.contents {
            Some(contents) => self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(desc.label),
                    contents,
                    usage: usages(desc.usage),
                }),
            None => self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(desc.label),
                size,
                usage: usages(desc.usage),
                mapped_at_creation: false,
            }),
        };
        Ok(buffer)
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    fn destroy_buffer(&self, buffer: &wgpu::Buffer) {
        buffer.destroy();
    }

    fn create_command_buffer(&self, label: &str) -> WgpuCommandList {
        WgpuCommandList::new(self.device.clone(), label)
    }

    fn submit(&self, buffer: &WgpuCommandList) -> Result<(), BackendError> {
        let finished = buffer.take_finished()?;
        log::trace!("submit {}: {} buffer(s)", buffer.label(), finished.len());
        self.queue.submit(finished);
        Ok(())
    }
}

impl Disposable for wgpu::Buffer {
    fn dispose(&self) {
        self.destroy();
    }
}
