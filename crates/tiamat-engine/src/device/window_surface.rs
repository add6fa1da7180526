use std::sync::{Arc, mpsc};

use anyhow::{Context, Result};
use glam::Vec2;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::backend::{BackendError, DrawParams, FrameSurface, TargetDescriptor};
use crate::capture::CapturedFrame;
use crate::paint::Color;
use crate::render::{ViewUniform, view_layout};

use super::surface::{apply_resize, choose_alpha_mode, choose_surface_format, is_bgra, map_surface_error};
use super::{GpuInit, WgpuBackend, WgpuDevice};

/// The window as a render target: its format and the per-frame view uniform.
pub struct SurfaceTarget {
    format: wgpu::TextureFormat,
    view_uniform: wgpu::Buffer,
    view_bind_group: wgpu::BindGroup,
}

impl SurfaceTarget {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let view_uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat view uniform"),
            size: std::mem::size_of::<ViewUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let layout = view_layout(device);
        let view_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tiamat view bind group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_uniform.as_entire_binding(),
            }],
        });
        Self {
            format,
            view_uniform,
            view_bind_group,
        }
    }

    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Group 0 of every pipeline drawing into this target.
    #[inline]
    pub fn view_bind_group(&self) -> &wgpu::BindGroup {
        &self.view_bind_group
    }
}

struct Acquired {
    texture: wgpu::SurfaceTexture,
    view: Arc<wgpu::TextureView>,
}

/// Window surface: acquires, clears, reads back and presents one texture per frame.
pub struct WindowSurface {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    scale_factor: f64,
    clear_color: Color,
    target: Arc<SurfaceTarget>,
    current: Option<Acquired>,
    readable: bool,
}

impl WindowSurface {
    /// Creates the device and the surface for `window`.
    pub async fn new(
        window: Arc<Window>,
        init: &GpuInit,
        clear_color: Color,
    ) -> Result<(WgpuDevice, Self)> {
        let size = window.inner_size();
        let scale_factor = window.scale_factor();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter found")?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("tiamat device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device")?;

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps, init.prefer_srgb)
            .context("surface reports no supported formats")?;
        let alpha_mode = choose_alpha_mode(&caps, init.alpha_mode);

        let readable = caps.usages.contains(wgpu::TextureUsages::COPY_SRC);
        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        if readable {
            usage |= wgpu::TextureUsages::COPY_SRC;
        } else {
            log::warn!("surface does not support COPY_SRC; screenshots disabled");
        }

        let config = wgpu::SurfaceConfiguration {
            usage,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };

        if size.width > 0 && size.height > 0 {
            surface.configure(&device, &config);
        }

        let target = Arc::new(SurfaceTarget::new(&device, format));
        let surface = Self {
            surface,
            config,
            size,
            scale_factor,
            clear_color,
            target,
            current: None,
            readable,
        };
        Ok((WgpuDevice::new(device, queue, format), surface))
    }

    #[inline]
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    #[inline]
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    fn draw_params(&self) -> DrawParams {
        let scale = self.scale_factor as f32;
        let logical = Vec2::new(self.size.width as f32, self.size.height as f32) / scale;
        DrawParams::pixel_space(logical, scale)
    }

    fn clear(&self, device: &WgpuDevice, view: &wgpu::TextureView) {
        let mut encoder = device
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tiamat clear"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tiamat clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                multiview_mask: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        }
        device.queue().submit(std::iter::once(encoder.finish()));
    }
}

impl FrameSurface<WgpuBackend> for WindowSurface {
    fn acquire(
        &mut self,
        device: &WgpuDevice,
    ) -> Result<Option<Vec<TargetDescriptor<WgpuBackend>>>, BackendError> {
        if self.size.width == 0 || self.size.height == 0 {
            return Ok(None);
        }

        let texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(err) => {
                log::debug!("surface acquire failed: {err}");
                return map_surface_error(
                    &self.surface,
                    device.device(),
                    &self.config,
                    self.size,
                    err,
                )
                .into_acquire();
            }
        };

        let view = Arc::new(
            texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
        );

        let params = self.draw_params();
        let uniform = ViewUniform::new(params.view_projection);
        device
            .queue()
            .write_buffer(&self.target.view_uniform, 0, bytemuck::bytes_of(&uniform));
        self.clear(device, &view);

        self.current = Some(Acquired {
            texture,
            view: Arc::clone(&view),
        });
        Ok(Some(vec![TargetDescriptor::new(
            Arc::clone(&self.target),
            view,
            params,
        )]))
    }

    fn read_back(&mut self, device: &WgpuDevice) -> Result<CapturedFrame, BackendError> {
        if !self.readable {
            return Err(BackendError::ReadbackUnavailable("surface lacks COPY_SRC"));
        }
        let Some(frame) = &self.current else {
            return Err(BackendError::ReadbackUnavailable("no acquired frame"));
        };
        let texture = &frame.texture.texture;
        let width = texture.width();
        let height = texture.height();

        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = (width * 4).div_ceil(align) * align;
        let staging = device.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat readback"),
            size: u64::from(padded_bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tiamat readback copy"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        device.queue().submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .device()
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| BackendError::Readback(e.to_string()))?;
        rx.recv()
            .map_err(|e| BackendError::Readback(e.to_string()))?
            .map_err(|e| BackendError::Readback(e.to_string()))?;

        let captured = {
            let mapped = slice.get_mapped_range();
            CapturedFrame::from_padded_rows(
                width,
                height,
                padded_bytes_per_row,
                &mapped,
                is_bgra(self.config.format),
            )
        };
        staging.unmap();
        staging.destroy();
        Ok(captured)
    }

    fn present(&mut self, _device: &WgpuDevice) {
        if let Some(frame) = self.current.take() {
            drop(frame.view);
            frame.texture.present();
        }
    }

    fn resize(&mut self, device: &WgpuDevice, width: u32, height: u32, scale_factor: f64) {
        self.scale_factor = scale_factor;
        apply_resize(
            &self.surface,
            device.device(),
            &mut self.config,
            &mut self.size,
            PhysicalSize::new(width, height),
        );
    }
}
