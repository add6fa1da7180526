use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use wgpu::util::DeviceExt;

use crate::device::{WgpuBackend, WgpuDevice};
use crate::draw::{
    CommandListGroup, DrawCtx, DrawHooks, DrawOp, RegisterCtx, ResourceSetDesc, ResourceSets,
    TransformUniform,
};
use crate::paint::Color;
use crate::resources::Disposable;

use super::common::{
    QUAD_INDICES, QUAD_VERTICES, QuadVertex, premul_alpha_blend, uniform_entry, view_layout,
};

const SHADER: &str = "tiamat.quad.shader";
const GEOMETRY: &str = "tiamat.quad.geometry";
const PARAMS: &str = "quad params";

/// A solid quad draw operation.
pub type QuadOp = DrawOp<WgpuBackend, Quad>;

/// Axis-aligned quad of `size` logical pixels, anchored at its top-left corner.
///
/// Placement, rotation and tint go through the operation's transform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quad {
    pub size: Vec2,
    pub color: Color,
}

impl Quad {
    pub fn new(size: Vec2, color: Color) -> Self {
        Self { size, color }
    }

    pub fn into_op(self) -> QuadOp {
        DrawOp::new(self)
    }

    pub fn into_op_in(self, group: CommandListGroup) -> QuadOp {
        DrawOp::with_group(self, group)
    }

    fn params(&self) -> QuadParams {
        QuadParams {
            size: self.size.to_array(),
            _pad: [0.0; 2],
            color: self.color.to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadParams {
    size: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
    color: [f32; 4],
}

struct QuadPipeline {
    pipeline: wgpu::RenderPipeline,
    model_layout: wgpu::BindGroupLayout,
}

impl QuadPipeline {
    fn new(device: &wgpu::Device, shader: &wgpu::ShaderModule, format: wgpu::TextureFormat) -> Self {
        let view_layout = view_layout(device);
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tiamat quad model bgl"),
            entries: &[
                uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX,
                    std::mem::size_of::<TransformUniform>(),
                ),
                uniform_entry(
                    1,
                    wgpu::ShaderStages::VERTEX,
                    std::mem::size_of::<QuadParams>(),
                ),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tiamat quad pipeline layout"),
            bind_group_layouts: &[&view_layout, &model_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tiamat quad pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Self {
            pipeline,
            model_layout,
        }
    }
}

struct QuadGeometry {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
}

impl QuadGeometry {
    fn new(device: &wgpu::Device) -> Self {
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tiamat quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tiamat quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self { vertices, indices }
    }
}

impl Disposable for QuadGeometry {
    fn dispose(&self) {
        self.vertices.destroy();
        self.indices.destroy();
    }
}

pub struct QuadResources {
    pipeline: Arc<QuadPipeline>,
    geometry: Arc<QuadGeometry>,
    params: wgpu::Buffer,
    model: wgpu::BindGroup,
}

fn pipeline_name(format: wgpu::TextureFormat) -> String {
    format!("tiamat.quad.pipeline.{format:?}")
}

#[async_trait]
impl DrawHooks<WgpuBackend> for Quad {
    type Resources = QuadResources;

    fn describe(&self, _ctx: &RegisterCtx<'_, WgpuBackend>) -> anyhow::Result<Vec<ResourceSetDesc>> {
        Ok(vec![ResourceSetDesc::uniform_init(
            PARAMS,
            bytemuck::bytes_of(&self.params()),
        )])
    }

    async fn build(
        &self,
        ctx: &RegisterCtx<'_, WgpuBackend>,
        transform: &wgpu::Buffer,
        sets: &mut ResourceSets<WgpuBackend>,
    ) -> anyhow::Result<QuadResources> {
        let device: &Arc<WgpuDevice> = ctx.device;
        let format = device.surface_format();

        let d = Arc::clone(device);
        ctx.resources.register_resource(SHADER, move |_| {
            Ok(d.device().create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("tiamat quad shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
            }))
        });

        let d = Arc::clone(device);
        let pipeline = ctx
            .resources
            .get_or_add_owned::<wgpu::ShaderModule, QuadPipeline, _>(
                &pipeline_name(format),
                SHADER,
                move |shader| Ok(QuadPipeline::new(d.device(), shader, format)),
            )?;

        let d = Arc::clone(device);
        let geometry = ctx
            .resources
            .get_or_add_disposable(GEOMETRY, move |_| Ok(QuadGeometry::new(d.device())))?;

        let params = sets.take(PARAMS).context("quad params buffer missing")?;
        let model = device
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("tiamat quad model bind group"),
                layout: &pipeline.model_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: transform.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: params.as_entire_binding(),
                    },
                ],
            });

        Ok(QuadResources {
            pipeline,
            geometry,
            params,
            model,
        })
    }

    fn draw(
        &self,
        res: &mut QuadResources,
        ctx: &DrawCtx<'_, WgpuBackend>,
    ) -> anyhow::Result<()> {
        let target = &*ctx.target.target;
        let view = &*ctx.target.framebuffer;
        if target.format() != ctx.device.surface_format() {
            anyhow::bail!("quad pipeline does not match target format {:?}", target.format());
        }

        ctx.record(|encoder| {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tiamat quad pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                multiview_mask: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            pass.set_pipeline(&res.pipeline.pipeline);
            pass.set_bind_group(0, target.view_bind_group(), &[]);
            pass.set_bind_group(1, &res.model, &[]);
            pass.set_vertex_buffer(0, res.geometry.vertices.slice(..));
            pass.set_index_buffer(res.geometry.indices.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
        })?;
        Ok(())
    }

    fn release(&self, _device: &WgpuDevice, res: QuadResources) {
        res.params.destroy();
    }
}
