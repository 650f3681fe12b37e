//! Per-frame rendering of the scene.
//!
//! [`FramePlan`] is the CPU half: the frame-wide uniforms and the ordered list
//! of object draws for the current camera. [`FrameRenderer`] owns the GPU
//! resources and turns a plan into one render pass:
//!
//! 1. clear color and depth
//! 2. upload frame uniforms (camera, lights)
//! 3. upload every object's uniforms into one dynamic-offset buffer
//! 4. per object: select the texture unit, the object's uniform slice, draw
//! 5. present

use std::num::NonZeroU64;

use glam::{Mat4, Vec3, Vec4};

use crate::camera::ProjectionMode;
use crate::error::ViewerError;
use crate::gpu::{DEPTH_FORMAT, GpuContext};
use crate::mesh::MeshLibrary;
use crate::scene::{Lighting, Scene};
use crate::shader::{FRAME_BLOCK, OBJECT_BLOCK, ShaderProgram};
use crate::shapes::Shape;
use crate::texture::TextureUnits;
use crate::uniforms::{Uniform, UniformBlock, UniformTable};

/// Eye position used for specular terms. Highlights are computed as if the
/// viewer sat at the world origin, whatever the camera does.
pub const SPECULAR_EYE: Vec3 = Vec3::ZERO;

/// Uniforms shared by every draw in a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameGlobals {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_position: Vec3,
    pub lighting: Lighting,
    pub has_texture: bool,
}

impl FrameGlobals {
    pub fn write(&self, block: &mut UniformBlock, uniforms: &UniformTable) {
        let [light1, light2] = &self.lighting.lights;
        block.set(uniforms.location(Uniform::View), self.view);
        block.set(uniforms.location(Uniform::Projection), self.projection);
        block.set(uniforms.location(Uniform::ViewPosition), self.view_position);
        block.set(
            uniforms.location(Uniform::AmbientStrength),
            self.lighting.ambient_strength,
        );
        block.set(
            uniforms.location(Uniform::AmbientColor),
            self.lighting.ambient_color,
        );
        block.set(uniforms.location(Uniform::Light1Color), light1.color);
        block.set(uniforms.location(Uniform::Light1Position), light1.position);
        block.set(
            uniforms.location(Uniform::SpecularIntensity1),
            light1.specular_intensity,
        );
        block.set(
            uniforms.location(Uniform::HighlightSize1),
            light1.highlight_size,
        );
        block.set(uniforms.location(Uniform::Light2Color), light2.color);
        block.set(uniforms.location(Uniform::Light2Position), light2.position);
        block.set(
            uniforms.location(Uniform::SpecularIntensity2),
            light2.specular_intensity,
        );
        block.set(
            uniforms.location(Uniform::HighlightSize2),
            light2.highlight_size,
        );
        block.set(uniforms.location(Uniform::HasTexture), self.has_texture);
    }
}

/// One object's draw for this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectDraw {
    pub shape: Shape,
    pub texture_unit: usize,
    pub model: Mat4,
    pub normal_matrix: Mat4,
    pub color: Vec4,
}

impl ObjectDraw {
    pub fn write(&self, block: &mut UniformBlock, uniforms: &UniformTable) {
        block.set(uniforms.location(Uniform::Model), self.model);
        block.set(uniforms.location(Uniform::NormalMatrix), self.normal_matrix);
        block.set(uniforms.location(Uniform::ObjectColor), self.color);
    }
}

/// Everything the GPU needs to draw one frame.
#[derive(Clone, Debug)]
pub struct FramePlan {
    pub globals: FrameGlobals,
    pub draws: Vec<ObjectDraw>,
}

impl FramePlan {
    pub fn new(
        view: Mat4,
        projection: Mat4,
        scene: &Scene,
        mode: ProjectionMode,
    ) -> Self {
        let draws = scene
            .visible(mode)
            .map(|object| {
                let model = object.model_matrix();
                ObjectDraw {
                    shape: object.shape,
                    texture_unit: object.texture_unit,
                    model,
                    normal_matrix: model.inverse().transpose(),
                    color: object.color,
                }
            })
            .collect();

        Self {
            globals: FrameGlobals {
                view,
                projection,
                view_position: SPECULAR_EYE,
                lighting: scene.lighting,
                has_texture: true,
            },
            draws,
        }
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// GPU state for drawing [`FramePlan`]s.
pub struct FrameRenderer {
    program: ShaderProgram,
    meshes: MeshLibrary,
    textures: TextureUnits,
    frame_block: UniformBlock,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_block: UniformBlock,
    object_size: u32,
    object_stride: u32,
    object_capacity: u32,
    object_staging: Vec<u8>,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
}

impl FrameRenderer {
    pub fn new(
        gpu: &GpuContext,
        program: ShaderProgram,
        meshes: MeshLibrary,
        textures: TextureUnits,
        object_capacity: u32,
    ) -> Self {
        let linked = program.linked();
        let frame_size = linked.block_size(FRAME_BLOCK).max(16);
        let object_size = linked.block_size(OBJECT_BLOCK).max(16);
        let alignment = gpu.device.limits().min_uniform_buffer_offset_alignment;
        let object_stride = align_to(object_size, alignment);
        let object_capacity = object_capacity.max(1);

        let frame_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: frame_size as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &program.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: FRAME_BLOCK.binding,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let (object_buffer, object_bind_group) =
            Self::create_object_buffer(gpu, &program, object_size, object_stride, object_capacity);
        let (depth_view, depth_size) = Self::create_depth_texture(gpu);

        Self {
            frame_block: UniformBlock::new(FRAME_BLOCK, frame_size),
            object_block: UniformBlock::new(OBJECT_BLOCK, object_size),
            program,
            meshes,
            textures,
            frame_buffer,
            frame_bind_group,
            object_size,
            object_stride,
            object_capacity,
            object_staging: Vec::new(),
            object_buffer,
            object_bind_group,
            depth_view,
            depth_size,
        }
    }

    fn create_object_buffer(
        gpu: &GpuContext,
        program: &ShaderProgram,
        object_size: u32,
        stride: u32,
        capacity: u32,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object Uniforms"),
            size: stride as u64 * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object Bind Group"),
            layout: &program.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: OBJECT_BLOCK.binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(object_size as u64),
                }),
            }],
        });

        (buffer, bind_group)
    }

    fn create_depth_texture(gpu: &GpuContext) -> (wgpu::TextureView, (u32, u32)) {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (view, (gpu.width(), gpu.height()))
    }

    /// Recreate the depth buffer if the surface size changed.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            let (view, size) = Self::create_depth_texture(gpu);
            self.depth_view = view;
            self.depth_size = size;
        }
    }

    fn upload(&mut self, gpu: &GpuContext, plan: &FramePlan) {
        let uniforms = self.program.uniforms();

        plan.globals.write(&mut self.frame_block, uniforms);
        gpu.queue
            .write_buffer(&self.frame_buffer, 0, self.frame_block.bytes());

        let count = plan.draws.len() as u32;
        if count > self.object_capacity {
            let capacity = count.next_power_of_two();
            log::debug!("Growing object uniform buffer to {capacity} slots");
            let (buffer, bind_group) = Self::create_object_buffer(
                gpu,
                &self.program,
                self.object_size,
                self.object_stride,
                capacity,
            );
            self.object_buffer = buffer;
            self.object_bind_group = bind_group;
            self.object_capacity = capacity;
        }

        let stride = self.object_stride as usize;
        self.object_staging.clear();
        self.object_staging.resize(stride * plan.draws.len(), 0);
        for (slot, draw) in plan.draws.iter().enumerate() {
            draw.write(&mut self.object_block, uniforms);
            let bytes = self.object_block.bytes();
            self.object_staging[slot * stride..slot * stride + bytes.len()].copy_from_slice(bytes);
        }
        if !self.object_staging.is_empty() {
            gpu.queue
                .write_buffer(&self.object_buffer, 0, &self.object_staging);
        }
    }

    /// Draw and present one frame.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped, as
    /// is a timed-out acquire. Running out of memory is fatal.
    pub fn render(&mut self, gpu: &GpuContext, plan: &FramePlan) -> Result<(), ViewerError> {
        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(ViewerError::SurfaceOutOfMemory),
            Err(err) => {
                log::warn!("Skipping frame: {err}");
                return Ok(());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.ensure_depth_size(gpu);
        self.upload(gpu, plan);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

            for (slot, draw) in plan.draws.iter().enumerate() {
                let Some(mesh) = self.meshes.get(draw.shape) else {
                    continue;
                };
                let Some(texture) = self.textures.bind_group(draw.texture_unit) else {
                    log::warn!("No texture unit {}", draw.texture_unit);
                    continue;
                };

                let offset = slot as u32 * self.object_stride;
                render_pass.set_bind_group(1, &self.object_bind_group, &[offset]);
                render_pass.set_bind_group(2, texture, &[]);
                mesh.draw(&mut render_pass, &self.program);
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
