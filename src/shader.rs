//! Shader program builder.
//!
//! Building a program runs in three steps:
//!
//! 1. **Compile** each stage's WGSL with naga, validating it and locating the
//!    stage's entry point. A failure carries naga's rendered diagnostic.
//! 2. **Link** the two stages: every fragment input location must be written
//!    by the vertex stage with the same type, and uniform blocks both stages
//!    declare at one binding must agree. Uniform locations are then resolved
//!    and cached in a [`UniformTable`].
//! 3. **Create** the wgpu shader modules, bind group layouts and render
//!    pipelines inside validation error scopes.
//!
//! Steps 1 and 2 need no GPU, so [`LinkedProgram`] can be exercised headless.
//! A failed build returns an error and never yields a [`ShaderProgram`].

use std::fmt;
use std::num::NonZeroU64;

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Binding, Handle, Module, Type, TypeInner};
use thiserror::Error;

use crate::gpu::{DEPTH_FORMAT, GpuContext};
use crate::mesh::{Primitive, Vertex3d};
use crate::texture::Texture;
use crate::uniforms::{BindingSlot, BlockLayout, UniformTable, resource_slot, uniform_blocks};

const UNIFORMS_WGSL: &str = include_str!("shaders/uniforms.wgsl");
const SCENE_VERTEX_WGSL: &str = include_str!("shaders/scene_vertex.wgsl");
const SCENE_FRAGMENT_WGSL: &str = include_str!("shaders/scene_fragment.wgsl");

/// Per-frame uniforms: camera and lighting.
pub const FRAME_BLOCK: BindingSlot = BindingSlot::new(0, 0);
/// Per-object uniforms, bound with a dynamic offset.
pub const OBJECT_BLOCK: BindingSlot = BindingSlot::new(1, 0);
/// Bind group holding the active texture unit.
pub const TEXTURE_GROUP: u32 = 2;

pub const TEXTURE_VARIABLE: &str = "u_texture";
pub const SAMPLER_VARIABLE: &str = "u_sampler";

/// Vertex stage source of the scene program.
pub fn scene_vertex_source() -> String {
    format!("{UNIFORMS_WGSL}\n{SCENE_VERTEX_WGSL}")
}

/// Fragment stage source of the scene program.
pub fn scene_fragment_source() -> String {
    format!("{UNIFORMS_WGSL}\n{SCENE_FRAGMENT_WGSL}")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("shader program failed to link:\n{log}")]
    Link { log: String },
}

/// One successfully compiled and validated stage.
#[derive(Debug)]
pub struct CompiledStage {
    stage: ShaderStage,
    source: String,
    module: Module,
    entry_point: String,
}

impl CompiledStage {
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    fn create_module(&self, device: &wgpu::Device) -> Result<wgpu::ShaderModule, ShaderError> {
        let label = format!("Scene {} Shader", self.stage);
        let on_error = |log| ShaderError::Compile {
            stage: self.stage,
            log,
        };
        checked(device, on_error, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&label),
                source: wgpu::ShaderSource::Wgsl(self.source.as_str().into()),
            })
        })
    }

    fn entry(&self) -> Option<&naga::EntryPoint> {
        self.module
            .entry_points
            .iter()
            .find(|ep| ep.name == self.entry_point)
    }

    fn outputs(&self) -> Vec<InterfaceSlot> {
        let mut slots = Vec::new();
        if let Some(result) = self.entry().and_then(|ep| ep.function.result.as_ref()) {
            collect_locations(&self.module, result.ty, result.binding.as_ref(), &mut slots);
        }
        slots
    }

    fn inputs(&self) -> Vec<InterfaceSlot> {
        let mut slots = Vec::new();
        if let Some(ep) = self.entry() {
            for arg in &ep.function.arguments {
                collect_locations(&self.module, arg.ty, arg.binding.as_ref(), &mut slots);
            }
        }
        slots
    }
}

/// Parse, validate and find the entry point of a single stage.
pub fn compile_stage(stage: ShaderStage, source: &str) -> Result<CompiledStage, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|err| ShaderError::Compile {
        stage,
        log: err.emit_to_string(source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|err| ShaderError::Compile {
            stage,
            log: err.emit_to_string(source),
        })?;

    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage.naga())
        .map(|ep| ep.name.clone())
        .ok_or_else(|| ShaderError::Compile {
            stage,
            log: format!("no @{stage} entry point declared"),
        })?;

    Ok(CompiledStage {
        stage,
        source: source.to_owned(),
        module,
        entry_point,
    })
}

#[derive(Debug)]
struct InterfaceSlot {
    location: u32,
    ty: TypeInner,
}

fn collect_locations(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut Vec<InterfaceSlot>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(InterfaceSlot {
            location: *location,
            ty: module.types[ty].inner.clone(),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

/// A vertex and fragment stage that fit together, with uniform locations
/// resolved.
#[derive(Debug)]
pub struct LinkedProgram {
    vertex: CompiledStage,
    fragment: CompiledStage,
    blocks: Vec<BlockLayout>,
    uniforms: UniformTable,
    texture: Option<BindingSlot>,
    sampler: Option<BindingSlot>,
}

impl LinkedProgram {
    pub fn link(vertex: CompiledStage, fragment: CompiledStage) -> Result<Self, ShaderError> {
        let mut problems = Vec::new();

        if vertex.stage != ShaderStage::Vertex {
            problems.push(format!("expected a vertex stage, got {}", vertex.stage));
        }
        if fragment.stage != ShaderStage::Fragment {
            problems.push(format!("expected a fragment stage, got {}", fragment.stage));
        }

        let outputs = vertex.outputs();
        for input in fragment.inputs() {
            match outputs.iter().find(|out| out.location == input.location) {
                None => problems.push(format!(
                    "fragment input at location {} is not written by the vertex stage",
                    input.location
                )),
                Some(out) if out.ty != input.ty => problems.push(format!(
                    "location {} type mismatch: vertex writes {:?}, fragment reads {:?}",
                    input.location, out.ty, input.ty
                )),
                Some(_) => {}
            }
        }

        let mut blocks = uniform_blocks(&vertex.module);
        for block in uniform_blocks(&fragment.module) {
            match blocks.iter().find(|existing| existing.slot == block.slot) {
                Some(existing) if !existing.same_layout(&block) => problems.push(format!(
                    "uniform block at group {} binding {} is declared differently by each stage",
                    block.slot.group, block.slot.binding
                )),
                Some(_) => {}
                None => blocks.push(block),
            }
        }

        if !problems.is_empty() {
            return Err(ShaderError::Link {
                log: problems.join("\n"),
            });
        }

        let uniforms = UniformTable::resolve(&blocks);
        for missing in uniforms.unresolved() {
            log::debug!("Uniform '{}' is not declared by the program", missing.name());
        }

        let texture = resource_slot(&fragment.module, TEXTURE_VARIABLE);
        let sampler = resource_slot(&fragment.module, SAMPLER_VARIABLE);

        Ok(Self {
            vertex,
            fragment,
            blocks,
            uniforms,
            texture,
            sampler,
        })
    }

    pub fn uniforms(&self) -> &UniformTable {
        &self.uniforms
    }

    /// Size in bytes of the uniform block at `slot`, zero if undeclared.
    pub fn block_size(&self, slot: BindingSlot) -> u32 {
        self.blocks
            .iter()
            .find(|block| block.slot == slot)
            .map_or(0, |block| block.size)
    }

    pub fn texture_slot(&self) -> Option<BindingSlot> {
        self.texture
    }

    pub fn sampler_slot(&self) -> Option<BindingSlot> {
        self.sampler
    }
}

/// A linked program with its GPU pipelines.
///
/// Fans are lowered to triangle lists at upload, so two pipelines cover
/// every draw: one for lists and one for strips.
pub struct ShaderProgram {
    linked: LinkedProgram,
    triangles: wgpu::RenderPipeline,
    strips: wgpu::RenderPipeline,
    pub(crate) frame_layout: wgpu::BindGroupLayout,
    pub(crate) object_layout: wgpu::BindGroupLayout,
    pub(crate) texture_layout: wgpu::BindGroupLayout,
}

impl ShaderProgram {
    /// Compile, link and create a program from two WGSL sources.
    pub fn build(
        gpu: &GpuContext,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        let vertex = compile_stage(ShaderStage::Vertex, vertex_source)?;
        let fragment = compile_stage(ShaderStage::Fragment, fragment_source)?;
        let linked = LinkedProgram::link(vertex, fragment)?;
        Self::create(gpu, linked)
    }

    /// The Phong-lit textured program every scene object is drawn with.
    pub fn scene(gpu: &GpuContext) -> Result<Self, ShaderError> {
        Self::build(gpu, &scene_vertex_source(), &scene_fragment_source())
    }

    pub fn linked(&self) -> &LinkedProgram {
        &self.linked
    }

    pub fn uniforms(&self) -> &UniformTable {
        self.linked.uniforms()
    }

    pub fn pipeline(&self, primitive: Primitive) -> &wgpu::RenderPipeline {
        match primitive {
            Primitive::Triangles => &self.triangles,
            Primitive::TriangleStrip => &self.strips,
        }
    }

    /// Bind group that makes `texture` the sampled texture unit.
    pub fn texture_bind_group(&self, gpu: &GpuContext, texture: &Texture) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture Unit Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: self.linked.texture.map_or(0, |slot| slot.binding),
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: self.linked.sampler.map_or(1, |slot| slot.binding),
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    fn create(gpu: &GpuContext, linked: LinkedProgram) -> Result<Self, ShaderError> {
        let device = &gpu.device;

        let vertex_module = linked.vertex.create_module(device)?;
        let fragment_module = linked.fragment.create_module(device)?;

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: FRAME_BLOCK.binding,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(linked.block_size(FRAME_BLOCK) as u64),
                },
                count: None,
            }],
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: OBJECT_BLOCK.binding,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(linked.block_size(OBJECT_BLOCK) as u64),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: linked.texture.map_or(0, |slot| slot.binding),
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: linked.sampler.map_or(1, |slot| slot.binding),
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &object_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let stages = PipelineStages {
            layout: &pipeline_layout,
            vertex: &vertex_module,
            vertex_entry: linked.vertex.entry_point(),
            fragment: &fragment_module,
            fragment_entry: linked.fragment.entry_point(),
            format: gpu.config.format,
        };

        let link_error = |log| ShaderError::Link { log };
        let triangles = checked(device, link_error, || {
            stages.create(device, "Scene Triangle Pipeline", wgpu::PrimitiveTopology::TriangleList)
        })?;
        let strips = checked(device, link_error, || {
            stages.create(device, "Scene Strip Pipeline", wgpu::PrimitiveTopology::TriangleStrip)
        })?;

        log::info!(
            "Built shader program ({} -> {})",
            linked.vertex.entry_point(),
            linked.fragment.entry_point()
        );

        Ok(Self {
            linked,
            triangles,
            strips,
            frame_layout,
            object_layout,
            texture_layout,
        })
    }
}

/// Run `create` inside a validation error scope.
fn checked<T>(
    device: &wgpu::Device,
    on_error: impl FnOnce(String) -> ShaderError,
    create: impl FnOnce() -> T,
) -> Result<T, ShaderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(on_error(err.to_string())),
        None => Ok(value),
    }
}

struct PipelineStages<'a> {
    layout: &'a wgpu::PipelineLayout,
    vertex: &'a wgpu::ShaderModule,
    vertex_entry: &'a str,
    fragment: &'a wgpu::ShaderModule,
    fragment_entry: &'a str,
    format: wgpu::TextureFormat,
}

impl PipelineStages<'_> {
    fn create(
        &self,
        device: &wgpu::Device,
        label: &str,
        topology: wgpu::PrimitiveTopology,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(self.layout),
            vertex: wgpu::VertexState {
                module: self.vertex,
                entry_point: Some(self.vertex_entry),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: self.fragment,
                entry_point: Some(self.fragment_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            // Scaled cylinders flip winding (negative Y scale), so nothing is culled.
            primitive: wgpu::PrimitiveState {
                topology,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::{Uniform, UniformKind};

    const PASS_VERTEX: &str = "
        struct Out {
            @builtin(position) clip: vec4<f32>,
            @location(0) shade: vec3<f32>,
        }
        @vertex
        fn vs_main(@location(0) position: vec3<f32>) -> Out {
            var out: Out;
            out.clip = vec4<f32>(position, 1.0);
            out.shade = position;
            return out;
        }
    ";

    const PASS_FRAGMENT: &str = "
        @fragment
        fn fs_main(@location(0) shade: vec3<f32>) -> @location(0) vec4<f32> {
            return vec4<f32>(shade, 1.0);
        }
    ";

    fn link(vertex: &str, fragment: &str) -> Result<LinkedProgram, ShaderError> {
        let vertex = compile_stage(ShaderStage::Vertex, vertex)?;
        let fragment = compile_stage(ShaderStage::Fragment, fragment)?;
        LinkedProgram::link(vertex, fragment)
    }

    #[test]
    fn scene_program_links() {
        let program = link(&scene_vertex_source(), &scene_fragment_source())
            .expect("scene shaders link");

        assert_eq!(program.uniforms().unresolved().count(), 0);
        assert_eq!(
            program.texture_slot(),
            Some(BindingSlot::new(TEXTURE_GROUP, 0))
        );
        assert_eq!(
            program.sampler_slot(),
            Some(BindingSlot::new(TEXTURE_GROUP, 1))
        );
        assert_eq!(program.block_size(FRAME_BLOCK), 224);
        assert_eq!(program.block_size(OBJECT_BLOCK), 144);
    }

    #[test]
    fn scene_uniform_locations_follow_block_layout() {
        let program = link(&scene_vertex_source(), &scene_fragment_source())
            .expect("scene shaders link");
        let uniforms = program.uniforms();

        let model = uniforms.location(Uniform::Model).expect("model");
        assert_eq!(model.slot, OBJECT_BLOCK);
        assert_eq!(model.offset, 0);
        assert_eq!(model.kind, UniformKind::Mat4);

        let color = uniforms.location(Uniform::ObjectColor).expect("object_color");
        assert_eq!(color.offset, 128);
        assert_eq!(color.kind, UniformKind::Vec4);

        let view_position = uniforms.location(Uniform::ViewPosition).expect("view_position");
        assert_eq!(view_position.slot, FRAME_BLOCK);
        assert_eq!(view_position.offset, 128);

        let flag = uniforms.location(Uniform::HasTexture).expect("has_texture");
        assert_eq!(flag.offset, 220);
        assert_eq!(flag.kind, UniformKind::U32);
    }

    #[test]
    fn vertex_syntax_error_fails_compile() {
        let broken = "@vertex fn vs_main( -> @builtin(position) vec4<f32> { return; }";

        match compile_stage(ShaderStage::Vertex, broken) {
            Err(ShaderError::Compile { stage, log }) => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert!(!log.is_empty());
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn fragment_type_error_fails_compile() {
        let broken = "
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                let x: f32 = 1u;
                return vec4<f32>(x);
            }
        ";

        let err = compile_stage(ShaderStage::Fragment, broken).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
    }

    #[test]
    fn missing_entry_point_fails_compile() {
        let err = compile_stage(ShaderStage::Fragment, PASS_VERTEX).unwrap_err();
        match err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("@fragment"));
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn minimal_program_links_without_uniforms() {
        let program = link(PASS_VERTEX, PASS_FRAGMENT).expect("pass-through links");

        assert_eq!(program.uniforms().unresolved().count(), Uniform::COUNT);
        assert!(program.uniforms().location(Uniform::View).is_none());
        assert_eq!(program.block_size(FRAME_BLOCK), 0);
        assert!(program.texture_slot().is_none());
    }

    #[test]
    fn unwritten_fragment_input_fails_link() {
        let fragment = "
            @fragment
            fn fs_main(@location(3) extra: f32) -> @location(0) vec4<f32> {
                return vec4<f32>(extra);
            }
        ";

        match link(PASS_VERTEX, fragment) {
            Err(ShaderError::Link { log }) => assert!(log.contains("location 3")),
            other => panic!("expected link error, got {other:?}"),
        }
    }

    #[test]
    fn interface_type_mismatch_fails_link() {
        let fragment = "
            @fragment
            fn fs_main(@location(0) shade: vec2<f32>) -> @location(0) vec4<f32> {
                return vec4<f32>(shade, 0.0, 1.0);
            }
        ";

        let err = link(PASS_VERTEX, fragment).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
    }

    #[test]
    fn conflicting_uniform_blocks_fail_link() {
        let vertex = "
            struct Camera { view: mat4x4<f32> }
            @group(0) @binding(0) var<uniform> camera: Camera;
            @vertex
            fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
                return camera.view * vec4<f32>(position, 1.0);
            }
        ";
        let fragment = "
            struct Tint { color: vec4<f32> }
            @group(0) @binding(0) var<uniform> tint: Tint;
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return tint.color;
            }
        ";

        match link(vertex, fragment) {
            Err(ShaderError::Link { log }) => assert!(log.contains("group 0 binding 0")),
            other => panic!("expected link error, got {other:?}"),
        }
    }

    #[test]
    fn stages_must_be_in_order() {
        let vertex = compile_stage(ShaderStage::Vertex, PASS_VERTEX).unwrap();
        let fragment = compile_stage(ShaderStage::Fragment, PASS_FRAGMENT).unwrap();

        let err = LinkedProgram::link(fragment, vertex).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
    }
}
