//! GPU mesh upload and draw ranges.
//!
//! [`GpuMesh`] holds the uploaded buffers for one [`Shape`] and the list of
//! [`GpuDraw`]s that render it. wgpu has no fan topology, so fan batches are
//! rewritten into indexed triangle lists appended after the mesh's own
//! indices; the vertex buffer keeps the generator's layout.
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |

use std::ops::Range;

use crate::gpu::GpuContext;
use crate::shader::ShaderProgram;
use crate::shapes::{MeshData, Shape, Topology};

/// A vertex with position, normal, and texture coordinates (32 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    /// Model-space position.
    pub position: [f32; 3],
    /// Surface normal, unit length.
    pub normal: [f32; 3],
    /// Texture coordinates, repeating outside [0, 1].
    pub uv: [f32; 2],
}

impl Vertex3d {
    /// Vertex buffer layout matching the scene vertex shader inputs.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Topologies the render pipelines exist for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
    TriangleStrip,
}

/// One draw call: a range of indices when `indexed`, of vertices otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GpuDraw {
    pub primitive: Primitive,
    pub range: Range<u32>,
    pub indexed: bool,
}

/// Index list and draws after fan lowering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoweredMesh {
    pub indices: Vec<u32>,
    pub draws: Vec<GpuDraw>,
}

/// Rewrite fan batches as indexed triangle lists.
///
/// A fan over vertices `v0..vn` becomes triangles `(v0, vi, vi+1)` for
/// `i in 1..n-1`. Fans shorter than three elements draw nothing.
pub fn lower_batches(data: &MeshData) -> LoweredMesh {
    let mut indices = data.indices.clone();
    let mut draws = Vec::with_capacity(data.batches.len());
    let indexed = data.is_indexed();

    for batch in &data.batches {
        let range = batch.first..batch.first + batch.count;
        match batch.topology {
            Topology::Triangles => draws.push(GpuDraw {
                primitive: Primitive::Triangles,
                range,
                indexed,
            }),
            Topology::TriangleStrip => draws.push(GpuDraw {
                primitive: Primitive::TriangleStrip,
                range,
                indexed,
            }),
            Topology::TriangleFan => {
                let vertex = |element: u32| {
                    if indexed {
                        data.indices[element as usize]
                    } else {
                        element
                    }
                };

                let start = indices.len() as u32;
                if batch.count >= 3 {
                    let hub = vertex(batch.first);
                    for i in 1..batch.count - 1 {
                        indices.push(hub);
                        indices.push(vertex(batch.first + i));
                        indices.push(vertex(batch.first + i + 1));
                    }
                }
                draws.push(GpuDraw {
                    primitive: Primitive::Triangles,
                    range: start..indices.len() as u32,
                    indexed: true,
                });
            }
        }
    }

    LoweredMesh { indices, draws }
}

/// GPU-resident mesh geometry with its draw list.
#[derive(Debug)]
pub struct GpuMesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: Option<wgpu::Buffer>,
    pub(crate) draws: Vec<GpuDraw>,
}

impl GpuMesh {
    pub fn upload(gpu: &GpuContext, data: &MeshData, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let lowered = lower_batches(data);

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertex Buffer")),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = (!lowered.indices.is_empty()).then(|| {
            gpu.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label} Index Buffer")),
                    contents: bytemuck::cast_slice(&lowered.indices),
                    usage: wgpu::BufferUsages::INDEX,
                })
        });

        log::debug!(
            "Uploaded {label}: {} vertices, {} indices, {} draws",
            data.vertices.len(),
            lowered.indices.len(),
            lowered.draws.len()
        );

        Self {
            vertex_buffer,
            index_buffer,
            draws: lowered.draws,
        }
    }

    /// Issue every draw of this mesh. Bind groups must already be set.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, program: &ShaderProgram) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        if let Some(index_buffer) = &self.index_buffer {
            pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        }

        for draw in &self.draws {
            pass.set_pipeline(program.pipeline(draw.primitive));
            if draw.indexed {
                pass.draw_indexed(draw.range.clone(), 0, 0..1);
            } else {
                pass.draw(draw.range.clone(), 0..1);
            }
        }
    }
}

/// One uploaded mesh per [`Shape`].
pub struct MeshLibrary {
    meshes: Vec<(Shape, GpuMesh)>,
}

impl MeshLibrary {
    pub fn upload(gpu: &GpuContext) -> Self {
        let meshes = Shape::ALL
            .into_iter()
            .map(|shape| (shape, GpuMesh::upload(gpu, &shape.generate(), shape.name())))
            .collect();
        Self { meshes }
    }

    pub fn get(&self, shape: Shape) -> Option<&GpuMesh> {
        self.meshes
            .iter()
            .find(|(candidate, _)| *candidate == shape)
            .map(|(_, mesh)| mesh)
    }
}
