//! CPU-side geometry for the five scene shapes.
//!
//! Every generator returns a [`MeshData`]: vertices in the [`Vertex3d`]
//! layout, an optional index list, and the primitive batches that draw it.
//! Batches keep GL-style fans; [`crate::mesh`] lowers them when uploading.

use std::f32::consts::{PI, TAU};

use crate::mesh::Vertex3d;

/// Rim vertices in each cylinder cap (10 degree steps).
pub const CYLINDER_CAP_VERTICES: u32 = 36;
/// Vertices in the cylinder side strip (73 pairs at 5 degree steps, closing the loop).
pub const CYLINDER_SIDE_VERTICES: u32 = 146;

pub const TORUS_MAIN_SEGMENTS: u32 = 30;
pub const TORUS_TUBE_SEGMENTS: u32 = 30;
pub const TORUS_MAIN_RADIUS: f32 = 1.0;
pub const TORUS_TUBE_RADIUS: f32 = 0.1;

pub const SPHERE_SEGMENTS: u32 = 32;
pub const SPHERE_RINGS: u32 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Plane,
    Cylinder,
    Box,
    Torus,
    Sphere,
}

impl Shape {
    pub const ALL: [Shape; 5] = [
        Shape::Plane,
        Shape::Cylinder,
        Shape::Box,
        Shape::Torus,
        Shape::Sphere,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Shape::Plane => "plane",
            Shape::Cylinder => "cylinder",
            Shape::Box => "box",
            Shape::Torus => "torus",
            Shape::Sphere => "sphere",
        }
    }

    pub fn generate(self) -> MeshData {
        match self {
            Shape::Plane => plane(),
            Shape::Cylinder => cylinder(),
            Shape::Box => cube(),
            Shape::Torus => torus(TORUS_MAIN_SEGMENTS, TORUS_TUBE_SEGMENTS),
            Shape::Sphere => sphere(SPHERE_SEGMENTS, SPHERE_RINGS),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    TriangleFan,
    TriangleStrip,
}

/// A run of `count` elements starting at `first`. Elements are indices when
/// the mesh has an index list, vertices otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Batch {
    pub topology: Topology,
    pub first: u32,
    pub count: u32,
}

impl Batch {
    pub fn new(topology: Topology, first: u32, count: u32) -> Self {
        Self {
            topology,
            first,
            count,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
    pub batches: Vec<Batch>,
}

impl MeshData {
    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    fn indexed(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        let count = indices.len() as u32;
        Self {
            vertices,
            indices,
            batches: vec![Batch::new(Topology::Triangles, 0, count)],
        }
    }
}

/// A 2x2 square in the XZ plane facing +Y.
pub fn plane() -> MeshData {
    let up = [0.0, 1.0, 0.0];
    let vertices = vec![
        Vertex3d::new([-1.0, 0.0, 1.0], up, [0.0, 0.0]),
        Vertex3d::new([1.0, 0.0, 1.0], up, [1.0, 0.0]),
        Vertex3d::new([1.0, 0.0, -1.0], up, [1.0, 1.0]),
        Vertex3d::new([-1.0, 0.0, -1.0], up, [0.0, 1.0]),
    ];
    MeshData::indexed(vertices, vec![0, 1, 2, 2, 3, 0])
}

/// Unit cube centered at the origin, four vertices per face.
pub fn cube() -> MeshData {
    #[rustfmt::skip]
    let vertices = vec![
        // Front face (Z+)
        Vertex3d::new([-0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0], [0.0, 0.0]),
        Vertex3d::new([ 0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0], [1.0, 0.0]),
        Vertex3d::new([ 0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0], [1.0, 1.0]),
        Vertex3d::new([-0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0], [0.0, 1.0]),
        // Back face (Z-)
        Vertex3d::new([ 0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0], [0.0, 0.0]),
        Vertex3d::new([-0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0], [1.0, 0.0]),
        Vertex3d::new([-0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0], [1.0, 1.0]),
        Vertex3d::new([ 0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0], [0.0, 1.0]),
        // Top face (Y+)
        Vertex3d::new([-0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0], [0.0, 0.0]),
        Vertex3d::new([ 0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0], [1.0, 0.0]),
        Vertex3d::new([ 0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0], [1.0, 1.0]),
        Vertex3d::new([-0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0], [0.0, 1.0]),
        // Bottom face (Y-)
        Vertex3d::new([-0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0], [0.0, 0.0]),
        Vertex3d::new([ 0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0], [1.0, 0.0]),
        Vertex3d::new([ 0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0], [1.0, 1.0]),
        Vertex3d::new([-0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0], [0.0, 1.0]),
        // Right face (X+)
        Vertex3d::new([ 0.5, -0.5,  0.5], [ 1.0,  0.0,  0.0], [0.0, 0.0]),
        Vertex3d::new([ 0.5, -0.5, -0.5], [ 1.0,  0.0,  0.0], [1.0, 0.0]),
        Vertex3d::new([ 0.5,  0.5, -0.5], [ 1.0,  0.0,  0.0], [1.0, 1.0]),
        Vertex3d::new([ 0.5,  0.5,  0.5], [ 1.0,  0.0,  0.0], [0.0, 1.0]),
        // Left face (X-)
        Vertex3d::new([-0.5, -0.5, -0.5], [-1.0,  0.0,  0.0], [0.0, 0.0]),
        Vertex3d::new([-0.5, -0.5,  0.5], [-1.0,  0.0,  0.0], [1.0, 0.0]),
        Vertex3d::new([-0.5,  0.5,  0.5], [-1.0,  0.0,  0.0], [1.0, 1.0]),
        Vertex3d::new([-0.5,  0.5, -0.5], [-1.0,  0.0,  0.0], [0.0, 1.0]),
    ];

    #[rustfmt::skip]
    let indices: Vec<u32> = vec![
        0,  1,  2,  2,  3,  0,  // front
        4,  5,  6,  6,  7,  4,  // back
        8,  9,  10, 10, 11, 8,  // top
        12, 13, 14, 14, 15, 12, // bottom
        16, 17, 18, 18, 19, 16, // right
        20, 21, 22, 22, 23, 20, // left
    ];

    MeshData::indexed(vertices, indices)
}

/// Radius 1 cylinder standing on the XZ plane, from y = 0 to y = 1.
///
/// Vertex runs: bottom cap fan `0..36`, top cap fan `36..72`, side strip
/// `72..218`. Draw code depends on this split.
pub fn cylinder() -> MeshData {
    let mut vertices = Vec::with_capacity(
        (2 * CYLINDER_CAP_VERTICES + CYLINDER_SIDE_VERTICES) as usize,
    );

    for (y, normal_y) in [(0.0, -1.0), (1.0, 1.0)] {
        for step in 0..CYLINDER_CAP_VERTICES {
            let angle = (step as f32 * 10.0).to_radians();
            let (sin, cos) = angle.sin_cos();
            vertices.push(Vertex3d::new(
                [cos, y, sin],
                [0.0, normal_y, 0.0],
                [0.5 + 0.5 * cos, 0.5 + 0.5 * sin],
            ));
        }
    }

    for step in 0..CYLINDER_SIDE_VERTICES / 2 {
        let degrees = step as f32 * 5.0;
        let (sin, cos) = degrees.to_radians().sin_cos();
        let u = degrees / 360.0;
        vertices.push(Vertex3d::new([cos, 0.0, sin], [cos, 0.0, sin], [u, 0.0]));
        vertices.push(Vertex3d::new([cos, 1.0, sin], [cos, 0.0, sin], [u, 1.0]));
    }

    MeshData {
        vertices,
        indices: Vec::new(),
        batches: vec![
            Batch::new(Topology::TriangleFan, 0, CYLINDER_CAP_VERTICES),
            Batch::new(
                Topology::TriangleFan,
                CYLINDER_CAP_VERTICES,
                CYLINDER_CAP_VERTICES,
            ),
            Batch::new(
                Topology::TriangleStrip,
                2 * CYLINDER_CAP_VERTICES,
                CYLINDER_SIDE_VERTICES,
            ),
        ],
    }
}

/// Ring in the XY plane around the Z axis, as an unindexed triangle list.
pub fn torus(main_segments: u32, tube_segments: u32) -> MeshData {
    let point = |main: u32, tube: u32| {
        let theta = TAU * main as f32 / main_segments as f32;
        let phi = TAU * tube as f32 / tube_segments as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let ring = TORUS_MAIN_RADIUS + TORUS_TUBE_RADIUS * cos_phi;
        Vertex3d::new(
            [ring * cos_theta, ring * sin_theta, TORUS_TUBE_RADIUS * sin_phi],
            [cos_phi * cos_theta, cos_phi * sin_theta, sin_phi],
            [
                main as f32 / main_segments as f32,
                tube as f32 / tube_segments as f32,
            ],
        )
    };

    let mut vertices = Vec::with_capacity((main_segments * tube_segments * 6) as usize);
    for main in 0..main_segments {
        for tube in 0..tube_segments {
            let a = point(main, tube);
            let b = point(main + 1, tube);
            let c = point(main + 1, tube + 1);
            let d = point(main, tube + 1);
            vertices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }

    let count = vertices.len() as u32;
    MeshData {
        vertices,
        indices: Vec::new(),
        batches: vec![Batch::new(Topology::Triangles, 0, count)],
    }
}

/// Radius 1 UV sphere centered at the origin.
pub fn sphere(segments: u32, rings: u32) -> MeshData {
    let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
    let mut indices = Vec::with_capacity((segments * rings * 6) as usize);

    for ring in 0..=rings {
        let phi = PI * ring as f32 / rings as f32;
        let y = phi.cos();
        let ring_radius = phi.sin();

        for seg in 0..=segments {
            let theta = TAU * seg as f32 / segments as f32;
            let x = ring_radius * theta.cos();
            let z = ring_radius * theta.sin();

            let uv = [seg as f32 / segments as f32, ring as f32 / rings as f32];
            vertices.push(Vertex3d::new([x, y, z], [x, y, z], uv));
        }
    }

    for ring in 0..rings {
        for seg in 0..segments {
            let current = ring * (segments + 1) + seg;
            let next = current + segments + 1;

            indices.extend_from_slice(&[current, next, current + 1]);
            indices.extend_from_slice(&[current + 1, next, next + 1]);
        }
    }

    MeshData::indexed(vertices, indices)
}
