//! Uniform locations resolved from linked shader modules, and CPU-side
//! staging blocks the renderer writes them into.
//!
//! WGSL has no per-name uniform slots: values live as members of uniform
//! structs bound at a `(group, binding)`. A [`UniformLocation`] is therefore
//! the block a member lives in plus its byte offset and type. Locations are
//! looked up once after link and cached in a [`UniformTable`] keyed by the
//! [`Uniform`] enumeration; names the program does not declare resolve to
//! `None`, and writes through a `None` location are dropped.

use glam::{Mat4, Vec3, Vec4};
use naga::{AddressSpace, Module, Scalar, TypeInner, VectorSize};

/// Every uniform the scene renderer sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Uniform {
    Model,
    NormalMatrix,
    ObjectColor,
    View,
    Projection,
    ViewPosition,
    AmbientStrength,
    AmbientColor,
    Light1Color,
    Light1Position,
    Light2Color,
    Light2Position,
    SpecularIntensity1,
    HighlightSize1,
    SpecularIntensity2,
    HighlightSize2,
    HasTexture,
}

impl Uniform {
    pub const COUNT: usize = 17;

    pub const ALL: [Uniform; Self::COUNT] = [
        Uniform::Model,
        Uniform::NormalMatrix,
        Uniform::ObjectColor,
        Uniform::View,
        Uniform::Projection,
        Uniform::ViewPosition,
        Uniform::AmbientStrength,
        Uniform::AmbientColor,
        Uniform::Light1Color,
        Uniform::Light1Position,
        Uniform::Light2Color,
        Uniform::Light2Position,
        Uniform::SpecularIntensity1,
        Uniform::HighlightSize1,
        Uniform::SpecularIntensity2,
        Uniform::HighlightSize2,
        Uniform::HasTexture,
    ];

    /// Struct member name the uniform is looked up by.
    pub fn name(self) -> &'static str {
        match self {
            Uniform::Model => "model",
            Uniform::NormalMatrix => "normal_matrix",
            Uniform::ObjectColor => "object_color",
            Uniform::View => "view",
            Uniform::Projection => "projection",
            Uniform::ViewPosition => "view_position",
            Uniform::AmbientStrength => "ambient_strength",
            Uniform::AmbientColor => "ambient_color",
            Uniform::Light1Color => "light1_color",
            Uniform::Light1Position => "light1_position",
            Uniform::Light2Color => "light2_color",
            Uniform::Light2Position => "light2_position",
            Uniform::SpecularIntensity1 => "specular_intensity_1",
            Uniform::HighlightSize1 => "highlight_size_1",
            Uniform::SpecularIntensity2 => "specular_intensity_2",
            Uniform::HighlightSize2 => "highlight_size_2",
            Uniform::HasTexture => "has_texture",
        }
    }
}

/// The shader-side type of a uniform member, as far as the renderer cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    F32,
    U32,
    Vec3,
    Vec4,
    Mat4,
    /// Any type the renderer never writes.
    Other,
}

impl UniformKind {
    fn of(inner: &TypeInner) -> Self {
        match *inner {
            TypeInner::Scalar(scalar) if scalar == Scalar::F32 => UniformKind::F32,
            TypeInner::Scalar(scalar) if scalar == Scalar::U32 => UniformKind::U32,
            TypeInner::Vector {
                size: VectorSize::Tri,
                scalar,
            } if scalar == Scalar::F32 => UniformKind::Vec3,
            TypeInner::Vector {
                size: VectorSize::Quad,
                scalar,
            } if scalar == Scalar::F32 => UniformKind::Vec4,
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                scalar,
            } if scalar == Scalar::F32 => UniformKind::Mat4,
            _ => UniformKind::Other,
        }
    }
}

/// A `(group, binding)` pair in the pipeline layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingSlot {
    pub group: u32,
    pub binding: u32,
}

impl BindingSlot {
    pub const fn new(group: u32, binding: u32) -> Self {
        Self { group, binding }
    }
}

/// Where a uniform's bytes go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformLocation {
    pub slot: BindingSlot,
    pub offset: u32,
    pub kind: UniformKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockMember {
    pub name: String,
    pub offset: u32,
    pub kind: UniformKind,
}

/// Layout of one `var<uniform>` declaration.
#[derive(Clone, Debug)]
pub struct BlockLayout {
    pub slot: BindingSlot,
    pub size: u32,
    pub members: Vec<BlockMember>,
}

impl BlockLayout {
    /// Two declarations are interchangeable if size and members agree.
    pub fn same_layout(&self, other: &BlockLayout) -> bool {
        self.size == other.size && self.members == other.members
    }
}

/// Collect every uniform block a module declares.
pub fn uniform_blocks(module: &Module) -> Vec<BlockLayout> {
    let ctx = module.to_ctx();
    let mut blocks = Vec::new();

    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else {
            continue;
        };
        if var.space != AddressSpace::Uniform {
            continue;
        }

        let ty = &module.types[var.ty];
        let (size, members) = match &ty.inner {
            TypeInner::Struct { members, span } => {
                let members = members
                    .iter()
                    .filter_map(|member| {
                        Some(BlockMember {
                            name: member.name.clone()?,
                            offset: member.offset,
                            kind: UniformKind::of(&module.types[member.ty].inner),
                        })
                    })
                    .collect();
                (*span, members)
            }
            // A bare `var<uniform> name: T` is addressed by the variable name.
            inner => {
                let member = var.name.clone().map(|name| BlockMember {
                    name,
                    offset: 0,
                    kind: UniformKind::of(inner),
                });
                (inner.size(ctx), member.into_iter().collect())
            }
        };

        blocks.push(BlockLayout {
            slot: BindingSlot::new(binding.group, binding.binding),
            size,
            members,
        });
    }

    blocks
}

/// Binding of a texture or sampler variable, looked up by name.
pub fn resource_slot(module: &Module, name: &str) -> Option<BindingSlot> {
    module
        .global_variables
        .iter()
        .find(|(_, var)| var.space == AddressSpace::Handle && var.name.as_deref() == Some(name))
        .and_then(|(_, var)| var.binding.as_ref())
        .map(|binding| BindingSlot::new(binding.group, binding.binding))
}

/// Cached uniform locations, indexed by [`Uniform`].
#[derive(Clone, Debug)]
pub struct UniformTable {
    locations: [Option<UniformLocation>; Uniform::COUNT],
}

impl UniformTable {
    /// Resolve every [`Uniform`] by member name. The first block declaring a
    /// name wins.
    pub fn resolve(blocks: &[BlockLayout]) -> Self {
        let mut locations = [None; Uniform::COUNT];
        for uniform in Uniform::ALL {
            locations[uniform as usize] = blocks.iter().find_map(|block| {
                block
                    .members
                    .iter()
                    .find(|member| member.name == uniform.name())
                    .map(|member| UniformLocation {
                        slot: block.slot,
                        offset: member.offset,
                        kind: member.kind,
                    })
            });
        }
        Self { locations }
    }

    pub fn location(&self, uniform: Uniform) -> Option<UniformLocation> {
        self.locations[uniform as usize]
    }

    /// Uniforms the program does not declare.
    pub fn unresolved(&self) -> impl Iterator<Item = Uniform> + '_ {
        Uniform::ALL
            .into_iter()
            .filter(|uniform| self.locations[*uniform as usize].is_none())
    }
}

/// A value that can be written to a uniform location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    F32(f32),
    U32(u32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::F32(_) => UniformKind::F32,
            UniformValue::U32(_) => UniformKind::U32,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat4(_) => UniformKind::Mat4,
        }
    }

    fn write(&self, dst: &mut Vec<u8>) {
        match self {
            UniformValue::F32(v) => dst.extend_from_slice(bytemuck::bytes_of(v)),
            UniformValue::U32(v) => dst.extend_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec3(v) => dst.extend_from_slice(bytemuck::bytes_of(&v.to_array())),
            UniformValue::Vec4(v) => dst.extend_from_slice(bytemuck::bytes_of(&v.to_array())),
            UniformValue::Mat4(m) => dst.extend_from_slice(bytemuck::bytes_of(&m.to_cols_array())),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::F32(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        UniformValue::U32(v)
    }
}

/// WGSL has no host-shareable bool, so flags travel as `u32`.
impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::U32(v as u32)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

/// CPU-side bytes of one uniform block, uploaded with `Queue::write_buffer`.
#[derive(Clone, Debug)]
pub struct UniformBlock {
    slot: BindingSlot,
    bytes: Vec<u8>,
    scratch: Vec<u8>,
}

impl UniformBlock {
    pub fn new(slot: BindingSlot, size: u32) -> Self {
        Self {
            slot,
            bytes: vec![0; size as usize],
            scratch: Vec::with_capacity(64),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write `value` at `location`. Returns whether anything was written.
    ///
    /// Unresolved locations, locations in another block, and type mismatches
    /// are ignored.
    pub fn set(&mut self, location: Option<UniformLocation>, value: impl Into<UniformValue>) -> bool {
        let Some(location) = location else {
            return false;
        };
        let value = value.into();
        if location.slot != self.slot {
            return false;
        }
        if location.kind != value.kind() {
            log::warn!(
                "uniform at offset {} is {:?}, refusing to write {:?}",
                location.offset,
                location.kind,
                value.kind()
            );
            return false;
        }

        self.scratch.clear();
        value.write(&mut self.scratch);
        let start = location.offset as usize;
        let Some(dst) = self.bytes.get_mut(start..start + self.scratch.len()) else {
            return false;
        };
        dst.copy_from_slice(&self.scratch);
        true
    }
}
