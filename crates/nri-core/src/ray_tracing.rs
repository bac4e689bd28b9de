//! Ray tracing extension types.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::format::Format;
use crate::interface::Backend;
use crate::pipeline::{IndexType, ShaderDesc};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccelerationStructureType {
    TopLevel,
    BottomLevel,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AccelerationStructureBits: u8 {
        const ALLOW_UPDATE = 1 << 0;
        const ALLOW_COMPACTION = 1 << 1;
        const PREFER_FAST_TRACE = 1 << 2;
        const PREFER_FAST_BUILD = 1 << 3;
        const MINIMIZE_MEMORY = 1 << 4;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BottomLevelGeometryBits: u8 {
        const OPAQUE_GEOMETRY = 1 << 0;
        const NO_DUPLICATE_ANY_HIT_INVOCATION = 1 << 1;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TopLevelInstanceBits: u8 {
        const TRIANGLE_CULL_DISABLE = 1 << 0;
        const TRIANGLE_FLIP_FACING = 1 << 1;
        const FORCE_OPAQUE = 1 << 2;
        const FORCE_NON_OPAQUE = 1 << 3;
    }
}

pub struct BottomLevelTrianglesDesc<'a, B: Backend> {
    pub vertex_buffer: &'a B::Buffer,
    pub vertex_offset: u64,
    pub vertex_num: u32,
    pub vertex_stride: u32,
    pub vertex_format: Format,
    /// `None` for non-indexed geometry.
    pub index_buffer: Option<&'a B::Buffer>,
    pub index_offset: u64,
    pub index_num: u32,
    pub index_type: IndexType,
    /// Buffer holding a 3x4 row-major transform.
    pub transform_buffer: Option<&'a B::Buffer>,
    pub transform_offset: u64,
}

pub struct BottomLevelAabbsDesc<'a, B: Backend> {
    pub buffer: &'a B::Buffer,
    pub offset: u64,
    pub num: u32,
    pub stride: u32,
}

pub enum BottomLevelGeometry<'a, B: Backend> {
    Triangles(BottomLevelTrianglesDesc<'a, B>),
    Aabbs(BottomLevelAabbsDesc<'a, B>),
}

pub struct BottomLevelGeometryDesc<'a, B: Backend> {
    pub geometry: BottomLevelGeometry<'a, B>,
    pub flags: BottomLevelGeometryBits,
}

impl<B: Backend> BottomLevelGeometryDesc<'_, B> {
    /// Primitive count as the build expects it.
    pub fn primitive_num(&self) -> u32 {
        match &self.geometry {
            BottomLevelGeometry::Triangles(t) if t.index_buffer.is_some() => t.index_num / 3,
            BottomLevelGeometry::Triangles(t) => t.vertex_num / 3,
            BottomLevelGeometry::Aabbs(a) => a.num,
        }
    }
}

pub struct AccelerationStructureDesc<'a, B: Backend> {
    pub as_type: AccelerationStructureType,
    pub flags: AccelerationStructureBits,
    /// Instance count for top-level structures.
    pub instance_num: u32,
    /// Geometry used to size bottom-level structures.
    pub geometries: &'a [BottomLevelGeometryDesc<'a, B>],
}

/// Instance record consumed by top-level builds (64 bytes, native layout).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TopLevelInstance {
    /// Row-major 3x4 transform.
    pub transform: [[f32; 4]; 3],
    /// Low 24 bits: instance id, high 8 bits: visibility mask.
    pub instance_id_and_mask: u32,
    /// Low 24 bits: SBT offset, high 8 bits: `TopLevelInstanceBits`.
    pub sbt_offset_and_flags: u32,
    /// From `get_acceleration_structure_handle`.
    pub acceleration_structure_handle: u64,
}

impl TopLevelInstance {
    pub const IDENTITY: [[f32; 4]; 3] = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
    ];

    pub fn new(handle: u64, instance_id: u32, mask: u8, sbt_offset: u32, flags: TopLevelInstanceBits) -> Self {
        Self {
            transform: Self::IDENTITY,
            instance_id_and_mask: (instance_id & 0x00FF_FFFF) | (u32::from(mask) << 24),
            sbt_offset_and_flags: (sbt_offset & 0x00FF_FFFF) | (u32::from(flags.bits()) << 24),
            acceleration_structure_handle: handle,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CopyMode {
    Clone,
    Compact,
}

/// Shader indices into the pipeline's shader library, 1-based, 0 = unused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ShaderGroupDesc {
    pub shader_indices: [u32; 3],
}

pub struct RayTracingPipelineDesc<'a, B: Backend> {
    pub pipeline_layout: &'a B::PipelineLayout,
    pub shader_library: &'a [ShaderDesc<'a>],
    pub shader_groups: &'a [ShaderGroupDesc],
    pub recursion_max_depth: u32,
    pub ray_payload_max_size: u32,
    pub ray_hit_attribute_max_size: u32,
}

pub struct StridedBufferRegion<'a, B: Backend> {
    pub buffer: &'a B::Buffer,
    pub offset: u64,
    pub size: u64,
    pub stride: u64,
}

pub struct DispatchRaysDesc<'a, B: Backend> {
    pub raygen_shader: StridedBufferRegion<'a, B>,
    pub miss_shaders: Option<StridedBufferRegion<'a, B>>,
    pub hit_shader_groups: Option<StridedBufferRegion<'a, B>>,
    pub callable_shaders: Option<StridedBufferRegion<'a, B>>,
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_layout() {
        assert_eq!(std::mem::size_of::<TopLevelInstance>(), 64);
        let inst = TopLevelInstance::new(0xABCD, 0x0123_4567, 0xFF, 2, TopLevelInstanceBits::FORCE_OPAQUE);
        assert_eq!(inst.instance_id_and_mask, 0xFF23_4567);
        assert_eq!(inst.sbt_offset_and_flags, 2 | (4 << 24));
        assert_eq!(inst.acceleration_structure_handle, 0xABCD);
    }
}
