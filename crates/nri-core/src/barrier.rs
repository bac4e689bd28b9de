//! Resource states and barriers.
//!
//! A state is a triple of access, layout (textures only) and the pipeline
//! stages the access happens in. Barriers transition between two states.

use bitflags::bitflags;

use crate::interface::Backend;
use crate::resource::REMAINING;

bitflags! {
    /// Pipeline stages. Also used as shader stage masks.
    ///
    /// An empty set means "no stage"; [`StageBits::ALL`] means every stage.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct StageBits: u32 {
        const INDEX_INPUT = 1 << 0;
        const VERTEX_SHADER = 1 << 1;
        const TESS_CONTROL_SHADER = 1 << 2;
        const TESS_EVALUATION_SHADER = 1 << 3;
        const GEOMETRY_SHADER = 1 << 4;
        const TASK_SHADER = 1 << 5;
        const MESH_SHADER = 1 << 6;
        const FRAGMENT_SHADER = 1 << 7;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 8;
        const COLOR_ATTACHMENT = 1 << 9;
        const COMPUTE_SHADER = 1 << 10;
        const RAYGEN_SHADER = 1 << 11;
        const MISS_SHADER = 1 << 12;
        const INTERSECTION_SHADER = 1 << 13;
        const CLOSEST_HIT_SHADER = 1 << 14;
        const ANY_HIT_SHADER = 1 << 15;
        const CALLABLE_SHADER = 1 << 16;
        const INDIRECT = 1 << 17;
        const COPY = 1 << 18;
        const RESOLVE = 1 << 19;
        const CLEAR_STORAGE = 1 << 20;
        const ACCELERATION_STRUCTURE = 1 << 21;

        const TESSELLATION_SHADERS = Self::TESS_CONTROL_SHADER.bits()
            | Self::TESS_EVALUATION_SHADER.bits();
        const MESH_SHADERS = Self::TASK_SHADER.bits() | Self::MESH_SHADER.bits();
        const GRAPHICS_SHADERS = Self::VERTEX_SHADER.bits()
            | Self::TESSELLATION_SHADERS.bits()
            | Self::GEOMETRY_SHADER.bits()
            | Self::MESH_SHADERS.bits()
            | Self::FRAGMENT_SHADER.bits();
        const RAY_TRACING_SHADERS = Self::RAYGEN_SHADER.bits()
            | Self::MISS_SHADER.bits()
            | Self::INTERSECTION_SHADER.bits()
            | Self::CLOSEST_HIT_SHADER.bits()
            | Self::ANY_HIT_SHADER.bits()
            | Self::CALLABLE_SHADER.bits();
        const ALL_SHADERS = Self::GRAPHICS_SHADERS.bits()
            | Self::COMPUTE_SHADER.bits()
            | Self::RAY_TRACING_SHADERS.bits();
        const GRAPHICS = Self::INDEX_INPUT.bits()
            | Self::GRAPHICS_SHADERS.bits()
            | Self::DEPTH_STENCIL_ATTACHMENT.bits()
            | Self::COLOR_ATTACHMENT.bits();
        const ALL = (1 << 22) - 1;
    }
}

bitflags! {
    /// How a resource is accessed.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AccessBits: u32 {
        const INDEX_BUFFER = 1 << 0;
        const VERTEX_BUFFER = 1 << 1;
        const CONSTANT_BUFFER = 1 << 2;
        const ARGUMENT_BUFFER = 1 << 3;
        const SHADER_RESOURCE = 1 << 4;
        const SHADER_RESOURCE_STORAGE = 1 << 5;
        const COLOR_ATTACHMENT = 1 << 6;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 7;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 8;
        const COPY_SOURCE = 1 << 9;
        const COPY_DESTINATION = 1 << 10;
        const RESOLVE_SOURCE = 1 << 11;
        const RESOLVE_DESTINATION = 1 << 12;
        const ACCELERATION_STRUCTURE_READ = 1 << 13;
        const ACCELERATION_STRUCTURE_WRITE = 1 << 14;
        const SHADING_RATE_ATTACHMENT = 1 << 15;
    }
}

impl AccessBits {
    /// Accesses that write.
    pub const WRITES: Self = Self::SHADER_RESOURCE_STORAGE
        .union(Self::COLOR_ATTACHMENT)
        .union(Self::DEPTH_STENCIL_ATTACHMENT_WRITE)
        .union(Self::COPY_DESTINATION)
        .union(Self::RESOLVE_DESTINATION)
        .union(Self::ACCELERATION_STRUCTURE_WRITE);

    pub fn has_writes(self) -> bool {
        self.intersects(Self::WRITES)
    }
}

/// Texture layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Layout {
    #[default]
    Unknown,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadonly,
    ShaderResource,
    ShaderResourceStorage,
    CopySource,
    CopyDestination,
    ResolveSource,
    ResolveDestination,
    Present,
    ShadingRateAttachment,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AccessStage {
    pub access: AccessBits,
    pub stages: StageBits,
}

impl AccessStage {
    pub const fn new(access: AccessBits, stages: StageBits) -> Self {
        Self { access, stages }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AccessLayoutStage {
    pub access: AccessBits,
    pub layout: Layout,
    pub stages: StageBits,
}

impl AccessLayoutStage {
    pub const fn new(access: AccessBits, layout: Layout, stages: StageBits) -> Self {
        Self {
            access,
            layout,
            stages,
        }
    }

    /// Initial state of a freshly created texture.
    pub const UNDEFINED: Self = Self::new(AccessBits::empty(), Layout::Unknown, StageBits::empty());

    pub const PRESENT: Self = Self::new(AccessBits::empty(), Layout::Present, StageBits::empty());
}

bitflags! {
    /// Aspects of a texture a barrier applies to; empty means every plane.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PlaneBits: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GlobalBarrierDesc {
    pub before: AccessStage,
    pub after: AccessStage,
}

pub struct BufferBarrierDesc<'a, B: Backend> {
    pub buffer: &'a B::Buffer,
    pub before: AccessStage,
    pub after: AccessStage,
}

pub struct TextureBarrierDesc<'a, B: Backend> {
    pub texture: &'a B::Texture,
    pub before: AccessLayoutStage,
    pub after: AccessLayoutStage,
    pub mip_offset: u32,
    pub mip_num: u32,
    pub layer_offset: u32,
    pub layer_num: u32,
    pub planes: PlaneBits,
    /// Queue ownership transfer source, when crossing queue families.
    pub src_queue: Option<&'a B::Queue>,
    pub dst_queue: Option<&'a B::Queue>,
}

impl<'a, B: Backend> TextureBarrierDesc<'a, B> {
    /// Whole-texture transition.
    pub fn new(texture: &'a B::Texture, before: AccessLayoutStage, after: AccessLayoutStage) -> Self {
        Self {
            texture,
            before,
            after,
            mip_offset: 0,
            mip_num: REMAINING,
            layer_offset: 0,
            layer_num: REMAINING,
            planes: PlaneBits::empty(),
            src_queue: None,
            dst_queue: None,
        }
    }
}

pub struct BarrierGroupDesc<'a, B: Backend> {
    pub globals: &'a [GlobalBarrierDesc],
    pub buffers: &'a [BufferBarrierDesc<'a, B>],
    pub textures: &'a [TextureBarrierDesc<'a, B>],
}

impl<B: Backend> Default for BarrierGroupDesc<'_, B> {
    fn default() -> Self {
        Self {
            globals: &[],
            buffers: &[],
            textures: &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_composites() {
        assert!(StageBits::ALL.contains(StageBits::ACCELERATION_STRUCTURE));
        assert!(StageBits::ALL_SHADERS.contains(StageBits::CALLABLE_SHADER));
        assert!(!StageBits::ALL_SHADERS.contains(StageBits::COPY));
        assert!(StageBits::GRAPHICS.contains(StageBits::INDEX_INPUT));
        assert!(!StageBits::GRAPHICS.contains(StageBits::COMPUTE_SHADER));
    }

    #[test]
    fn write_detection() {
        assert!(AccessBits::COPY_DESTINATION.has_writes());
        assert!(!(AccessBits::SHADER_RESOURCE | AccessBits::COPY_SOURCE).has_writes());
    }
}
