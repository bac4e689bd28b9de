//! Descriptor, descriptor set and pipeline layout descriptions.

use bitflags::bitflags;

use crate::barrier::StageBits;
use crate::interface::Backend;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorType {
    Sampler,
    ConstantBuffer,
    Texture,
    StorageTexture,
    Buffer,
    StorageBuffer,
    StructuredBuffer,
    StorageStructuredBuffer,
    AccelerationStructure,
}

impl DescriptorType {
    pub const COUNT: usize = 9;
    pub const ALL: [Self; Self::COUNT] = [
        Self::Sampler,
        Self::ConstantBuffer,
        Self::Texture,
        Self::StorageTexture,
        Self::Buffer,
        Self::StorageBuffer,
        Self::StructuredBuffer,
        Self::StorageStructuredBuffer,
        Self::AccelerationStructure,
    ];

    /// Whether shaders can write through this descriptor.
    pub const fn is_storage(self) -> bool {
        matches!(
            self,
            Self::StorageTexture | Self::StorageBuffer | Self::StorageStructuredBuffer
        )
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DescriptorRangeBits: u8 {
        /// Not every descriptor in the range needs to be valid.
        const PARTIALLY_BOUND = 1 << 0;
        /// The range is a single array binding.
        const ARRAY = 1 << 1;
        /// The array size is chosen at allocation time. Must be the last range.
        const VARIABLE_SIZED_ARRAY = 1 << 2;
        /// Descriptors may be updated after the set is bound.
        const ALLOW_UPDATE_AFTER_SET = 1 << 3;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DescriptorSetBits: u8 {
        const ALLOW_UPDATE_AFTER_SET = 1 << 0;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PipelineLayoutBits: u8 {
        /// Register indices are used as SPIR-V bindings verbatim.
        const IGNORE_GLOBAL_SPIRV_OFFSETS = 1 << 0;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DescriptorPoolBits: u8 {
        const ALLOW_UPDATE_AFTER_SET = 1 << 0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DescriptorRangeDesc {
    pub base_register_index: u32,
    pub descriptor_num: u32,
    pub descriptor_type: DescriptorType,
    pub shader_stages: StageBits,
    pub flags: DescriptorRangeBits,
}

impl DescriptorRangeDesc {
    pub const fn new(
        base_register_index: u32,
        descriptor_num: u32,
        descriptor_type: DescriptorType,
        shader_stages: StageBits,
    ) -> Self {
        Self {
            base_register_index,
            descriptor_num,
            descriptor_type,
            shader_stages,
            flags: DescriptorRangeBits::empty(),
        }
    }

    pub const fn with_flags(mut self, flags: DescriptorRangeBits) -> Self {
        self.flags = flags;
        self
    }

    /// Whether the range occupies one array binding rather than one binding per descriptor.
    pub const fn is_array(&self) -> bool {
        self.flags
            .intersects(DescriptorRangeBits::ARRAY.union(DescriptorRangeBits::VARIABLE_SIZED_ARRAY))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DescriptorSetDesc<'a> {
    pub register_space: u32,
    pub ranges: &'a [DescriptorRangeDesc],
    pub flags: DescriptorSetBits,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RootConstantDesc {
    pub register_index: u32,
    /// Bytes; rounded up to 4.
    pub size: u32,
    pub shader_stages: StageBits,
}

/// A descriptor bound directly into the layout, without a set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RootDescriptorDesc {
    pub register_index: u32,
    /// `ConstantBuffer`, `StructuredBuffer` or `StorageStructuredBuffer`.
    pub descriptor_type: DescriptorType,
    pub shader_stages: StageBits,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineLayoutDesc<'a> {
    /// Register space of root descriptors.
    pub root_register_space: u32,
    pub root_constants: &'a [RootConstantDesc],
    pub root_descriptors: &'a [RootDescriptorDesc],
    pub descriptor_sets: &'a [DescriptorSetDesc<'a>],
    pub shader_stages: StageBits,
    pub flags: PipelineLayoutBits,
}

/// Binding shifts applied per descriptor type when generating SPIR-V
/// bindings from HLSL-style registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpirvBindingOffsets {
    /// `s` registers.
    pub sampler_offset: u32,
    /// `t` registers.
    pub texture_offset: u32,
    /// `b` registers.
    pub constant_buffer_offset: u32,
    /// `u` registers.
    pub storage_texture_and_buffer_offset: u32,
}

impl Default for SpirvBindingOffsets {
    fn default() -> Self {
        Self {
            sampler_offset: 100,
            texture_offset: 0,
            constant_buffer_offset: 200,
            storage_texture_and_buffer_offset: 300,
        }
    }
}

impl SpirvBindingOffsets {
    pub const ZERO: Self = Self {
        sampler_offset: 0,
        texture_offset: 0,
        constant_buffer_offset: 0,
        storage_texture_and_buffer_offset: 0,
    };

    /// Offset added to the register index of a descriptor type.
    pub const fn offset_for(&self, descriptor_type: DescriptorType) -> u32 {
        match descriptor_type {
            DescriptorType::Sampler => self.sampler_offset,
            DescriptorType::ConstantBuffer => self.constant_buffer_offset,
            DescriptorType::Texture
            | DescriptorType::Buffer
            | DescriptorType::StructuredBuffer
            | DescriptorType::AccelerationStructure => self.texture_offset,
            DescriptorType::StorageTexture
            | DescriptorType::StorageBuffer
            | DescriptorType::StorageStructuredBuffer => self.storage_texture_and_buffer_offset,
        }
    }
}

/// Capacity of a descriptor pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DescriptorPoolDesc {
    pub descriptor_set_max_num: u32,
    pub sampler_max_num: u32,
    pub constant_buffer_max_num: u32,
    pub texture_max_num: u32,
    pub storage_texture_max_num: u32,
    pub buffer_max_num: u32,
    pub storage_buffer_max_num: u32,
    pub structured_buffer_max_num: u32,
    pub storage_structured_buffer_max_num: u32,
    pub acceleration_structure_max_num: u32,
    pub flags: DescriptorPoolBits,
}

impl DescriptorPoolDesc {
    /// Capacity for one descriptor type.
    pub const fn max_num(&self, descriptor_type: DescriptorType) -> u32 {
        match descriptor_type {
            DescriptorType::Sampler => self.sampler_max_num,
            DescriptorType::ConstantBuffer => self.constant_buffer_max_num,
            DescriptorType::Texture => self.texture_max_num,
            DescriptorType::StorageTexture => self.storage_texture_max_num,
            DescriptorType::Buffer => self.buffer_max_num,
            DescriptorType::StorageBuffer => self.storage_buffer_max_num,
            DescriptorType::StructuredBuffer => self.structured_buffer_max_num,
            DescriptorType::StorageStructuredBuffer => self.storage_structured_buffer_max_num,
            DescriptorType::AccelerationStructure => self.acceleration_structure_max_num,
        }
    }

    /// Grow this pool so it can hold `set_num` sets of `set`.
    pub fn reserve_for(&mut self, set: &DescriptorSetDesc<'_>, set_num: u32) {
        self.descriptor_set_max_num += set_num;
        for range in set.ranges {
            let n = range.descriptor_num * set_num;
            match range.descriptor_type {
                DescriptorType::Sampler => self.sampler_max_num += n,
                DescriptorType::ConstantBuffer => self.constant_buffer_max_num += n,
                DescriptorType::Texture => self.texture_max_num += n,
                DescriptorType::StorageTexture => self.storage_texture_max_num += n,
                DescriptorType::Buffer => self.buffer_max_num += n,
                DescriptorType::StorageBuffer => self.storage_buffer_max_num += n,
                DescriptorType::StructuredBuffer => self.structured_buffer_max_num += n,
                DescriptorType::StorageStructuredBuffer => {
                    self.storage_structured_buffer_max_num += n;
                }
                DescriptorType::AccelerationStructure => self.acceleration_structure_max_num += n,
            }
        }
    }
}

/// Writes `descriptors` into one range of a set, starting at `base_descriptor`.
pub struct DescriptorRangeUpdateDesc<'a, B: Backend> {
    pub descriptors: &'a [&'a B::Descriptor],
    pub base_descriptor: u32,
}

/// Copies ranges from one set into another.
pub struct DescriptorSetCopyDesc<'a, B: Backend> {
    pub src_descriptor_set: &'a B::DescriptorSet,
    pub src_base_range: u32,
    pub dst_base_range: u32,
    pub range_num: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_offsets() {
        let offsets = SpirvBindingOffsets::default();
        assert_eq!(offsets.offset_for(DescriptorType::Sampler), 100);
        assert_eq!(offsets.offset_for(DescriptorType::Texture), 0);
        assert_eq!(offsets.offset_for(DescriptorType::AccelerationStructure), 0);
        assert_eq!(offsets.offset_for(DescriptorType::ConstantBuffer), 200);
        assert_eq!(offsets.offset_for(DescriptorType::StorageStructuredBuffer), 300);
    }

    #[test]
    fn array_ranges() {
        let plain = DescriptorRangeDesc::new(0, 4, DescriptorType::Texture, StageBits::ALL);
        assert!(!plain.is_array());
        assert!(plain.with_flags(DescriptorRangeBits::ARRAY).is_array());
        assert!(plain
            .with_flags(DescriptorRangeBits::VARIABLE_SIZED_ARRAY)
            .is_array());
    }

    #[test]
    fn pool_reservation() {
        let ranges = [
            DescriptorRangeDesc::new(0, 2, DescriptorType::Texture, StageBits::FRAGMENT_SHADER),
            DescriptorRangeDesc::new(0, 1, DescriptorType::Sampler, StageBits::FRAGMENT_SHADER),
        ];
        let set = DescriptorSetDesc {
            register_space: 0,
            ranges: &ranges,
            ..Default::default()
        };
        let mut pool = DescriptorPoolDesc::default();
        pool.reserve_for(&set, 3);
        assert_eq!(pool.descriptor_set_max_num, 3);
        assert_eq!(pool.max_num(DescriptorType::Texture), 6);
        assert_eq!(pool.max_num(DescriptorType::Sampler), 3);
        assert_eq!(pool.max_num(DescriptorType::ConstantBuffer), 0);
    }
}
