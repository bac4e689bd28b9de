//! Memory locations and memory type encoding.

use serde::{Deserialize, Serialize};

use crate::interface::Backend;
use crate::resource::{BufferDesc, TextureDesc};

/// Where resource memory should live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MemoryLocation {
    /// Device-local, not host visible.
    #[default]
    Device,
    /// Device-local and host visible (resizable BAR); falls back to host memory.
    DeviceUpload,
    /// Host memory written by the CPU, read by the GPU.
    HostUpload,
    /// Host memory written by the GPU, read by the CPU.
    HostReadback,
}

impl MemoryLocation {
    /// Whether the CPU can map memory from this location.
    pub const fn is_host_visible(self) -> bool {
        !matches!(self, Self::Device)
    }

    const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Device),
            1 => Some(Self::DeviceUpload),
            2 => Some(Self::HostUpload),
            3 => Some(Self::HostReadback),
            _ => None,
        }
    }
}

/// Decoded backend memory type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemoryTypeInfo {
    /// Native memory type index.
    pub index: u16,
    pub location: MemoryLocation,
    pub must_be_dedicated: bool,
}

/// Opaque memory type as handed out by `get_*_memory_desc`.
///
/// Layout: bits 0..16 native index, 16..24 location, bit 24 dedicated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct MemoryType(pub u32);

impl MemoryType {
    const DEDICATED_BIT: u32 = 1 << 24;

    pub const fn pack(info: MemoryTypeInfo) -> Self {
        let mut bits = info.index as u32 | ((info.location as u32) << 16);
        if info.must_be_dedicated {
            bits |= Self::DEDICATED_BIT;
        }
        Self(bits)
    }

    /// Returns `None` for values not produced by [`MemoryType::pack`].
    pub const fn unpack(self) -> Option<MemoryTypeInfo> {
        let location = match MemoryLocation::from_bits(((self.0 >> 16) & 0xFF) as u8) {
            Some(location) => location,
            None => return None,
        };
        if self.0 >> 25 != 0 {
            return None;
        }
        Some(MemoryTypeInfo {
            index: (self.0 & 0xFFFF) as u16,
            location,
            must_be_dedicated: self.0 & Self::DEDICATED_BIT != 0,
        })
    }
}

/// Memory requirements of a resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryDesc {
    pub size: u64,
    pub alignment: u64,
    pub memory_type: MemoryType,
    pub must_be_dedicated: bool,
}

/// Parameters of `allocate_memory`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AllocateMemoryDesc {
    pub size: u64,
    pub memory_type: MemoryType,
    /// `-1.0..=1.0`, mapped onto the native priority range when supported.
    pub priority: f32,
}

pub struct BufferMemoryBindingDesc<'a, B: Backend> {
    pub buffer: &'a B::Buffer,
    pub memory: &'a B::Memory,
    pub offset: u64,
}

pub struct TextureMemoryBindingDesc<'a, B: Backend> {
    pub texture: &'a B::Texture,
    pub memory: &'a B::Memory,
    pub offset: u64,
}

pub struct AccelerationStructureMemoryBindingDesc<'a, B: Backend> {
    pub acceleration_structure: &'a B::AccelerationStructure,
    pub memory: &'a B::Memory,
    pub offset: u64,
}

/// Parameters of `allocate_buffer` on the resource allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocateBufferDesc {
    pub desc: BufferDesc,
    pub memory_location: MemoryLocation,
    pub dedicated: bool,
}

/// Parameters of `allocate_texture` on the resource allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocateTextureDesc {
    pub desc: TextureDesc,
    pub memory_location: MemoryLocation,
    pub dedicated: bool,
}

/// Round `value` up to `alignment` (a power of two, or 0 for no alignment).
#[inline]
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        value
    } else {
        (value + alignment - 1) & !(alignment - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_type_packing() {
        let info = MemoryTypeInfo {
            index: 7,
            location: MemoryLocation::HostReadback,
            must_be_dedicated: true,
        };
        let packed = MemoryType::pack(info);
        assert_eq!(packed.0, 7 | (3 << 16) | (1 << 24));
        assert_eq!(packed.unpack(), Some(info));
    }

    #[test]
    fn foreign_bits_rejected() {
        assert_eq!(MemoryType(5 << 16).unpack(), None);
        assert_eq!(MemoryType(1 << 30).unpack(), None);
    }

    #[test]
    fn alignment() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(300, 0), 300);
    }
}
