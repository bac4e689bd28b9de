//! Device memory: memory type search and raw allocations.

use std::ptr::NonNull;

use ash::vk;
use nri_core::{
    AllocateMemoryDesc, Error, MemoryDesc, MemoryLocation, MemoryType, MemoryTypeInfo, Result,
};
use tracing::debug;

use crate::device::DeviceVk;
use crate::error::VkResultExt;

/// Property flags a location asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LocationFlags {
    required: vk::MemoryPropertyFlags,
    undesired: vk::MemoryPropertyFlags,
    fallback: Option<vk::MemoryPropertyFlags>,
}

fn location_flags(location: MemoryLocation) -> LocationFlags {
    use vk::MemoryPropertyFlags as F;

    match location {
        MemoryLocation::Device => LocationFlags {
            required: F::DEVICE_LOCAL,
            undesired: F::HOST_VISIBLE,
            fallback: None,
        },
        MemoryLocation::DeviceUpload => LocationFlags {
            required: F::DEVICE_LOCAL | F::HOST_VISIBLE | F::HOST_COHERENT,
            undesired: F::empty(),
            fallback: Some(F::HOST_VISIBLE | F::HOST_COHERENT),
        },
        MemoryLocation::HostUpload => LocationFlags {
            required: F::HOST_VISIBLE | F::HOST_COHERENT,
            undesired: F::DEVICE_LOCAL | F::HOST_CACHED,
            fallback: None,
        },
        MemoryLocation::HostReadback => LocationFlags {
            required: F::HOST_VISIBLE | F::HOST_CACHED,
            undesired: F::DEVICE_LOCAL,
            fallback: Some(F::HOST_VISIBLE),
        },
    }
}

/// Find a memory type for `location` among the types allowed by `type_mask`.
///
/// Phase 1 wants every required flag and no undesired one, phase 2 only the
/// required flags, phase 3 the fallback flags. Protected types never match.
pub fn find_memory_type_index(
    memory_types: &[vk::MemoryPropertyFlags],
    type_mask: u32,
    location: MemoryLocation,
) -> Option<u32> {
    let flags = location_flags(location);
    let candidates = || {
        memory_types
            .iter()
            .enumerate()
            .take(32)
            .filter(move |(i, props)| {
                type_mask & (1u32 << *i) != 0
                    && !props.contains(vk::MemoryPropertyFlags::PROTECTED)
            })
    };

    let phase1 = candidates()
        .find(|(_, props)| props.contains(flags.required) && !props.intersects(flags.undesired));
    let phase2 = || candidates().find(|(_, props)| props.contains(flags.required));
    let phase3 = || {
        flags
            .fallback
            .and_then(|fallback| candidates().find(|(_, props)| props.contains(fallback)))
    };

    phase1
        .or_else(phase2)
        .or_else(phase3)
        .map(|(i, _)| i as u32)
}

/// Persistent mapping of host-visible memory.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MappedPtr(NonNull<u8>);

// SAFETY: the pointer is a persistent mapping owned by the memory object;
// synchronising access to the pointee is the caller's contract.
unsafe impl Send for MappedPtr {}
unsafe impl Sync for MappedPtr {}

impl MappedPtr {
    pub(crate) fn new(ptr: *mut std::ffi::c_void) -> Option<Self> {
        NonNull::new(ptr.cast::<u8>()).map(Self)
    }

    /// # Safety
    ///
    /// `offset` must stay within the mapping.
    pub(crate) unsafe fn add(self, offset: u64) -> NonNull<u8> {
        NonNull::new_unchecked(self.0.as_ptr().add(offset as usize))
    }

    /// # Safety
    ///
    /// Same as [`MappedPtr::add`].
    pub(crate) unsafe fn offset(self, offset: u64) -> Self {
        Self(self.add(offset))
    }
}

/// Raw device memory from `allocate_memory`.
#[derive(Debug)]
pub struct MemoryVk {
    pub(crate) handle: vk::DeviceMemory,
    pub(crate) size: u64,
    pub(crate) memory_type: MemoryType,
    pub(crate) mapped: Option<MappedPtr>,
    pub(crate) coherent: bool,
}

impl MemoryVk {
    pub fn handle(&self) -> vk::DeviceMemory {
        self.handle
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether a resource allowing `memory_type_bits` may be bound here.
    pub(crate) fn accepts(&self, memory_type_bits: u32) -> bool {
        self.memory_type
            .unpack()
            .and_then(|info| 1u32.checked_shl(u32::from(info.index)))
            .is_some_and(|bit| memory_type_bits & bit != 0)
    }
}

impl DeviceVk {
    pub(crate) fn memory_desc(
        &self,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        must_be_dedicated: bool,
    ) -> Result<MemoryDesc> {
        let index = find_memory_type_index(
            &self.shared.memory_type_flags,
            requirements.memory_type_bits,
            location,
        )
        .ok_or_else(|| {
            Error::unsupported(format!(
                "no memory type for {location:?} in mask {:#x}",
                requirements.memory_type_bits
            ))
        })?;

        let memory_type = MemoryType::pack(MemoryTypeInfo {
            index: index as u16,
            location,
            must_be_dedicated,
        });
        Ok(MemoryDesc {
            size: requirements.size,
            alignment: requirements.alignment,
            memory_type,
            must_be_dedicated,
        })
    }

    pub(crate) fn allocate_memory_impl(&self, desc: &AllocateMemoryDesc) -> Result<MemoryVk> {
        let info = desc
            .memory_type
            .unpack()
            .ok_or_else(|| Error::invalid("memory type was not produced by this device"))?;
        let props = *self
            .shared
            .memory_type_flags
            .get(usize::from(info.index))
            .ok_or_else(|| Error::invalid("memory type index out of range"))?;
        if desc.size == 0 {
            return Err(Error::invalid("memory size must be non-zero"));
        }

        let mut flags_info =
            vk::MemoryAllocateFlagsInfo::default().flags(vk::MemoryAllocateFlags::DEVICE_ADDRESS);
        let mut priority_info = vk::MemoryPriorityAllocateInfoEXT::default()
            .priority((desc.priority.clamp(-1.0, 1.0) + 1.0) * 0.5);
        let mut alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(desc.size)
            .memory_type_index(u32::from(info.index))
            .push_next(&mut flags_info);
        if self.shared.extensions.memory_priority {
            alloc_info = alloc_info.push_next(&mut priority_info);
        }

        let handle = unsafe { self.shared.device.allocate_memory(&alloc_info, None) }
            .or_nri("vkAllocateMemory")?;

        let mapped = if props.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
            let ptr = unsafe {
                self.shared
                    .device
                    .map_memory(handle, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
            };
            match ptr.or_nri("vkMapMemory") {
                Ok(ptr) => MappedPtr::new(ptr),
                Err(e) => {
                    unsafe { self.shared.device.free_memory(handle, None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        debug!(
            "Allocated {} bytes of {:?} memory (type {})",
            desc.size, info.location, info.index
        );
        Ok(MemoryVk {
            handle,
            size: desc.size,
            memory_type: desc.memory_type,
            mapped,
            coherent: props.contains(vk::MemoryPropertyFlags::HOST_COHERENT),
        })
    }

    pub(crate) unsafe fn free_memory_impl(&self, memory: MemoryVk) {
        if memory.mapped.is_some() {
            self.shared.device.unmap_memory(memory.handle);
        }
        self.shared.device.free_memory(memory.handle, None);
    }
}
