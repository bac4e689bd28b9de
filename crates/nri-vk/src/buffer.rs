//! Buffers and their memory bindings.

use std::ptr::NonNull;
use std::sync::OnceLock;

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use nri_core::{
    BufferDesc, BufferMemoryBindingDesc, Error, MemoryDesc, MemoryLocation, Result, WHOLE_SIZE,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::conversions::buffer_usage_to_vk;
use crate::device::DeviceVk;
use crate::error::VkResultExt;
use crate::memory::MappedPtr;
use crate::Vulkan;

/// Where a buffer's memory lives once bound.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BufferBinding {
    pub memory: vk::DeviceMemory,
    /// Mapping of the buffer's first byte, for host-visible memory.
    pub mapped: Option<MappedPtr>,
    pub coherent: bool,
    pub device_address: u64,
}

#[derive(Debug)]
pub struct BufferVk {
    pub(crate) handle: vk::Buffer,
    pub(crate) desc: BufferDesc,
    pub(crate) binding: OnceLock<BufferBinding>,
    /// Set when the buffer came from the resource allocator.
    pub(crate) allocation: Mutex<Option<Allocation>>,
}

impl BufferVk {
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    pub fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    /// Resolve a `(offset, size)` pair where `size` may be `WHOLE_SIZE`.
    pub(crate) fn resolve_range(&self, offset: u64, size: u64) -> Result<u64> {
        let size = if size == WHOLE_SIZE {
            self.desc.size.saturating_sub(offset)
        } else {
            size
        };
        match offset.checked_add(size) {
            Some(end) if end <= self.desc.size => Ok(size),
            _ => Err(Error::invalid(format!(
                "range {offset}+{size} exceeds buffer size {}",
                self.desc.size
            ))),
        }
    }

    pub(crate) fn device_address(&self) -> u64 {
        self.binding.get().map_or(0, |b| b.device_address)
    }
}

impl DeviceVk {
    pub(crate) fn create_buffer_impl(&self, desc: &BufferDesc) -> Result<BufferVk> {
        desc.validate()?;
        let info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(buffer_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let handle =
            unsafe { self.shared.device.create_buffer(&info, None) }.or_nri("vkCreateBuffer")?;
        debug!("Created buffer {:?} ({} bytes, {:?})", handle, desc.size, desc.usage);
        Ok(BufferVk {
            handle,
            desc: *desc,
            binding: OnceLock::new(),
            allocation: Mutex::new(None),
        })
    }

    pub(crate) fn buffer_requirements(&self, buffer: vk::Buffer) -> (vk::MemoryRequirements, bool) {
        let info = vk::BufferMemoryRequirementsInfo2::default().buffer(buffer);
        let mut dedicated = vk::MemoryDedicatedRequirements::default();
        let mut requirements = vk::MemoryRequirements2::default().push_next(&mut dedicated);
        unsafe {
            self.shared
                .device
                .get_buffer_memory_requirements2(&info, &mut requirements)
        };
        let memory_requirements = requirements.memory_requirements;
        (memory_requirements, dedicated.requires_dedicated_allocation == vk::TRUE)
    }

    pub(crate) fn buffer_memory_desc(
        &self,
        buffer: &BufferVk,
        location: MemoryLocation,
    ) -> Result<MemoryDesc> {
        let (requirements, dedicated) = self.buffer_requirements(buffer.handle);
        self.memory_desc(requirements, location, dedicated)
    }

    /// Record where `buffer` lives after the native bind succeeded.
    pub(crate) fn finish_buffer_binding(
        &self,
        buffer: &BufferVk,
        memory: vk::DeviceMemory,
        mapped: Option<MappedPtr>,
        coherent: bool,
    ) -> Result<()> {
        let info = vk::BufferDeviceAddressInfo::default().buffer(buffer.handle);
        let device_address = unsafe { self.shared.device.get_buffer_device_address(&info) };
        buffer
            .binding
            .set(BufferBinding {
                memory,
                mapped,
                coherent,
                device_address,
            })
            .map_err(|_| Error::invalid("buffer memory is already bound"))
    }

    pub(crate) fn bind_buffer_memory_impl(
        &self,
        bindings: &[BufferMemoryBindingDesc<'_, Vulkan>],
    ) -> Result<()> {
        for (index, binding) in bindings.iter().enumerate() {
            if binding.buffer.binding.get().is_some()
                || bindings[..index]
                    .iter()
                    .any(|b| std::ptr::eq(b.buffer, binding.buffer))
            {
                return Err(Error::invalid("buffer memory is already bound"));
            }
            if binding.offset >= binding.memory.size {
                return Err(Error::invalid("binding offset past the end of the memory"));
            }
            let (requirements, _) = self.buffer_requirements(binding.buffer.handle);
            if !binding.memory.accepts(requirements.memory_type_bits) {
                return Err(Error::invalid("memory type is not allowed for the buffer"));
            }
        }
        for binding in bindings {
            let buffer = binding.buffer;
            unsafe {
                self.shared
                    .device
                    .bind_buffer_memory(buffer.handle, binding.memory.handle, binding.offset)
            }
            .or_nri("vkBindBufferMemory")?;

            let mapped = binding
                .memory
                .mapped
                .map(|ptr| unsafe { ptr.offset(binding.offset) });
            self.finish_buffer_binding(
                buffer,
                binding.memory.handle,
                mapped,
                binding.memory.coherent,
            )?;
        }
        Ok(())
    }

    fn whole_memory_range(memory: vk::DeviceMemory) -> vk::MappedMemoryRange<'static> {
        vk::MappedMemoryRange::default()
            .memory(memory)
            .offset(0)
            .size(vk::WHOLE_SIZE)
    }

    pub(crate) unsafe fn map_buffer_impl(
        &self,
        buffer: &BufferVk,
        offset: u64,
        size: u64,
    ) -> Result<NonNull<u8>> {
        let binding = buffer
            .binding
            .get()
            .ok_or_else(|| Error::invalid("buffer has no memory bound"))?;
        let mapped = binding
            .mapped
            .ok_or_else(|| Error::invalid("buffer memory is not host visible"))?;
        buffer.resolve_range(offset, size)?;

        if !binding.coherent {
            let range = Self::whole_memory_range(binding.memory);
            self.shared
                .device
                .invalidate_mapped_memory_ranges(std::slice::from_ref(&range))
                .or_nri("vkInvalidateMappedMemoryRanges")?;
        }
        Ok(mapped.add(offset))
    }

    pub(crate) unsafe fn unmap_buffer_impl(&self, buffer: &BufferVk) {
        let Some(binding) = buffer.binding.get() else {
            return;
        };
        if binding.mapped.is_some() && !binding.coherent {
            let range = Self::whole_memory_range(binding.memory);
            // Failures are already logged by `or_nri`.
            let _ = self
                .shared
                .device
                .flush_mapped_memory_ranges(std::slice::from_ref(&range))
                .or_nri("vkFlushMappedMemoryRanges");
        }
    }

    pub(crate) unsafe fn destroy_buffer_impl(&self, buffer: BufferVk) {
        self.shared.device.destroy_buffer(buffer.handle, None);
        if let Some(allocation) = buffer.allocation.into_inner() {
            self.free_allocation(allocation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nri_core::BufferUsageBits;

    fn buffer(size: u64) -> BufferVk {
        BufferVk {
            handle: vk::Buffer::null(),
            desc: BufferDesc::new(size, BufferUsageBits::SHADER_RESOURCE),
            binding: OnceLock::new(),
            allocation: Mutex::new(None),
        }
    }

    #[test]
    fn ranges_resolve_against_the_buffer() {
        let b = buffer(256);
        assert_eq!(b.resolve_range(0, WHOLE_SIZE), Ok(256));
        assert_eq!(b.resolve_range(64, WHOLE_SIZE), Ok(192));
        assert_eq!(b.resolve_range(64, 64), Ok(64));
        assert!(b.resolve_range(200, 64).is_err());
        assert!(b.resolve_range(u64::MAX, 2).is_err());
    }

    #[test]
    fn unbound_buffers_have_no_address() {
        assert_eq!(buffer(16).device_address(), 0);
    }
}
