//! Create-allocate-bind through gpu-allocator.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation as GpuLocation;
use nri_core::{
    AllocateBufferDesc, AllocateTextureDesc, Error, MemoryLocation, ResourceAllocatorInterface,
    Result,
};
use tracing::{debug, warn};

use crate::buffer::BufferVk;
use crate::device::{DeviceShared, DeviceVk};
use crate::error::VkResultExt;
use crate::memory::MappedPtr;
use crate::texture::TextureVk;
use crate::Vulkan;

pub(crate) fn location_to_gpu_allocator(location: MemoryLocation) -> GpuLocation {
    match location {
        MemoryLocation::Device => GpuLocation::GpuOnly,
        MemoryLocation::DeviceUpload | MemoryLocation::HostUpload => GpuLocation::CpuToGpu,
        MemoryLocation::HostReadback => GpuLocation::GpuToCpu,
    }
}

impl DeviceVk {
    fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
        allocation_scheme: AllocationScheme,
    ) -> Result<Allocation> {
        let mut allocator = self.shared.allocator.lock();
        let allocator = allocator
            .as_mut()
            .ok_or_else(|| Error::failure("allocator already shut down"))?;
        allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location: location_to_gpu_allocator(location),
                linear,
                allocation_scheme,
            })
            .map_err(DeviceShared::allocator_error)
    }

    /// Return an allocation made by the resource allocator.
    pub(crate) fn free_allocation(&self, allocation: Allocation) {
        let mut allocator = self.shared.allocator.lock();
        let Some(allocator) = allocator.as_mut() else {
            return;
        };
        if let Err(e) = allocator.free(allocation) {
            warn!("Failed to free allocation: {e}");
        }
    }
}

impl ResourceAllocatorInterface<Vulkan> for DeviceVk {
    fn allocate_buffer(&self, desc: &AllocateBufferDesc) -> Result<BufferVk> {
        let buffer = self.create_buffer_impl(&desc.desc)?;
        let (requirements, must_be_dedicated) = self.buffer_requirements(buffer.handle);
        let scheme = if desc.dedicated || must_be_dedicated {
            AllocationScheme::DedicatedBuffer(buffer.handle)
        } else {
            AllocationScheme::GpuAllocatorManaged
        };

        let allocation = match self.allocate("nri buffer", requirements, desc.memory_location, true, scheme) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.destroy_buffer_impl(buffer) };
                return Err(e);
            }
        };
        let memory = unsafe { allocation.memory() };
        let offset = allocation.offset();
        let mapped = allocation.mapped_ptr().and_then(|p| MappedPtr::new(p.as_ptr()));
        let coherent = allocation
            .memory_properties()
            .contains(vk::MemoryPropertyFlags::HOST_COHERENT);

        let bound = unsafe { self.shared.device.bind_buffer_memory(buffer.handle, memory, offset) }
            .or_nri("vkBindBufferMemory")
            .and_then(|()| self.finish_buffer_binding(&buffer, memory, mapped, coherent));
        *buffer.allocation.lock() = Some(allocation);
        if let Err(e) = bound {
            unsafe { self.destroy_buffer_impl(buffer) };
            return Err(e);
        }
        debug!(
            "Allocated buffer {:?} ({} bytes, {:?})",
            buffer.handle, desc.desc.size, desc.memory_location
        );
        Ok(buffer)
    }

    fn allocate_texture(&self, desc: &AllocateTextureDesc) -> Result<TextureVk> {
        let texture = self.create_texture_impl(&desc.desc)?;
        let (requirements, must_be_dedicated) = self.image_requirements(texture.handle);
        let scheme = if desc.dedicated || must_be_dedicated {
            AllocationScheme::DedicatedImage(texture.handle)
        } else {
            AllocationScheme::GpuAllocatorManaged
        };

        let allocation = match self.allocate("nri texture", requirements, desc.memory_location, false, scheme) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.destroy_texture_impl(texture) };
                return Err(e);
            }
        };
        let memory = unsafe { allocation.memory() };
        let bound = unsafe {
            self.shared
                .device
                .bind_image_memory(texture.handle, memory, allocation.offset())
        }
        .or_nri("vkBindImageMemory")
        .and_then(|()| {
            texture
                .memory
                .set(memory)
                .map_err(|_| Error::invalid("texture memory is already bound"))
        });
        *texture.allocation.lock() = Some(allocation);
        if let Err(e) = bound {
            unsafe { self.destroy_texture_impl(texture) };
            return Err(e);
        }
        debug!(
            "Allocated texture {:?} ({}x{} {}, {:?})",
            texture.handle,
            desc.desc.width,
            desc.desc.height,
            desc.desc.format.name(),
            desc.memory_location
        );
        Ok(texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_map_onto_allocator_locations() {
        assert_eq!(location_to_gpu_allocator(MemoryLocation::Device), GpuLocation::GpuOnly);
        assert_eq!(
            location_to_gpu_allocator(MemoryLocation::DeviceUpload),
            GpuLocation::CpuToGpu
        );
        assert_eq!(
            location_to_gpu_allocator(MemoryLocation::HostUpload),
            GpuLocation::CpuToGpu
        );
        assert_eq!(
            location_to_gpu_allocator(MemoryLocation::HostReadback),
            GpuLocation::GpuToCpu
        );
    }
}
