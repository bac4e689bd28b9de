//! Textures (`VkImage`) and their memory bindings.

use std::sync::OnceLock;

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use nri_core::{
    Error, MemoryDesc, MemoryLocation, Result, TextureDesc, TextureMemoryBindingDesc, TextureType,
    TextureUsageBits,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::conversions::{
    format_to_vk, sample_count_to_vk, texture_type_to_vk, texture_usage_to_vk,
};
use crate::device::DeviceVk;
use crate::error::VkResultExt;
use crate::Vulkan;

#[derive(Debug)]
pub struct TextureVk {
    pub(crate) handle: vk::Image,
    pub(crate) desc: TextureDesc,
    /// Swap chain images belong to the swap chain.
    pub(crate) owned: bool,
    pub(crate) memory: OnceLock<vk::DeviceMemory>,
    pub(crate) allocation: Mutex<Option<Allocation>>,
}

impl TextureVk {
    pub(crate) fn swap_chain_image(handle: vk::Image, desc: TextureDesc) -> Self {
        Self {
            handle,
            desc,
            owned: false,
            memory: OnceLock::from(vk::DeviceMemory::null()),
            allocation: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

}

/// Creation flags implied by a description.
///
/// Views may reinterpret the format. Square 2D textures with six or more
/// layers can be viewed as cubes, and 3D colour attachments as 2D arrays.
pub(crate) fn image_create_flags(desc: &TextureDesc) -> vk::ImageCreateFlags {
    let mut flags = vk::ImageCreateFlags::MUTABLE_FORMAT | vk::ImageCreateFlags::EXTENDED_USAGE;
    match desc.texture_type {
        TextureType::Texture2D if desc.layer_num >= 6 && desc.width == desc.height => {
            flags |= vk::ImageCreateFlags::CUBE_COMPATIBLE;
        }
        TextureType::Texture3D if desc.usage.contains(TextureUsageBits::COLOR_ATTACHMENT) => {
            flags |= vk::ImageCreateFlags::TYPE_2D_ARRAY_COMPATIBLE;
        }
        _ => {}
    }
    flags
}

impl DeviceVk {
    pub(crate) fn create_texture_impl(&self, desc: &TextureDesc) -> Result<TextureVk> {
        desc.validate()?;
        let info = vk::ImageCreateInfo::default()
            .flags(image_create_flags(desc))
            .image_type(texture_type_to_vk(desc.texture_type))
            .format(format_to_vk(desc.format))
            .extent(vk::Extent3D {
                width: desc.width,
                height: desc.height.max(1),
                depth: desc.depth.max(1),
            })
            .mip_levels(desc.mip_num)
            .array_layers(desc.layer_num)
            .samples(sample_count_to_vk(desc.sample_num))
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(texture_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let handle =
            unsafe { self.shared.device.create_image(&info, None) }.or_nri("vkCreateImage")?;
        debug!(
            "Created texture {:?} ({}x{}x{} {})",
            handle,
            desc.width,
            desc.height,
            desc.depth,
            desc.format.name()
        );
        Ok(TextureVk {
            handle,
            desc: *desc,
            owned: true,
            memory: OnceLock::new(),
            allocation: Mutex::new(None),
        })
    }

    pub(crate) fn image_requirements(&self, image: vk::Image) -> (vk::MemoryRequirements, bool) {
        let info = vk::ImageMemoryRequirementsInfo2::default().image(image);
        let mut dedicated = vk::MemoryDedicatedRequirements::default();
        let mut requirements = vk::MemoryRequirements2::default().push_next(&mut dedicated);
        unsafe {
            self.shared
                .device
                .get_image_memory_requirements2(&info, &mut requirements)
        };
        let memory_requirements = requirements.memory_requirements;
        (memory_requirements, dedicated.requires_dedicated_allocation == vk::TRUE)
    }

    pub(crate) fn texture_memory_desc(
        &self,
        texture: &TextureVk,
        location: MemoryLocation,
    ) -> Result<MemoryDesc> {
        if !texture.owned {
            return Err(Error::invalid("swap chain textures have no memory requirements"));
        }
        let (requirements, dedicated) = self.image_requirements(texture.handle);
        self.memory_desc(requirements, location, dedicated)
    }

    pub(crate) fn bind_texture_memory_impl(
        &self,
        bindings: &[TextureMemoryBindingDesc<'_, Vulkan>],
    ) -> Result<()> {
        for (index, binding) in bindings.iter().enumerate() {
            if binding.texture.memory.get().is_some()
                || bindings[..index]
                    .iter()
                    .any(|b| std::ptr::eq(b.texture, binding.texture))
            {
                return Err(Error::invalid("texture memory is already bound"));
            }
            if binding.offset >= binding.memory.size {
                return Err(Error::invalid("binding offset past the end of the memory"));
            }
            let (requirements, _) = self.image_requirements(binding.texture.handle);
            if !binding.memory.accepts(requirements.memory_type_bits) {
                return Err(Error::invalid("memory type is not allowed for the texture"));
            }
        }
        for binding in bindings {
            let texture = binding.texture;
            unsafe {
                self.shared
                    .device
                    .bind_image_memory(texture.handle, binding.memory.handle, binding.offset)
            }
            .or_nri("vkBindImageMemory")?;
            texture
                .memory
                .set(binding.memory.handle)
                .map_err(|_| Error::invalid("texture memory is already bound"))?;
        }
        Ok(())
    }

    pub(crate) unsafe fn destroy_texture_impl(&self, texture: TextureVk) {
        if !texture.owned {
            return;
        }
        self.shared.device.destroy_image(texture.handle, None);
        if let Some(allocation) = texture.allocation.into_inner() {
            self.free_allocation(allocation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nri_core::Format;

    #[test]
    fn every_texture_allows_reinterpretation() {
        let desc = TextureDesc::texture_1d(Format::Rgba8Unorm, 64, 1, 1);
        assert_eq!(
            image_create_flags(&desc),
            vk::ImageCreateFlags::MUTABLE_FORMAT | vk::ImageCreateFlags::EXTENDED_USAGE
        );
    }

    #[test]
    fn square_layered_textures_are_cube_compatible() {
        let cube = TextureDesc::texture_2d(Format::Rgba16Sfloat, 128, 128, 1, 6);
        assert!(image_create_flags(&cube).contains(vk::ImageCreateFlags::CUBE_COMPATIBLE));

        let wide = TextureDesc::texture_2d(Format::Rgba16Sfloat, 256, 128, 1, 6);
        assert!(!image_create_flags(&wide).contains(vk::ImageCreateFlags::CUBE_COMPATIBLE));

        let few_layers = TextureDesc::texture_2d(Format::Rgba16Sfloat, 128, 128, 1, 4);
        assert!(!image_create_flags(&few_layers).contains(vk::ImageCreateFlags::CUBE_COMPATIBLE));
    }

    #[test]
    fn volume_render_targets_are_array_compatible() {
        let volume = TextureDesc::texture_3d(Format::R16Sfloat, 32, 32, 32, 1)
            .with_usage(TextureUsageBits::COLOR_ATTACHMENT);
        assert!(image_create_flags(&volume)
            .contains(vk::ImageCreateFlags::TYPE_2D_ARRAY_COMPATIBLE));

        let sampled = TextureDesc::texture_3d(Format::R16Sfloat, 32, 32, 32, 1)
            .with_usage(TextureUsageBits::SHADER_RESOURCE);
        assert!(!image_create_flags(&sampled)
            .contains(vk::ImageCreateFlags::TYPE_2D_ARRAY_COMPATIBLE));
    }

    #[test]
    fn swap_chain_images_count_as_bound() {
        let desc = TextureDesc::texture_2d(Format::Bgra8Unorm, 800, 600, 1, 1);
        let texture = TextureVk::swap_chain_image(vk::Image::null(), desc);
        assert!(!texture.owned);
        assert!(texture.memory.get().is_some());
        assert_eq!(texture.desc().width, 800);
    }
}
