//! Window surfaces and swap chains.

use std::fmt;
use std::sync::Arc;

use ash::vk;
use nri_core::{
    Error, Result, SwapChainDesc, SwapChainFormat, SwapChainInterface, TextureDesc,
    TextureUsageBits,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::conversions::format_from_vk;
use crate::device::DeviceVk;
use crate::error::VkResultExt;
use crate::texture::TextureVk;
use crate::Vulkan;

/// Surface formats acceptable for `format`, in order of preference.
pub(crate) fn preferred_surface_formats(format: SwapChainFormat) -> &'static [vk::SurfaceFormatKHR] {
    const fn sf(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }
    const G10_16: [vk::SurfaceFormatKHR; 1] = [sf(
        vk::Format::R16G16B16A16_SFLOAT,
        vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
    )];
    const G22_8: [vk::SurfaceFormatKHR; 2] = [
        sf(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        sf(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
    ];
    const G22_10: [vk::SurfaceFormatKHR; 1] = [sf(
        vk::Format::A2B10G10R10_UNORM_PACK32,
        vk::ColorSpaceKHR::SRGB_NONLINEAR,
    )];
    const G2084_10: [vk::SurfaceFormatKHR; 1] = [sf(
        vk::Format::A2B10G10R10_UNORM_PACK32,
        vk::ColorSpaceKHR::HDR10_ST2084_EXT,
    )];
    match format {
        SwapChainFormat::Bt709G10_16bit => &G10_16,
        SwapChainFormat::Bt709G22_8bit => &G22_8,
        SwapChainFormat::Bt709G22_10bit => &G22_10,
        SwapChainFormat::Bt2020G2084_10bit => &G2084_10,
    }
}

/// Pick the surface format for `format`; falls back to the first one offered.
pub(crate) fn select_surface_format(
    available: &[vk::SurfaceFormatKHR],
    format: SwapChainFormat,
) -> Option<vk::SurfaceFormatKHR> {
    let preferred = preferred_surface_formats(format);
    let found = preferred.iter().find(|p| {
        available
            .iter()
            .any(|a| a.format == p.format && a.color_space == p.color_space)
    });
    match found {
        Some(format) => Some(*format),
        None => {
            let first = available.first().copied()?;
            warn!(
                "Surface format for {:?} unavailable, using {:?}/{:?}",
                format, first.format, first.color_space
            );
            Some(first)
        }
    }
}

/// Without vsync prefer mailbox, then immediate. FIFO is always available.
pub(crate) fn select_present_mode(
    available: &[vk::PresentModeKHR],
    vertical_sync_interval: u8,
) -> vk::PresentModeKHR {
    if vertical_sync_interval == 0 {
        for mode in [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE] {
            if available.contains(&mode) {
                return mode;
            }
        }
    }
    vk::PresentModeKHR::FIFO
}

pub(crate) fn select_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// Requested image count inside the surface limits; `max_image_count == 0`
/// means unbounded.
pub(crate) fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR, requested: u8) -> u32 {
    let count = u32::from(requested).max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

pub struct SwapChainVk {
    surface: vk::SurfaceKHR,
    handle: vk::SwapchainKHR,
    textures: Vec<TextureVk>,
    /// Ring of acquire semaphores, one per image.
    acquire: Vec<vk::Semaphore>,
    /// Signalled by the submission rendering into image `i`.
    release: Vec<vk::Semaphore>,
    frame: usize,
    /// Acquired image and the acquire semaphore it waits on.
    current: Option<(u32, usize)>,
    queue: vk::Queue,
    queue_lock: Arc<Mutex<()>>,
}

impl fmt::Debug for SwapChainVk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapChainVk")
            .field("handle", &self.handle)
            .field("textures", &self.textures.len())
            .field("current", &self.current)
            .finish()
    }
}

impl SwapChainVk {
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    /// Semaphores a submission that renders into the acquired image waits on
    /// and signals.
    pub(crate) fn submit_semaphores(&self) -> Result<(vk::Semaphore, vk::Semaphore)> {
        let (image, slot) = self
            .current
            .ok_or_else(|| Error::invalid("no swap chain texture acquired"))?;
        Ok((self.acquire[slot], self.release[image as usize]))
    }
}

impl DeviceVk {
    fn create_semaphores(&self, num: usize) -> Result<Vec<vk::Semaphore>> {
        let info = vk::SemaphoreCreateInfo::default();
        (0..num)
            .map(|_| unsafe { self.shared.device.create_semaphore(&info, None) }.or_nri("vkCreateSemaphore"))
            .collect()
    }

    unsafe fn destroy_swap_chain_parts(&self, swap_chain: &SwapChainVk) {
        let device = &self.shared.device;
        for &semaphore in swap_chain.acquire.iter().chain(&swap_chain.release) {
            device.destroy_semaphore(semaphore, None);
        }
        if let Some(loader) = &self.shared.extensions.swap_chain {
            if swap_chain.handle != vk::SwapchainKHR::null() {
                loader.destroy_swapchain(swap_chain.handle, None);
            }
        }
        if let Some(surface) = &self.shared.extensions.surface {
            surface.destroy_surface(swap_chain.surface, None);
        }
    }
}

impl SwapChainInterface<Vulkan> for DeviceVk {
    fn create_swap_chain(&self, desc: &SwapChainDesc<'_, Vulkan>) -> Result<SwapChainVk> {
        let (Some(surface_loader), Some(swap_chain_loader)) = (
            &self.shared.extensions.surface,
            &self.shared.extensions.swap_chain,
        ) else {
            return Err(Error::unsupported("swap chains are not available on this device"));
        };
        let instance = &self.shared.instance;
        let surface = unsafe {
            ash_window::create_surface(
                &instance.entry,
                &instance.raw,
                desc.window.display,
                desc.window.window,
                None,
            )
        }
        .or_nri("vkCreateSurfaceKHR")?;

        let mut swap_chain = SwapChainVk {
            surface,
            handle: vk::SwapchainKHR::null(),
            textures: Vec::new(),
            acquire: Vec::new(),
            release: Vec::new(),
            frame: 0,
            current: None,
            queue: desc.queue.handle,
            queue_lock: Arc::clone(&desc.queue.lock),
        };
        match self.init_swap_chain(&mut swap_chain, desc, surface_loader, swap_chain_loader) {
            Ok(()) => Ok(swap_chain),
            Err(e) => {
                unsafe { self.destroy_swap_chain_parts(&swap_chain) };
                Err(e)
            }
        }
    }

    unsafe fn destroy_swap_chain(&self, swap_chain: SwapChainVk) {
        self.destroy_swap_chain_parts(&swap_chain);
        debug!("Destroyed swap chain {:?}", swap_chain.handle);
    }

    fn get_swap_chain_textures<'a>(&self, swap_chain: &'a SwapChainVk) -> &'a [TextureVk] {
        &swap_chain.textures
    }

    fn acquire_next_swap_chain_texture(&self, swap_chain: &mut SwapChainVk) -> Result<u32> {
        let loader = self
            .shared
            .extensions
            .swap_chain
            .as_ref()
            .ok_or_else(|| Error::unsupported("swap chains are not available on this device"))?;
        let slot = swap_chain.frame % swap_chain.acquire.len().max(1);
        let semaphore = swap_chain.acquire[slot];
        let result = unsafe {
            loader.acquire_next_image(swap_chain.handle, u64::MAX, semaphore, vk::Fence::null())
        };
        let index = match result {
            Ok((index, suboptimal)) => {
                if suboptimal {
                    debug!("Swap chain {:?} is suboptimal", swap_chain.handle);
                }
                index
            }
            // No image was acquired; the caller recreates the swap chain.
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => return Err(Error::OutOfDate),
            Err(e) => return Err(e).or_nri("vkAcquireNextImageKHR"),
        };
        swap_chain.frame = swap_chain.frame.wrapping_add(1);
        swap_chain.current = Some((index, slot));
        Ok(index)
    }

    fn queue_present(&self, swap_chain: &mut SwapChainVk) -> Result<()> {
        let loader = self
            .shared
            .extensions
            .swap_chain
            .as_ref()
            .ok_or_else(|| Error::unsupported("swap chains are not available on this device"))?;
        let (_, release) = swap_chain.submit_semaphores()?;
        let Some((index, _)) = swap_chain.current.take() else {
            return Err(Error::invalid("no swap chain texture acquired"));
        };
        let wait = [release];
        let swap_chains = [swap_chain.handle];
        let indices = [index];
        let info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait)
            .swapchains(&swap_chains)
            .image_indices(&indices);
        let result = {
            let _guard = swap_chain.queue_lock.lock();
            unsafe { loader.queue_present(swap_chain.queue, &info) }
        };
        match result {
            Ok(_) => Ok(()),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::OutOfDate),
            Err(e) => Err(e).or_nri("vkQueuePresentKHR"),
        }
    }
}

impl DeviceVk {
    fn init_swap_chain(
        &self,
        swap_chain: &mut SwapChainVk,
        desc: &SwapChainDesc<'_, Vulkan>,
        surface_loader: &ash::khr::surface::Instance,
        loader: &ash::khr::swapchain::Device,
    ) -> Result<()> {
        let physical_device = self.shared.physical_device;
        let surface = swap_chain.surface;
        let family = desc.queue.family_index;
        let supported = unsafe {
            surface_loader.get_physical_device_surface_support(physical_device, family, surface)
        }
        .or_nri("vkGetPhysicalDeviceSurfaceSupportKHR")?;
        if !supported {
            return Err(Error::invalid(format!(
                "queue family {family} cannot present to this window"
            )));
        }

        let (capabilities, formats, present_modes) = unsafe {
            (
                surface_loader
                    .get_physical_device_surface_capabilities(physical_device, surface)
                    .or_nri("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?,
                surface_loader
                    .get_physical_device_surface_formats(physical_device, surface)
                    .or_nri("vkGetPhysicalDeviceSurfaceFormatsKHR")?,
                surface_loader
                    .get_physical_device_surface_present_modes(physical_device, surface)
                    .or_nri("vkGetPhysicalDeviceSurfacePresentModesKHR")?,
            )
        };
        let surface_format = select_surface_format(&formats, desc.format)
            .ok_or_else(|| Error::unsupported("surface reports no formats"))?;
        let present_mode = select_present_mode(&present_modes, desc.vertical_sync_interval);
        let extent = select_extent(&capabilities, desc.width, desc.height);
        let image_count = select_image_count(&capabilities, desc.texture_num);

        let usage = vk::ImageUsageFlags::COLOR_ATTACHMENT
            | vk::ImageUsageFlags::TRANSFER_DST
            | (capabilities.supported_usage_flags
                & (vk::ImageUsageFlags::STORAGE | vk::ImageUsageFlags::SAMPLED));
        let queue_families = [family];
        let info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(usage)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(&queue_families)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);
        swap_chain.handle =
            unsafe { loader.create_swapchain(&info, None) }.or_nri("vkCreateSwapchainKHR")?;

        let images = unsafe { loader.get_swapchain_images(swap_chain.handle) }
            .or_nri("vkGetSwapchainImagesKHR")?;
        let mut usage_bits = TextureUsageBits::COLOR_ATTACHMENT;
        if usage.contains(vk::ImageUsageFlags::STORAGE) {
            usage_bits |= TextureUsageBits::SHADER_RESOURCE_STORAGE;
        }
        if usage.contains(vk::ImageUsageFlags::SAMPLED) {
            usage_bits |= TextureUsageBits::SHADER_RESOURCE;
        }
        let texture_desc =
            TextureDesc::texture_2d(format_from_vk(surface_format.format), extent.width, extent.height, 1, 1)
                .with_usage(usage_bits);
        swap_chain.textures = images
            .iter()
            .map(|&image| TextureVk::swap_chain_image(image, texture_desc))
            .collect();
        swap_chain.acquire = self.create_semaphores(images.len())?;
        swap_chain.release = self.create_semaphores(images.len())?;

        info!(
            "Created swap chain {}x{} ({} images, {:?}, {:?}/{:?})",
            extent.width,
            extent.height,
            images.len(),
            present_mode,
            surface_format.format,
            surface_format.color_space
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    #[test]
    fn sdr_prefers_bgra() {
        let available = [
            surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            surface_format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = select_surface_format(&available, SwapChainFormat::Bt709G22_8bit);
        assert_eq!(chosen.map(|f| f.format), Some(vk::Format::B8G8R8A8_UNORM));

        let chosen = select_surface_format(&available[..1], SwapChainFormat::Bt709G22_8bit);
        assert_eq!(chosen.map(|f| f.format), Some(vk::Format::R8G8B8A8_UNORM));
    }

    #[test]
    fn hdr10_needs_the_pq_color_space() {
        let sdr_10bit = surface_format(
            vk::Format::A2B10G10R10_UNORM_PACK32,
            vk::ColorSpaceKHR::SRGB_NONLINEAR,
        );
        let hdr10 = surface_format(
            vk::Format::A2B10G10R10_UNORM_PACK32,
            vk::ColorSpaceKHR::HDR10_ST2084_EXT,
        );
        let chosen = select_surface_format(&[sdr_10bit, hdr10], SwapChainFormat::Bt2020G2084_10bit);
        assert_eq!(chosen, Some(hdr10));
    }

    #[test]
    fn unavailable_formats_fall_back_to_the_first() {
        let only = surface_format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR);
        assert_eq!(
            select_surface_format(&[only], SwapChainFormat::Bt709G10_16bit),
            Some(only)
        );
        assert_eq!(select_surface_format(&[], SwapChainFormat::Bt709G10_16bit), None);
    }

    #[test]
    fn present_modes() {
        use vk::PresentModeKHR as M;
        assert_eq!(select_present_mode(&[M::FIFO, M::IMMEDIATE, M::MAILBOX], 0), M::MAILBOX);
        assert_eq!(select_present_mode(&[M::FIFO, M::IMMEDIATE], 0), M::IMMEDIATE);
        assert_eq!(select_present_mode(&[M::FIFO], 0), M::FIFO);
        assert_eq!(select_present_mode(&[M::FIFO, M::MAILBOX], 1), M::FIFO);
    }

    #[test]
    fn extent_and_image_count_respect_the_surface() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D {
                width: 1920,
                height: 1080,
            },
            ..Default::default()
        };
        let extent = select_extent(&capabilities, 4096, 720);
        assert_eq!((extent.width, extent.height), (1920, 720));
        assert_eq!(select_image_count(&capabilities, 1), 2);
        assert_eq!(select_image_count(&capabilities, 8), 3);

        let unbounded = vk::SurfaceCapabilitiesKHR {
            max_image_count: 0,
            ..capabilities
        };
        assert_eq!(select_image_count(&unbounded, 8), 8);
    }
}
