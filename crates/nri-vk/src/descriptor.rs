//! Descriptors: texture and buffer views, samplers and acceleration structures.

use ash::vk;
use nri_core::{
    BufferViewDesc, BufferViewType, CompareFunc, Error, Format, Result, SamplerDesc,
    Texture1DViewDesc, Texture1DViewType, Texture2DViewDesc, Texture2DViewType, Texture3DViewDesc,
    Texture3DViewType, TextureDesc,
};
use tracing::debug;

use crate::buffer::BufferVk;
use crate::conversions::{
    address_mode_to_vk, border_color_to_vk, compare_func_to_vk, filter_to_vk, format_aspects,
    format_to_vk, mip_filter_to_vk, reduction_mode_to_vk, view_type_1d_to_vk, view_type_2d_to_vk,
    view_type_3d_to_vk,
};
use crate::device::{DeviceShared, DeviceVk};
use crate::error::VkResultExt;
use crate::texture::TextureVk;
use crate::Vulkan;

/// An image view plus what descriptor writes and rendering need to know about it.
#[derive(Clone, Copy, Debug)]
pub struct TextureViewVk {
    pub(crate) view: vk::ImageView,
    pub(crate) image: vk::Image,
    /// Layout the view is used in.
    pub(crate) layout: vk::ImageLayout,
    pub(crate) range: vk::ImageSubresourceRange,
    pub(crate) extent: vk::Extent2D,
}

#[derive(Clone, Copy, Debug)]
pub struct BufferViewVk {
    pub(crate) buffer: vk::Buffer,
    /// Null for raw, structured and constant views.
    pub(crate) view: vk::BufferView,
    pub(crate) offset: u64,
    pub(crate) size: u64,
}

#[derive(Debug)]
pub enum DescriptorVk {
    Texture(TextureViewVk),
    Buffer(BufferViewVk),
    Sampler(vk::Sampler),
    AccelerationStructure(vk::AccelerationStructureKHR),
}

impl DescriptorVk {
    pub(crate) fn texture_view(&self) -> Result<&TextureViewVk> {
        match self {
            Self::Texture(view) => Ok(view),
            _ => Err(Error::invalid("descriptor is not a texture view")),
        }
    }

    pub(crate) fn buffer_view(&self) -> Result<&BufferViewVk> {
        match self {
            Self::Buffer(view) => Ok(view),
            _ => Err(Error::invalid("descriptor is not a buffer view")),
        }
    }

    pub(crate) fn set_name(&self, shared: &DeviceShared, name: &str) {
        match self {
            Self::Texture(view) => shared.set_object_name(view.view, name),
            Self::Buffer(view) if view.view != vk::BufferView::null() => {
                shared.set_object_name(view.view, name);
            }
            Self::Buffer(_) => {}
            Self::Sampler(sampler) => shared.set_object_name(*sampler, name),
            Self::AccelerationStructure(handle) => shared.set_object_name(*handle, name),
        }
    }
}

/// How a texture view is used, independent of its dimensionality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ViewClass {
    ShaderResource,
    Storage,
    ColorAttachment,
    /// Depth-stencil attachment in the given layout.
    DepthStencil(vk::ImageLayout),
    ShadingRate,
}

impl ViewClass {
    fn depth_stencil(read_only_depth: bool, read_only_stencil: bool) -> Self {
        Self::DepthStencil(match (read_only_depth, read_only_stencil) {
            (false, false) => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            (true, false) => vk::ImageLayout::DEPTH_READ_ONLY_STENCIL_ATTACHMENT_OPTIMAL,
            (false, true) => vk::ImageLayout::DEPTH_ATTACHMENT_STENCIL_READ_ONLY_OPTIMAL,
            (true, true) => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        })
    }

    pub(crate) fn of_1d(view_type: Texture1DViewType) -> Self {
        use Texture1DViewType as T;
        match view_type {
            T::ShaderResource1D | T::ShaderResource1DArray => Self::ShaderResource,
            T::ShaderResourceStorage1D | T::ShaderResourceStorage1DArray => Self::Storage,
            T::ColorAttachment => Self::ColorAttachment,
            T::DepthStencilAttachment => Self::depth_stencil(false, false),
            T::DepthReadonlyStencilAttachment => Self::depth_stencil(true, false),
            T::DepthAttachmentStencilReadonly => Self::depth_stencil(false, true),
            T::DepthStencilReadonly => Self::depth_stencil(true, true),
        }
    }

    pub(crate) fn of_2d(view_type: Texture2DViewType) -> Self {
        use Texture2DViewType as T;
        match view_type {
            T::ShaderResource2D
            | T::ShaderResource2DArray
            | T::ShaderResourceCube
            | T::ShaderResourceCubeArray => Self::ShaderResource,
            T::ShaderResourceStorage2D | T::ShaderResourceStorage2DArray => Self::Storage,
            T::ColorAttachment => Self::ColorAttachment,
            T::DepthStencilAttachment => Self::depth_stencil(false, false),
            T::DepthReadonlyStencilAttachment => Self::depth_stencil(true, false),
            T::DepthAttachmentStencilReadonly => Self::depth_stencil(false, true),
            T::DepthStencilReadonly => Self::depth_stencil(true, true),
            T::ShadingRateAttachment => Self::ShadingRate,
        }
    }

    pub(crate) fn of_3d(view_type: Texture3DViewType) -> Self {
        match view_type {
            Texture3DViewType::ShaderResource3D => Self::ShaderResource,
            Texture3DViewType::ShaderResourceStorage3D => Self::Storage,
            Texture3DViewType::ColorAttachment => Self::ColorAttachment,
        }
    }

    pub(crate) fn usage(self) -> vk::ImageUsageFlags {
        match self {
            Self::ShaderResource => vk::ImageUsageFlags::SAMPLED,
            Self::Storage => vk::ImageUsageFlags::STORAGE,
            Self::ColorAttachment => vk::ImageUsageFlags::COLOR_ATTACHMENT,
            Self::DepthStencil(_) => vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            Self::ShadingRate => vk::ImageUsageFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR,
        }
    }

    pub(crate) fn layout(self) -> vk::ImageLayout {
        match self {
            Self::ShaderResource => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            Self::Storage => vk::ImageLayout::GENERAL,
            Self::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            Self::DepthStencil(layout) => layout,
            Self::ShadingRate => vk::ImageLayout::FRAGMENT_SHADING_RATE_ATTACHMENT_OPTIMAL_KHR,
        }
    }

    /// Aspects a view of `view_format` over a `texture_format` image covers.
    ///
    /// Shaders read one aspect at a time, so sampled depth-stencil views see depth.
    pub(crate) fn aspects(self, texture_format: Format, view_format: Format) -> vk::ImageAspectFlags {
        match self {
            Self::ShaderResource | Self::Storage => {
                let aspects = format_aspects(view_format);
                if aspects.contains(vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL) {
                    vk::ImageAspectFlags::DEPTH
                } else {
                    aspects
                }
            }
            _ => format_aspects(texture_format),
        }
    }
}

/// Resolve a view's mip and layer window against its texture.
pub(crate) fn view_range(
    desc: &TextureDesc,
    aspect_mask: vk::ImageAspectFlags,
    mip_offset: u32,
    mip_num: u32,
    layer_offset: u32,
    layer_num: u32,
    layer_total: u32,
) -> Result<vk::ImageSubresourceRange> {
    let level_count = desc.resolve_mips(mip_offset, mip_num);
    let layer_count = if layer_num == nri_core::REMAINING {
        layer_total.saturating_sub(layer_offset)
    } else {
        layer_num
    };
    let mips_fit = mip_offset
        .checked_add(level_count)
        .is_some_and(|end| end <= desc.mip_num);
    if level_count == 0 || !mips_fit {
        return Err(Error::invalid(format!(
            "mips {mip_offset}+{level_count} exceed the texture's {}",
            desc.mip_num
        )));
    }
    let layers_fit = layer_offset
        .checked_add(layer_count)
        .is_some_and(|end| end <= layer_total);
    if layer_count == 0 || !layers_fit {
        return Err(Error::invalid(format!(
            "layers {layer_offset}+{layer_count} exceed the texture's {layer_total}"
        )));
    }
    Ok(vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: mip_offset,
        level_count,
        base_array_layer: layer_offset,
        layer_count,
    })
}

/// Builds a native sampler description, minus the reduction chain.
pub(crate) fn sampler_info(desc: &SamplerDesc) -> vk::SamplerCreateInfo<'static> {
    let anisotropy = desc.anisotropy > 1;
    vk::SamplerCreateInfo::default()
        .mag_filter(filter_to_vk(desc.filters.mag))
        .min_filter(filter_to_vk(desc.filters.min))
        .mipmap_mode(mip_filter_to_vk(desc.filters.mip))
        .address_mode_u(address_mode_to_vk(desc.address_modes.u))
        .address_mode_v(address_mode_to_vk(desc.address_modes.v))
        .address_mode_w(address_mode_to_vk(desc.address_modes.w))
        .mip_lod_bias(desc.mip_bias)
        .anisotropy_enable(anisotropy)
        .max_anisotropy(if anisotropy { f32::from(desc.anisotropy) } else { 1.0 })
        .compare_enable(desc.compare_func != CompareFunc::None)
        .compare_op(compare_func_to_vk(desc.compare_func))
        .min_lod(desc.mip_min)
        .max_lod(desc.mip_max)
        .border_color(border_color_to_vk(desc.border_color))
}

struct TextureViewRequest<'a> {
    texture: &'a TextureVk,
    view_type: vk::ImageViewType,
    class: ViewClass,
    format: Format,
    mip_offset: u32,
    mip_num: u32,
    layer_offset: u32,
    layer_num: u32,
    layer_total: u32,
}

impl DeviceVk {
    fn create_texture_view(&self, request: TextureViewRequest<'_>) -> Result<DescriptorVk> {
        let texture = request.texture;
        let view_format = if request.format == Format::Unknown {
            texture.desc.format
        } else {
            request.format
        };
        let range = view_range(
            &texture.desc,
            request.class.aspects(texture.desc.format, view_format),
            request.mip_offset,
            request.mip_num,
            request.layer_offset,
            request.layer_num,
            request.layer_total,
        )?;
        let mut usage = vk::ImageViewUsageCreateInfo::default().usage(request.class.usage());
        let info = vk::ImageViewCreateInfo::default()
            .image(texture.handle)
            .view_type(request.view_type)
            .format(format_to_vk(view_format))
            .subresource_range(range)
            .push_next(&mut usage);
        let view = unsafe { self.shared.device.create_image_view(&info, None) }
            .or_nri("vkCreateImageView")?;

        let [width, height, _] = texture.desc.mip_extent(request.mip_offset);
        Ok(DescriptorVk::Texture(TextureViewVk {
            view,
            image: texture.handle,
            layout: request.class.layout(),
            range,
            extent: vk::Extent2D { width, height },
        }))
    }

    pub(crate) fn create_texture_1d_view_impl(
        &self,
        desc: &Texture1DViewDesc<'_, Vulkan>,
    ) -> Result<DescriptorVk> {
        self.create_texture_view(TextureViewRequest {
            texture: desc.texture,
            view_type: view_type_1d_to_vk(desc.view_type),
            class: ViewClass::of_1d(desc.view_type),
            format: desc.format,
            mip_offset: desc.mip_offset,
            mip_num: desc.mip_num,
            layer_offset: desc.layer_offset,
            layer_num: desc.layer_num,
            layer_total: desc.texture.desc.layer_num,
        })
    }

    pub(crate) fn create_texture_2d_view_impl(
        &self,
        desc: &Texture2DViewDesc<'_, Vulkan>,
    ) -> Result<DescriptorVk> {
        self.create_texture_view(TextureViewRequest {
            texture: desc.texture,
            view_type: view_type_2d_to_vk(desc.view_type),
            class: ViewClass::of_2d(desc.view_type),
            format: desc.format,
            mip_offset: desc.mip_offset,
            mip_num: desc.mip_num,
            layer_offset: desc.layer_offset,
            layer_num: desc.layer_num,
            layer_total: desc.texture.desc.layer_num,
        })
    }

    /// Colour attachment views of volumes address depth slices as layers.
    pub(crate) fn create_texture_3d_view_impl(
        &self,
        desc: &Texture3DViewDesc<'_, Vulkan>,
    ) -> Result<DescriptorVk> {
        let (layer_offset, layer_num, layer_total) = match desc.view_type {
            Texture3DViewType::ColorAttachment => (
                desc.slice_offset,
                desc.slice_num,
                desc.texture.desc.mip_extent(desc.mip_offset)[2],
            ),
            _ => (0, 1, 1),
        };
        self.create_texture_view(TextureViewRequest {
            texture: desc.texture,
            view_type: view_type_3d_to_vk(desc.view_type),
            class: ViewClass::of_3d(desc.view_type),
            format: desc.format,
            mip_offset: desc.mip_offset,
            mip_num: desc.mip_num,
            layer_offset,
            layer_num,
            layer_total,
        })
    }

    pub(crate) fn create_buffer_view_impl(
        &self,
        desc: &BufferViewDesc<'_, Vulkan>,
    ) -> Result<DescriptorVk> {
        let buffer: &BufferVk = desc.buffer;
        let size = buffer.resolve_range(desc.offset, desc.size)?;

        let texel = desc.format != Format::Unknown && desc.view_type != BufferViewType::Constant;
        let view = if texel {
            let info = vk::BufferViewCreateInfo::default()
                .buffer(buffer.handle)
                .format(format_to_vk(desc.format))
                .offset(desc.offset)
                .range(size);
            unsafe { self.shared.device.create_buffer_view(&info, None) }
                .or_nri("vkCreateBufferView")?
        } else {
            vk::BufferView::null()
        };

        Ok(DescriptorVk::Buffer(BufferViewVk {
            buffer: buffer.handle,
            view,
            offset: desc.offset,
            size,
        }))
    }

    pub(crate) fn create_sampler_impl(&self, desc: &SamplerDesc) -> Result<DescriptorVk> {
        let mut reduction = vk::SamplerReductionModeCreateInfo::default()
            .reduction_mode(reduction_mode_to_vk(desc.filters.reduction));
        let mut info = sampler_info(desc);
        if desc.filters.reduction != nri_core::ReductionMode::Average {
            self.require(nri_core::Features::TEXTURE_FILTER_MIN_MAX, "min/max filtering")?;
            info = info.push_next(&mut reduction);
        }
        let sampler =
            unsafe { self.shared.device.create_sampler(&info, None) }.or_nri("vkCreateSampler")?;
        debug!("Created sampler {:?}", sampler);
        Ok(DescriptorVk::Sampler(sampler))
    }

    pub(crate) unsafe fn destroy_descriptor_impl(&self, descriptor: DescriptorVk) {
        let device = &self.shared.device;
        match descriptor {
            DescriptorVk::Texture(view) => device.destroy_image_view(view.view, None),
            DescriptorVk::Buffer(view) => {
                if view.view != vk::BufferView::null() {
                    device.destroy_buffer_view(view.view, None);
                }
            }
            DescriptorVk::Sampler(sampler) => device.destroy_sampler(sampler, None),
            // Owned by the acceleration structure.
            DescriptorVk::AccelerationStructure(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nri_core::{AddressMode, AddressModes, Filter, Filters, REMAINING};

    #[test]
    fn view_classes_pick_layouts() {
        let sampled = ViewClass::of_2d(Texture2DViewType::ShaderResourceCube);
        assert_eq!(sampled.layout(), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(sampled.usage(), vk::ImageUsageFlags::SAMPLED);

        let storage = ViewClass::of_1d(Texture1DViewType::ShaderResourceStorage1DArray);
        assert_eq!(storage.layout(), vk::ImageLayout::GENERAL);

        assert_eq!(
            ViewClass::of_2d(Texture2DViewType::DepthReadonlyStencilAttachment).layout(),
            vk::ImageLayout::DEPTH_READ_ONLY_STENCIL_ATTACHMENT_OPTIMAL
        );
        assert_eq!(
            ViewClass::of_1d(Texture1DViewType::DepthAttachmentStencilReadonly).layout(),
            vk::ImageLayout::DEPTH_ATTACHMENT_STENCIL_READ_ONLY_OPTIMAL
        );
        assert_eq!(
            ViewClass::of_2d(Texture2DViewType::DepthStencilReadonly).layout(),
            vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
        );
        assert_eq!(
            ViewClass::of_3d(Texture3DViewType::ColorAttachment).usage(),
            vk::ImageUsageFlags::COLOR_ATTACHMENT
        );
    }

    #[test]
    fn sampled_depth_stencil_sees_one_aspect() {
        let class = ViewClass::of_2d(Texture2DViewType::ShaderResource2D);
        assert_eq!(
            class.aspects(Format::D24UnormS8Uint, Format::D24UnormS8Uint),
            vk::ImageAspectFlags::DEPTH
        );
        assert_eq!(
            class.aspects(Format::D24UnormS8Uint, Format::X24G8Uint),
            vk::ImageAspectFlags::STENCIL
        );
        let attachment = ViewClass::of_2d(Texture2DViewType::DepthStencilAttachment);
        assert_eq!(
            attachment.aspects(Format::D24UnormS8Uint, Format::D24UnormS8Uint),
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
    }

    #[test]
    fn ranges_resolve_remaining() {
        let desc = TextureDesc::texture_2d(Format::Rgba8Unorm, 64, 64, 7, 6);
        let range = view_range(&desc, vk::ImageAspectFlags::COLOR, 2, REMAINING, 1, REMAINING, 6)
            .expect("valid range");
        assert_eq!((range.base_mip_level, range.level_count), (2, 5));
        assert_eq!((range.base_array_layer, range.layer_count), (1, 5));

        assert!(view_range(&desc, vk::ImageAspectFlags::COLOR, 7, REMAINING, 0, 1, 6).is_err());
        assert!(view_range(&desc, vk::ImageAspectFlags::COLOR, 0, 8, 0, 1, 6).is_err());
        assert!(view_range(&desc, vk::ImageAspectFlags::COLOR, 0, 1, 4, 3, 6).is_err());
    }

    #[test]
    fn huge_windows_are_invalid() {
        let desc = TextureDesc::texture_2d(Format::Rgba8Unorm, 64, 64, 7, 6);
        let color = vk::ImageAspectFlags::COLOR;
        for (mip_offset, mip_num, layer_offset, layer_num) in [
            (2, u32::MAX - 1, 0, 1),
            (0, 1, 2, u32::MAX - 1),
            (u32::MAX - 1, 4, 0, 1),
        ] {
            let err = view_range(&desc, color, mip_offset, mip_num, layer_offset, layer_num, 6)
                .unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }

    #[test]
    fn sampler_translation() {
        let desc = SamplerDesc {
            filters: Filters {
                min: Filter::Linear,
                mag: Filter::Linear,
                mip: Filter::Nearest,
                ..Default::default()
            },
            anisotropy: 8,
            address_modes: AddressModes::uniform(AddressMode::ClampToEdge),
            compare_func: CompareFunc::Less,
            ..Default::default()
        };
        let info = sampler_info(&desc);
        assert_eq!(info.min_filter, vk::Filter::LINEAR);
        assert_eq!(info.mipmap_mode, vk::SamplerMipmapMode::NEAREST);
        assert_eq!(info.anisotropy_enable, vk::TRUE);
        assert_eq!(info.max_anisotropy, 8.0);
        assert_eq!(info.compare_enable, vk::TRUE);
        assert_eq!(info.address_mode_w, vk::SamplerAddressMode::CLAMP_TO_EDGE);
        assert_eq!(info.max_lod, 16.0);

        let plain = sampler_info(&SamplerDesc::default());
        assert_eq!(plain.anisotropy_enable, vk::FALSE);
        assert_eq!(plain.max_anisotropy, 1.0);
        assert_eq!(plain.compare_enable, vk::FALSE);
    }
}
