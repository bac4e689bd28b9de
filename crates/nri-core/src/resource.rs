//! Buffers, textures, views and samplers.

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::format::Format;
use crate::interface::Backend;
use crate::pipeline::CompareFunc;

/// "Up to the last mip / layer" in view descriptions.
pub const REMAINING: u32 = 0;
/// "Up to the end of the buffer" in view descriptions and barriers.
pub const WHOLE_SIZE: u64 = 0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextureType {
    Texture1D,
    #[default]
    Texture2D,
    Texture3D,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TextureUsageBits: u8 {
        const SHADER_RESOURCE = 1 << 0;
        const SHADER_RESOURCE_STORAGE = 1 << 1;
        const COLOR_ATTACHMENT = 1 << 2;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 3;
        const SHADING_RATE_ATTACHMENT = 1 << 4;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BufferUsageBits: u16 {
        const SHADER_RESOURCE = 1 << 0;
        const SHADER_RESOURCE_STORAGE = 1 << 1;
        const VERTEX_BUFFER = 1 << 2;
        const INDEX_BUFFER = 1 << 3;
        const CONSTANT_BUFFER = 1 << 4;
        const ARGUMENT_BUFFER = 1 << 5;
        const SCRATCH_BUFFER = 1 << 6;
        const SHADER_BINDING_TABLE = 1 << 7;
        const ACCELERATION_STRUCTURE_BUILD_INPUT = 1 << 8;
        const ACCELERATION_STRUCTURE_STORAGE = 1 << 9;
    }
}

/// Texture creation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub texture_type: TextureType,
    pub usage: TextureUsageBits,
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_num: u32,
    pub layer_num: u32,
    pub sample_num: u32,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            texture_type: TextureType::Texture2D,
            usage: TextureUsageBits::SHADER_RESOURCE,
            format: Format::Unknown,
            width: 1,
            height: 1,
            depth: 1,
            mip_num: 1,
            layer_num: 1,
            sample_num: 1,
        }
    }
}

impl TextureDesc {
    pub fn texture_1d(format: Format, width: u32, mip_num: u32, layer_num: u32) -> Self {
        Self {
            texture_type: TextureType::Texture1D,
            format,
            width,
            mip_num,
            layer_num,
            ..Default::default()
        }
    }

    pub fn texture_2d(format: Format, width: u32, height: u32, mip_num: u32, layer_num: u32) -> Self {
        Self {
            texture_type: TextureType::Texture2D,
            format,
            width,
            height,
            mip_num,
            layer_num,
            ..Default::default()
        }
    }

    pub fn texture_3d(format: Format, width: u32, height: u32, depth: u32, mip_num: u32) -> Self {
        Self {
            texture_type: TextureType::Texture3D,
            format,
            width,
            height,
            depth,
            mip_num,
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: TextureUsageBits) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_samples(mut self, sample_num: u32) -> Self {
        self.sample_num = sample_num;
        self
    }

    /// Check the description against the interface contract.
    pub fn validate(&self) -> Result<()> {
        if self.format == Format::Unknown {
            return Err(Error::invalid("texture format is UNKNOWN"));
        }
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(Error::invalid("texture dimensions must be non-zero"));
        }
        if self.mip_num == 0 || self.layer_num == 0 || self.sample_num == 0 {
            return Err(Error::invalid(
                "texture mip, layer and sample counts must be non-zero",
            ));
        }
        if !self.sample_num.is_power_of_two() {
            return Err(Error::invalid("sample count must be a power of two"));
        }
        match self.texture_type {
            TextureType::Texture1D if self.height != 1 || self.depth != 1 => {
                Err(Error::invalid("1D textures must have height and depth of 1"))
            }
            TextureType::Texture2D if self.depth != 1 => {
                Err(Error::invalid("2D textures must have depth of 1"))
            }
            TextureType::Texture3D if self.layer_num != 1 => {
                Err(Error::invalid("3D textures cannot be layered"))
            }
            _ if self.sample_num > 1 && self.mip_num > 1 => {
                Err(Error::invalid("multisampled textures cannot have mips"))
            }
            _ => Ok(()),
        }
    }

    /// Extent of a mip level, clamped to 1.
    pub fn mip_extent(&self, mip: u32) -> [u32; 3] {
        [
            self.width.checked_shr(mip).unwrap_or(0).max(1),
            self.height.checked_shr(mip).unwrap_or(0).max(1),
            self.depth.checked_shr(mip).unwrap_or(0).max(1),
        ]
    }

    /// Resolve a `(offset, num)` mip range where `num` may be [`REMAINING`].
    pub fn resolve_mips(&self, offset: u32, num: u32) -> u32 {
        resolve_remaining(self.mip_num, offset, num)
    }

    /// Resolve a `(offset, num)` layer range where `num` may be [`REMAINING`].
    pub fn resolve_layers(&self, offset: u32, num: u32) -> u32 {
        resolve_remaining(self.layer_num, offset, num)
    }
}

fn resolve_remaining(total: u32, offset: u32, num: u32) -> u32 {
    if num == REMAINING {
        total.saturating_sub(offset)
    } else {
        num
    }
}

/// Buffer creation parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    pub size: u64,
    /// Non-zero for structured buffers.
    pub structure_stride: u32,
    pub usage: BufferUsageBits,
}

impl BufferDesc {
    pub fn new(size: u64, usage: BufferUsageBits) -> Self {
        Self {
            size,
            structure_stride: 0,
            usage,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::invalid("buffer size must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Texture1DViewType {
    ShaderResource1D,
    ShaderResource1DArray,
    ShaderResourceStorage1D,
    ShaderResourceStorage1DArray,
    ColorAttachment,
    DepthStencilAttachment,
    DepthReadonlyStencilAttachment,
    DepthAttachmentStencilReadonly,
    DepthStencilReadonly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Texture2DViewType {
    ShaderResource2D,
    ShaderResource2DArray,
    ShaderResourceCube,
    ShaderResourceCubeArray,
    ShaderResourceStorage2D,
    ShaderResourceStorage2DArray,
    ColorAttachment,
    DepthStencilAttachment,
    DepthReadonlyStencilAttachment,
    DepthAttachmentStencilReadonly,
    DepthStencilReadonly,
    ShadingRateAttachment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Texture3DViewType {
    ShaderResource3D,
    ShaderResourceStorage3D,
    ColorAttachment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferViewType {
    ShaderResource,
    ShaderResourceStorage,
    Constant,
}

pub struct Texture1DViewDesc<'a, B: Backend> {
    pub texture: &'a B::Texture,
    pub view_type: Texture1DViewType,
    pub format: Format,
    pub mip_offset: u32,
    pub mip_num: u32,
    pub layer_offset: u32,
    pub layer_num: u32,
}

pub struct Texture2DViewDesc<'a, B: Backend> {
    pub texture: &'a B::Texture,
    pub view_type: Texture2DViewType,
    pub format: Format,
    pub mip_offset: u32,
    pub mip_num: u32,
    pub layer_offset: u32,
    pub layer_num: u32,
}

impl<'a, B: Backend> Texture2DViewDesc<'a, B> {
    /// Whole-resource view of `texture`.
    pub fn new(texture: &'a B::Texture, view_type: Texture2DViewType, format: Format) -> Self {
        Self {
            texture,
            view_type,
            format,
            mip_offset: 0,
            mip_num: REMAINING,
            layer_offset: 0,
            layer_num: REMAINING,
        }
    }
}

pub struct Texture3DViewDesc<'a, B: Backend> {
    pub texture: &'a B::Texture,
    pub view_type: Texture3DViewType,
    pub format: Format,
    pub mip_offset: u32,
    pub mip_num: u32,
    pub slice_offset: u32,
    pub slice_num: u32,
}

pub struct BufferViewDesc<'a, B: Backend> {
    pub buffer: &'a B::Buffer,
    pub view_type: BufferViewType,
    /// `Unknown` for raw / structured views.
    pub format: Format,
    pub offset: u64,
    /// May be [`WHOLE_SIZE`].
    pub size: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Filter {
    #[default]
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReductionMode {
    #[default]
    Average,
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
    MirrorClampToEdge,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BorderColor {
    #[default]
    FloatTransparentBlack,
    FloatOpaqueBlack,
    FloatOpaqueWhite,
    IntTransparentBlack,
    IntOpaqueBlack,
    IntOpaqueWhite,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Filters {
    pub min: Filter,
    pub mag: Filter,
    pub mip: Filter,
    pub reduction: ReductionMode,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AddressModes {
    pub u: AddressMode,
    pub v: AddressMode,
    pub w: AddressMode,
}

impl AddressModes {
    pub const fn uniform(mode: AddressMode) -> Self {
        Self {
            u: mode,
            v: mode,
            w: mode,
        }
    }
}

/// Sampler creation parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerDesc {
    pub filters: Filters,
    /// 0 or 1 disables anisotropic filtering.
    pub anisotropy: u8,
    pub mip_bias: f32,
    pub mip_min: f32,
    pub mip_max: f32,
    pub address_modes: AddressModes,
    /// `CompareFunc::None` disables comparison.
    pub compare_func: CompareFunc,
    pub border_color: BorderColor,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            filters: Filters::default(),
            anisotropy: 0,
            mip_bias: 0.0,
            mip_min: 0.0,
            mip_max: 16.0,
            address_modes: AddressModes::default(),
            compare_func: CompareFunc::None,
            border_color: BorderColor::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_validation() {
        let desc = TextureDesc::texture_2d(Format::Rgba8Unorm, 256, 256, 9, 1);
        assert!(desc.validate().is_ok());

        let unknown = TextureDesc::texture_2d(Format::Unknown, 4, 4, 1, 1);
        assert!(matches!(unknown.validate(), Err(Error::InvalidArgument(_))));

        let no_mips = TextureDesc::texture_2d(Format::Rgba8Unorm, 4, 4, 0, 1);
        assert!(no_mips.validate().is_err());

        let layered_3d = TextureDesc {
            layer_num: 2,
            ..TextureDesc::texture_3d(Format::R16Sfloat, 8, 8, 8, 1)
        };
        assert!(layered_3d.validate().is_err());

        let msaa_mips = TextureDesc::texture_2d(Format::Rgba8Unorm, 4, 4, 2, 1).with_samples(4);
        assert!(msaa_mips.validate().is_err());
    }

    #[test]
    fn mip_extents_clamp() {
        let desc = TextureDesc::texture_2d(Format::Rgba8Unorm, 256, 64, 9, 1);
        assert_eq!(desc.mip_extent(0), [256, 64, 1]);
        assert_eq!(desc.mip_extent(3), [32, 8, 1]);
        assert_eq!(desc.mip_extent(8), [1, 1, 1]);
        assert_eq!(desc.mip_extent(32), [1, 1, 1]);
        assert_eq!(desc.mip_extent(u32::MAX), [1, 1, 1]);
    }

    #[test]
    fn remaining_ranges() {
        let desc = TextureDesc::texture_2d(Format::Rgba8Unorm, 64, 64, 7, 6);
        assert_eq!(desc.resolve_mips(2, REMAINING), 5);
        assert_eq!(desc.resolve_mips(2, 1), 1);
        assert_eq!(desc.resolve_layers(0, REMAINING), 6);
    }

    #[test]
    fn buffer_validation() {
        assert!(BufferDesc::new(0, BufferUsageBits::VERTEX_BUFFER)
            .validate()
            .is_err());
        assert!(BufferDesc::new(16, BufferUsageBits::VERTEX_BUFFER)
            .validate()
            .is_ok());
    }
}
