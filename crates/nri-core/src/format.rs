//! Texture and buffer formats.
//!
//! Naming follows the memory layout: `Rgba8Unorm` stores R in the lowest
//! byte. Depth-stencil formats have typed-view companions (`R24UnormX8`,
//! `X24G8Uint`, ...) for reading depth or stencil through a shader view.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Resource format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Format {
    #[default]
    Unknown,
    R8Unorm,
    R8Snorm,
    R8Uint,
    R8Sint,
    Rg8Unorm,
    Rg8Snorm,
    Rg8Uint,
    Rg8Sint,
    Bgra8Unorm,
    Bgra8Srgb,
    Rgba8Unorm,
    Rgba8Srgb,
    Rgba8Snorm,
    Rgba8Uint,
    Rgba8Sint,
    R16Unorm,
    R16Snorm,
    R16Uint,
    R16Sint,
    R16Sfloat,
    Rg16Unorm,
    Rg16Snorm,
    Rg16Uint,
    Rg16Sint,
    Rg16Sfloat,
    Rgba16Unorm,
    Rgba16Snorm,
    Rgba16Uint,
    Rgba16Sint,
    Rgba16Sfloat,
    R32Uint,
    R32Sint,
    R32Sfloat,
    Rg32Uint,
    Rg32Sint,
    Rg32Sfloat,
    Rgb32Uint,
    Rgb32Sint,
    Rgb32Sfloat,
    Rgba32Uint,
    Rgba32Sint,
    Rgba32Sfloat,
    B5G6R5Unorm,
    B5G5R5A1Unorm,
    B4G4R4A4Unorm,
    R10G10B10A2Unorm,
    R10G10B10A2Uint,
    R11G11B10Ufloat,
    R9G9B9E5Ufloat,
    Bc1RgbaUnorm,
    Bc1RgbaSrgb,
    Bc2RgbaUnorm,
    Bc2RgbaSrgb,
    Bc3RgbaUnorm,
    Bc3RgbaSrgb,
    Bc4RUnorm,
    Bc4RSnorm,
    Bc5RgUnorm,
    Bc5RgSnorm,
    Bc6hRgbUfloat,
    Bc6hRgbSfloat,
    Bc7RgbaUnorm,
    Bc7RgbaSrgb,
    D16Unorm,
    D24UnormS8Uint,
    D32Sfloat,
    D32SfloatS8UintX24,
    R24UnormX8,
    X24G8Uint,
    R32SfloatX8X24,
    X32G8UintX24,
}

impl Format {
    /// Number of formats, `Unknown` included.
    pub const COUNT: usize = 72;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Unknown,
        Self::R8Unorm,
        Self::R8Snorm,
        Self::R8Uint,
        Self::R8Sint,
        Self::Rg8Unorm,
        Self::Rg8Snorm,
        Self::Rg8Uint,
        Self::Rg8Sint,
        Self::Bgra8Unorm,
        Self::Bgra8Srgb,
        Self::Rgba8Unorm,
        Self::Rgba8Srgb,
        Self::Rgba8Snorm,
        Self::Rgba8Uint,
        Self::Rgba8Sint,
        Self::R16Unorm,
        Self::R16Snorm,
        Self::R16Uint,
        Self::R16Sint,
        Self::R16Sfloat,
        Self::Rg16Unorm,
        Self::Rg16Snorm,
        Self::Rg16Uint,
        Self::Rg16Sint,
        Self::Rg16Sfloat,
        Self::Rgba16Unorm,
        Self::Rgba16Snorm,
        Self::Rgba16Uint,
        Self::Rgba16Sint,
        Self::Rgba16Sfloat,
        Self::R32Uint,
        Self::R32Sint,
        Self::R32Sfloat,
        Self::Rg32Uint,
        Self::Rg32Sint,
        Self::Rg32Sfloat,
        Self::Rgb32Uint,
        Self::Rgb32Sint,
        Self::Rgb32Sfloat,
        Self::Rgba32Uint,
        Self::Rgba32Sint,
        Self::Rgba32Sfloat,
        Self::B5G6R5Unorm,
        Self::B5G5R5A1Unorm,
        Self::B4G4R4A4Unorm,
        Self::R10G10B10A2Unorm,
        Self::R10G10B10A2Uint,
        Self::R11G11B10Ufloat,
        Self::R9G9B9E5Ufloat,
        Self::Bc1RgbaUnorm,
        Self::Bc1RgbaSrgb,
        Self::Bc2RgbaUnorm,
        Self::Bc2RgbaSrgb,
        Self::Bc3RgbaUnorm,
        Self::Bc3RgbaSrgb,
        Self::Bc4RUnorm,
        Self::Bc4RSnorm,
        Self::Bc5RgUnorm,
        Self::Bc5RgSnorm,
        Self::Bc6hRgbUfloat,
        Self::Bc6hRgbSfloat,
        Self::Bc7RgbaUnorm,
        Self::Bc7RgbaSrgb,
        Self::D16Unorm,
        Self::D24UnormS8Uint,
        Self::D32Sfloat,
        Self::D32SfloatS8UintX24,
        Self::R24UnormX8,
        Self::X24G8Uint,
        Self::R32SfloatX8X24,
        Self::X32G8UintX24,
    ];

    /// Properties of this format.
    #[inline]
    pub fn props(self) -> &'static FormatProps {
        &FORMAT_PROPS[self as usize]
    }

    /// Upper-case name, e.g. `RGBA8_UNORM`.
    pub fn name(self) -> &'static str {
        self.props().name
    }

    #[inline]
    pub fn is_depth(self) -> bool {
        self.props().flags.contains(FormatFlags::DEPTH)
    }

    #[inline]
    pub fn is_stencil(self) -> bool {
        self.props().flags.contains(FormatFlags::STENCIL)
    }

    #[inline]
    pub fn is_depth_or_stencil(self) -> bool {
        self.props()
            .flags
            .intersects(FormatFlags::DEPTH.union(FormatFlags::STENCIL))
    }

    #[inline]
    pub fn is_compressed(self) -> bool {
        self.props().flags.contains(FormatFlags::COMPRESSED)
    }

    #[inline]
    pub fn is_srgb(self) -> bool {
        self.props().flags.contains(FormatFlags::SRGB)
    }
}

bitflags! {
    /// Classification flags of a format.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FormatFlags: u16 {
        const BGR = 1 << 0;
        const COMPRESSED = 1 << 1;
        const DEPTH = 1 << 2;
        const EXP_SHARED = 1 << 3;
        const FLOAT = 1 << 4;
        const PACKED = 1 << 5;
        const INTEGER = 1 << 6;
        const NORM = 1 << 7;
        const SIGNED = 1 << 8;
        const SRGB = 1 << 9;
        const STENCIL = 1 << 10;
    }
}

bitflags! {
    /// What a device can do with a format.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FormatSupportBits: u16 {
        const TEXTURE = 1 << 0;
        const STORAGE_TEXTURE = 1 << 1;
        const COLOR_ATTACHMENT = 1 << 2;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 3;
        const BLEND = 1 << 4;
        const STORAGE_TEXTURE_ATOMICS = 1 << 5;
        const BUFFER = 1 << 6;
        const STORAGE_BUFFER = 1 << 7;
        const VERTEX_BUFFER = 1 << 8;
        const STORAGE_BUFFER_ATOMICS = 1 << 9;
    }
}

/// Static description of a format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatProps {
    pub name: &'static str,
    pub format: Format,
    /// Bits of R, G, B, A (or depth, stencil for depth formats).
    pub channel_bits: [u8; 4],
    /// Bytes per texel, or per block for compressed formats.
    pub stride: u8,
    pub block_width: u8,
    pub block_height: u8,
    pub flags: FormatFlags,
}

impl FormatProps {
    /// Number of channels with a non-zero bit count.
    pub fn channel_num(&self) -> usize {
        self.channel_bits.iter().filter(|&&b| b != 0).count()
    }
}

#[allow(clippy::too_many_arguments)]
const fn props(
    name: &'static str,
    format: Format,
    channel_bits: [u8; 4],
    stride: u8,
    block_width: u8,
    block_height: u8,
    flags: FormatFlags,
) -> FormatProps {
    FormatProps {
        name,
        format,
        channel_bits,
        stride,
        block_width,
        block_height,
        flags,
    }
}

/// Indexed by `Format as usize`.
static FORMAT_PROPS: [FormatProps; Format::COUNT] = [
    props("UNKNOWN", Format::Unknown, [0, 0, 0, 0], 0, 0, 0, FormatFlags::empty()),
    props("R8_UNORM", Format::R8Unorm, [8, 0, 0, 0], 1, 1, 1, FormatFlags::NORM),
    props("R8_SNORM", Format::R8Snorm, [8, 0, 0, 0], 1, 1, 1, FormatFlags::NORM.union(FormatFlags::SIGNED)),
    props("R8_UINT", Format::R8Uint, [8, 0, 0, 0], 1, 1, 1, FormatFlags::INTEGER),
    props("R8_SINT", Format::R8Sint, [8, 0, 0, 0], 1, 1, 1, FormatFlags::INTEGER.union(FormatFlags::SIGNED)),
    props("RG8_UNORM", Format::Rg8Unorm, [8, 8, 0, 0], 2, 1, 1, FormatFlags::NORM),
    props("RG8_SNORM", Format::Rg8Snorm, [8, 8, 0, 0], 2, 1, 1, FormatFlags::NORM.union(FormatFlags::SIGNED)),
    props("RG8_UINT", Format::Rg8Uint, [8, 8, 0, 0], 2, 1, 1, FormatFlags::INTEGER),
    props("RG8_SINT", Format::Rg8Sint, [8, 8, 0, 0], 2, 1, 1, FormatFlags::INTEGER.union(FormatFlags::SIGNED)),
    props("BGRA8_UNORM", Format::Bgra8Unorm, [8, 8, 8, 8], 4, 1, 1, FormatFlags::BGR.union(FormatFlags::NORM)),
    props("BGRA8_SRGB", Format::Bgra8Srgb, [8, 8, 8, 8], 4, 1, 1, FormatFlags::BGR.union(FormatFlags::NORM).union(FormatFlags::SRGB)),
    props("RGBA8_UNORM", Format::Rgba8Unorm, [8, 8, 8, 8], 4, 1, 1, FormatFlags::NORM),
    props("RGBA8_SRGB", Format::Rgba8Srgb, [8, 8, 8, 8], 4, 1, 1, FormatFlags::NORM.union(FormatFlags::SRGB)),
    props("RGBA8_SNORM", Format::Rgba8Snorm, [8, 8, 8, 8], 4, 1, 1, FormatFlags::NORM.union(FormatFlags::SIGNED)),
    props("RGBA8_UINT", Format::Rgba8Uint, [8, 8, 8, 8], 4, 1, 1, FormatFlags::INTEGER),
    props("RGBA8_SINT", Format::Rgba8Sint, [8, 8, 8, 8], 4, 1, 1, FormatFlags::INTEGER.union(FormatFlags::SIGNED)),
    props("R16_UNORM", Format::R16Unorm, [16, 0, 0, 0], 2, 1, 1, FormatFlags::NORM),
    props("R16_SNORM", Format::R16Snorm, [16, 0, 0, 0], 2, 1, 1, FormatFlags::NORM.union(FormatFlags::SIGNED)),
    props("R16_UINT", Format::R16Uint, [16, 0, 0, 0], 2, 1, 1, FormatFlags::INTEGER),
    props("R16_SINT", Format::R16Sint, [16, 0, 0, 0], 2, 1, 1, FormatFlags::INTEGER.union(FormatFlags::SIGNED)),
    props("R16_SFLOAT", Format::R16Sfloat, [16, 0, 0, 0], 2, 1, 1, FormatFlags::FLOAT.union(FormatFlags::SIGNED)),
    props("RG16_UNORM", Format::Rg16Unorm, [16, 16, 0, 0], 4, 1, 1, FormatFlags::NORM),
    props("RG16_SNORM", Format::Rg16Snorm, [16, 16, 0, 0], 4, 1, 1, FormatFlags::NORM.union(FormatFlags::SIGNED)),
    props("RG16_UINT", Format::Rg16Uint, [16, 16, 0, 0], 4, 1, 1, FormatFlags::INTEGER),
    props("RG16_SINT", Format::Rg16Sint, [16, 16, 0, 0], 4, 1, 1, FormatFlags::INTEGER.union(FormatFlags::SIGNED)),
    props("RG16_SFLOAT", Format::Rg16Sfloat, [16, 16, 0, 0], 4, 1, 1, FormatFlags::FLOAT.union(FormatFlags::SIGNED)),
    props("RGBA16_UNORM", Format::Rgba16Unorm, [16, 16, 16, 16], 8, 1, 1, FormatFlags::NORM),
    props("RGBA16_SNORM", Format::Rgba16Snorm, [16, 16, 16, 16], 8, 1, 1, FormatFlags::NORM.union(FormatFlags::SIGNED)),
    props("RGBA16_UINT", Format::Rgba16Uint, [16, 16, 16, 16], 8, 1, 1, FormatFlags::INTEGER),
    props("RGBA16_SINT", Format::Rgba16Sint, [16, 16, 16, 16], 8, 1, 1, FormatFlags::INTEGER.union(FormatFlags::SIGNED)),
    props("RGBA16_SFLOAT", Format::Rgba16Sfloat, [16, 16, 16, 16], 8, 1, 1, FormatFlags::FLOAT.union(FormatFlags::SIGNED)),
    props("R32_UINT", Format::R32Uint, [32, 0, 0, 0], 4, 1, 1, FormatFlags::INTEGER),
    props("R32_SINT", Format::R32Sint, [32, 0, 0, 0], 4, 1, 1, FormatFlags::INTEGER.union(FormatFlags::SIGNED)),
    props("R32_SFLOAT", Format::R32Sfloat, [32, 0, 0, 0], 4, 1, 1, FormatFlags::FLOAT.union(FormatFlags::SIGNED)),
    props("RG32_UINT", Format::Rg32Uint, [32, 32, 0, 0], 8, 1, 1, FormatFlags::INTEGER),
    props("RG32_SINT", Format::Rg32Sint, [32, 32, 0, 0], 8, 1, 1, FormatFlags::INTEGER.union(FormatFlags::SIGNED)),
    props("RG32_SFLOAT", Format::Rg32Sfloat, [32, 32, 0, 0], 8, 1, 1, FormatFlags::FLOAT.union(FormatFlags::SIGNED)),
    props("RGB32_UINT", Format::Rgb32Uint, [32, 32, 32, 0], 12, 1, 1, FormatFlags::INTEGER),
    props("RGB32_SINT", Format::Rgb32Sint, [32, 32, 32, 0], 12, 1, 1, FormatFlags::INTEGER.union(FormatFlags::SIGNED)),
    props("RGB32_SFLOAT", Format::Rgb32Sfloat, [32, 32, 32, 0], 12, 1, 1, FormatFlags::FLOAT.union(FormatFlags::SIGNED)),
    props("RGBA32_UINT", Format::Rgba32Uint, [32, 32, 32, 32], 16, 1, 1, FormatFlags::INTEGER),
    props("RGBA32_SINT", Format::Rgba32Sint, [32, 32, 32, 32], 16, 1, 1, FormatFlags::INTEGER.union(FormatFlags::SIGNED)),
    props("RGBA32_SFLOAT", Format::Rgba32Sfloat, [32, 32, 32, 32], 16, 1, 1, FormatFlags::FLOAT.union(FormatFlags::SIGNED)),
    props("B5_G6_R5_UNORM", Format::B5G6R5Unorm, [5, 6, 5, 0], 2, 1, 1, FormatFlags::BGR.union(FormatFlags::NORM).union(FormatFlags::PACKED)),
    props("B5_G5_R5_A1_UNORM", Format::B5G5R5A1Unorm, [5, 5, 5, 1], 2, 1, 1, FormatFlags::BGR.union(FormatFlags::NORM).union(FormatFlags::PACKED)),
    props("B4_G4_R4_A4_UNORM", Format::B4G4R4A4Unorm, [4, 4, 4, 4], 2, 1, 1, FormatFlags::BGR.union(FormatFlags::NORM).union(FormatFlags::PACKED)),
    props("R10_G10_B10_A2_UNORM", Format::R10G10B10A2Unorm, [10, 10, 10, 2], 4, 1, 1, FormatFlags::NORM.union(FormatFlags::PACKED)),
    props("R10_G10_B10_A2_UINT", Format::R10G10B10A2Uint, [10, 10, 10, 2], 4, 1, 1, FormatFlags::INTEGER.union(FormatFlags::PACKED)),
    props("R11_G11_B10_UFLOAT", Format::R11G11B10Ufloat, [11, 11, 10, 0], 4, 1, 1, FormatFlags::FLOAT.union(FormatFlags::PACKED)),
    props("R9_G9_B9_E5_UFLOAT", Format::R9G9B9E5Ufloat, [9, 9, 9, 5], 4, 1, 1, FormatFlags::EXP_SHARED.union(FormatFlags::FLOAT).union(FormatFlags::PACKED)),
    props("BC1_RGBA_UNORM", Format::Bc1RgbaUnorm, [5, 6, 5, 1], 8, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::NORM)),
    props("BC1_RGBA_SRGB", Format::Bc1RgbaSrgb, [5, 6, 5, 1], 8, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::NORM).union(FormatFlags::SRGB)),
    props("BC2_RGBA_UNORM", Format::Bc2RgbaUnorm, [5, 6, 5, 4], 16, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::NORM)),
    props("BC2_RGBA_SRGB", Format::Bc2RgbaSrgb, [5, 6, 5, 4], 16, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::NORM).union(FormatFlags::SRGB)),
    props("BC3_RGBA_UNORM", Format::Bc3RgbaUnorm, [5, 6, 5, 8], 16, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::NORM)),
    props("BC3_RGBA_SRGB", Format::Bc3RgbaSrgb, [5, 6, 5, 8], 16, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::NORM).union(FormatFlags::SRGB)),
    props("BC4_R_UNORM", Format::Bc4RUnorm, [8, 0, 0, 0], 8, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::NORM)),
    props("BC4_R_SNORM", Format::Bc4RSnorm, [8, 0, 0, 0], 8, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::NORM).union(FormatFlags::SIGNED)),
    props("BC5_RG_UNORM", Format::Bc5RgUnorm, [8, 8, 0, 0], 16, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::NORM)),
    props("BC5_RG_SNORM", Format::Bc5RgSnorm, [8, 8, 0, 0], 16, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::NORM).union(FormatFlags::SIGNED)),
    props("BC6H_RGB_UFLOAT", Format::Bc6hRgbUfloat, [16, 16, 16, 0], 16, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::FLOAT)),
    props("BC6H_RGB_SFLOAT", Format::Bc6hRgbSfloat, [16, 16, 16, 0], 16, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::FLOAT).union(FormatFlags::SIGNED)),
    props("BC7_RGBA_UNORM", Format::Bc7RgbaUnorm, [8, 8, 8, 8], 16, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::NORM)),
    props("BC7_RGBA_SRGB", Format::Bc7RgbaSrgb, [8, 8, 8, 8], 16, 4, 4, FormatFlags::COMPRESSED.union(FormatFlags::NORM).union(FormatFlags::SRGB)),
    props("D16_UNORM", Format::D16Unorm, [16, 0, 0, 0], 2, 1, 1, FormatFlags::DEPTH.union(FormatFlags::NORM)),
    props("D24_UNORM_S8_UINT", Format::D24UnormS8Uint, [24, 8, 0, 0], 4, 1, 1, FormatFlags::DEPTH.union(FormatFlags::STENCIL).union(FormatFlags::NORM)),
    props("D32_SFLOAT", Format::D32Sfloat, [32, 0, 0, 0], 4, 1, 1, FormatFlags::DEPTH.union(FormatFlags::FLOAT).union(FormatFlags::SIGNED)),
    props("D32_SFLOAT_S8_UINT_X24", Format::D32SfloatS8UintX24, [32, 8, 0, 0], 8, 1, 1, FormatFlags::DEPTH.union(FormatFlags::STENCIL).union(FormatFlags::FLOAT).union(FormatFlags::SIGNED)),
    props("R24_UNORM_X8", Format::R24UnormX8, [24, 8, 0, 0], 4, 1, 1, FormatFlags::DEPTH.union(FormatFlags::NORM)),
    props("X24_G8_UINT", Format::X24G8Uint, [24, 8, 0, 0], 4, 1, 1, FormatFlags::STENCIL.union(FormatFlags::INTEGER)),
    props("R32_SFLOAT_X8_X24", Format::R32SfloatX8X24, [32, 8, 0, 0], 8, 1, 1, FormatFlags::DEPTH.union(FormatFlags::FLOAT).union(FormatFlags::SIGNED)),
    props("X32_G8_UINT_X24", Format::X32G8UintX24, [32, 8, 0, 0], 8, 1, 1, FormatFlags::STENCIL.union(FormatFlags::INTEGER)),
];

/// Properties of `format`.
pub fn get_format_props(format: Format) -> &'static FormatProps {
    format.props()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_format() {
        for (i, format) in Format::ALL.iter().enumerate() {
            assert_eq!(*format as usize, i);
            assert_eq!(FORMAT_PROPS[i].format, *format);
        }
    }

    #[test]
    fn compressed_formats_use_4x4_blocks() {
        for format in Format::ALL {
            let p = format.props();
            if format.is_compressed() {
                assert_eq!((p.block_width, p.block_height), (4, 4), "{}", p.name);
            } else if format != Format::Unknown {
                assert_eq!((p.block_width, p.block_height), (1, 1), "{}", p.name);
            }
        }
    }

    #[test]
    fn depth_stencil_classification() {
        assert!(Format::D24UnormS8Uint.is_depth());
        assert!(Format::D24UnormS8Uint.is_stencil());
        assert!(Format::D32Sfloat.is_depth());
        assert!(!Format::D32Sfloat.is_stencil());
        assert!(Format::X24G8Uint.is_stencil());
        assert!(!Format::X24G8Uint.is_depth());
        assert!(!Format::Rgba8Unorm.is_depth_or_stencil());
    }

    #[test]
    fn strides() {
        assert_eq!(Format::Rgba8Unorm.props().stride, 4);
        assert_eq!(Format::Rgb32Sfloat.props().stride, 12);
        assert_eq!(Format::Bc1RgbaUnorm.props().stride, 8);
        assert_eq!(Format::Bc7RgbaSrgb.props().stride, 16);
        assert_eq!(Format::Rg16Sfloat.props().channel_num(), 2);
    }

    #[test]
    fn srgb_names() {
        let srgb: Vec<_> = Format::ALL
            .iter()
            .filter(|f| f.is_srgb())
            .map(|f| f.name())
            .collect();
        insta::assert_snapshot!(srgb.join(" "), @"BGRA8_SRGB RGBA8_SRGB BC1_RGBA_SRGB BC2_RGBA_SRGB BC3_RGBA_SRGB BC7_RGBA_SRGB");
    }
}
