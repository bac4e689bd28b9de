//! Pipeline state descriptions.

use bitflags::bitflags;

use crate::barrier::StageBits;
use crate::format::Format;
use crate::interface::Backend;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Topology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    LineListWithAdjacency,
    LineStripWithAdjacency,
    TriangleListWithAdjacency,
    TriangleStripWithAdjacency,
    PatchList,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FillMode {
    #[default]
    Solid,
    Wireframe,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

/// Comparison function; `None` disables the test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    #[default]
    None,
    Always,
    Never,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StencilFunc {
    #[default]
    Keep,
    Zero,
    Replace,
    IncrementAndClamp,
    DecrementAndClamp,
    Invert,
    IncrementAndWrap,
    DecrementAndWrap,
}

/// Logic operation; `None` disables logic ops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LogicFunc {
    #[default]
    None,
    Clear,
    And,
    AndReverse,
    Copy,
    AndInverted,
    Xor,
    Or,
    Nor,
    Equivalent,
    Invert,
    OrReverse,
    CopyInverted,
    OrInverted,
    Nand,
    Set,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    #[default]
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
    Src1Color,
    OneMinusSrc1Color,
    Src1Alpha,
    OneMinusSrc1Alpha,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendFunc {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ColorWriteBits: u8 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
        const RGB = Self::R.bits() | Self::G.bits() | Self::B.bits();
        const RGBA = Self::RGB.bits() | Self::A.bits();
    }
}

impl Default for ColorWriteBits {
    fn default() -> Self {
        Self::RGBA
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IndexType {
    Uint16,
    #[default]
    Uint32,
}

impl IndexType {
    pub const fn size(self) -> u64 {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveRestart {
    #[default]
    Disabled,
    IndicesUint16,
    IndicesUint32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VertexStreamStepRate {
    #[default]
    PerVertex,
    PerInstance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexAttributeDesc {
    /// SPIR-V `location`.
    pub location: u32,
    pub offset: u32,
    pub format: Format,
    pub stream_index: u16,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VertexStreamDesc {
    pub stride: u16,
    pub binding_slot: u16,
    pub step_rate: VertexStreamStepRate,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct VertexInputDesc<'a> {
    pub attributes: &'a [VertexAttributeDesc],
    pub streams: &'a [VertexStreamDesc],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InputAssemblyDesc {
    pub topology: Topology,
    pub tess_control_point_num: u8,
    pub primitive_restart: PrimitiveRestart,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DepthBiasDesc {
    pub constant: f32,
    pub clamp: f32,
    pub slope: f32,
}

impl DepthBiasDesc {
    pub fn is_enabled(&self) -> bool {
        self.constant != 0.0 || self.slope != 0.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RasterizationDesc {
    pub depth_bias: DepthBiasDesc,
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    pub front_counter_clockwise: bool,
    pub depth_clamp: bool,
    pub line_smoothing: bool,
    pub conservative_raster: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MultisampleDesc {
    pub sample_mask: u32,
    pub sample_num: u32,
    pub alpha_to_coverage: bool,
    pub sample_locations: bool,
}

impl Default for MultisampleDesc {
    fn default() -> Self {
        Self {
            sample_mask: u32::MAX,
            sample_num: 1,
            alpha_to_coverage: false,
            sample_locations: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendDesc {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub func: BlendFunc,
}

impl Default for BlendDesc {
    fn default() -> Self {
        Self {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            func: BlendFunc::Add,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColorAttachmentDesc {
    pub format: Format,
    pub color_blend: BlendDesc,
    pub alpha_blend: BlendDesc,
    pub color_write_mask: ColorWriteBits,
    pub blend_enabled: bool,
}

impl ColorAttachmentDesc {
    pub fn opaque(format: Format) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StencilDesc {
    pub compare_func: CompareFunc,
    pub fail: StencilFunc,
    pub pass: StencilFunc,
    pub depth_fail: StencilFunc,
    pub write_mask: u8,
    pub compare_mask: u8,
}

impl Default for StencilDesc {
    fn default() -> Self {
        Self {
            compare_func: CompareFunc::None,
            fail: StencilFunc::Keep,
            pass: StencilFunc::Keep,
            depth_fail: StencilFunc::Keep,
            write_mask: 0xFF,
            compare_mask: 0xFF,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DepthAttachmentDesc {
    pub compare_func: CompareFunc,
    pub write: bool,
    pub bounds_test: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StencilAttachmentDesc {
    pub front: StencilDesc,
    pub back: StencilDesc,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OutputMergerDesc<'a> {
    pub colors: &'a [ColorAttachmentDesc],
    pub depth: DepthAttachmentDesc,
    pub stencil: StencilAttachmentDesc,
    /// `Unknown` when there is no depth-stencil attachment.
    pub depth_stencil_format: Format,
    pub logic_func: LogicFunc,
}

/// A shader stage's bytecode (SPIR-V for Vulkan).
#[derive(Clone, Copy, Debug)]
pub struct ShaderDesc<'a> {
    pub stage: StageBits,
    pub bytecode: &'a [u8],
    /// Defaults to `main` when empty.
    pub entry_point: &'a str,
}

impl<'a> ShaderDesc<'a> {
    pub fn new(stage: StageBits, bytecode: &'a [u8]) -> Self {
        Self {
            stage,
            bytecode,
            entry_point: "main",
        }
    }
}

pub struct GraphicsPipelineDesc<'a, B: Backend> {
    pub pipeline_layout: &'a B::PipelineLayout,
    pub vertex_input: Option<VertexInputDesc<'a>>,
    pub input_assembly: InputAssemblyDesc,
    pub rasterization: RasterizationDesc,
    pub multisample: Option<MultisampleDesc>,
    pub output_merger: OutputMergerDesc<'a>,
    pub shaders: &'a [ShaderDesc<'a>],
}

pub struct ComputePipelineDesc<'a, B: Backend> {
    pub pipeline_layout: &'a B::PipelineLayout,
    pub shader: ShaderDesc<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_write_default_is_rgba() {
        assert_eq!(ColorWriteBits::default(), ColorWriteBits::RGBA);
        assert!(ColorWriteBits::RGBA.contains(ColorWriteBits::A));
        assert!(!ColorWriteBits::RGB.contains(ColorWriteBits::A));
    }

    #[test]
    fn depth_bias_enablement() {
        assert!(!DepthBiasDesc::default().is_enabled());
        let bias = DepthBiasDesc {
            slope: 1.5,
            ..Default::default()
        };
        assert!(bias.is_enabled());
    }

    #[test]
    fn index_sizes() {
        assert_eq!(IndexType::Uint16.size(), 2);
        assert_eq!(IndexType::Uint32.size(), 4);
    }
}
