//! Translation tables from NRI enums and flags to Vulkan.

use ash::vk;
use nri_core::{
    AccelerationStructureBits, AccessBits, AddressMode, BlendFactor, BlendFunc, BorderColor,
    BottomLevelGeometryBits, BufferUsageBits, ColorWriteBits, CompareFunc, CullMode,
    DescriptorType, FillMode, Filter, Format, FormatSupportBits, IndexType, Layout, LogicFunc,
    PlaneBits, QueryType, ReductionMode, StageBits, StencilFunc, Texture1DViewType,
    Texture2DViewType, Texture3DViewType, TextureType, TextureUsageBits, Topology,
};

/// Indexed by `Format as usize`.
static VK_FORMATS: [vk::Format; Format::COUNT] = [
    vk::Format::UNDEFINED,
    vk::Format::R8_UNORM,
    vk::Format::R8_SNORM,
    vk::Format::R8_UINT,
    vk::Format::R8_SINT,
    vk::Format::R8G8_UNORM,
    vk::Format::R8G8_SNORM,
    vk::Format::R8G8_UINT,
    vk::Format::R8G8_SINT,
    vk::Format::B8G8R8A8_UNORM,
    vk::Format::B8G8R8A8_SRGB,
    vk::Format::R8G8B8A8_UNORM,
    vk::Format::R8G8B8A8_SRGB,
    vk::Format::R8G8B8A8_SNORM,
    vk::Format::R8G8B8A8_UINT,
    vk::Format::R8G8B8A8_SINT,
    vk::Format::R16_UNORM,
    vk::Format::R16_SNORM,
    vk::Format::R16_UINT,
    vk::Format::R16_SINT,
    vk::Format::R16_SFLOAT,
    vk::Format::R16G16_UNORM,
    vk::Format::R16G16_SNORM,
    vk::Format::R16G16_UINT,
    vk::Format::R16G16_SINT,
    vk::Format::R16G16_SFLOAT,
    vk::Format::R16G16B16A16_UNORM,
    vk::Format::R16G16B16A16_SNORM,
    vk::Format::R16G16B16A16_UINT,
    vk::Format::R16G16B16A16_SINT,
    vk::Format::R16G16B16A16_SFLOAT,
    vk::Format::R32_UINT,
    vk::Format::R32_SINT,
    vk::Format::R32_SFLOAT,
    vk::Format::R32G32_UINT,
    vk::Format::R32G32_SINT,
    vk::Format::R32G32_SFLOAT,
    vk::Format::R32G32B32_UINT,
    vk::Format::R32G32B32_SINT,
    vk::Format::R32G32B32_SFLOAT,
    vk::Format::R32G32B32A32_UINT,
    vk::Format::R32G32B32A32_SINT,
    vk::Format::R32G32B32A32_SFLOAT,
    vk::Format::R5G6B5_UNORM_PACK16,
    vk::Format::A1R5G5B5_UNORM_PACK16,
    vk::Format::A4R4G4B4_UNORM_PACK16,
    vk::Format::A2B10G10R10_UNORM_PACK32,
    vk::Format::A2B10G10R10_UINT_PACK32,
    vk::Format::B10G11R11_UFLOAT_PACK32,
    vk::Format::E5B9G9R9_UFLOAT_PACK32,
    vk::Format::BC1_RGBA_UNORM_BLOCK,
    vk::Format::BC1_RGBA_SRGB_BLOCK,
    vk::Format::BC2_UNORM_BLOCK,
    vk::Format::BC2_SRGB_BLOCK,
    vk::Format::BC3_UNORM_BLOCK,
    vk::Format::BC3_SRGB_BLOCK,
    vk::Format::BC4_UNORM_BLOCK,
    vk::Format::BC4_SNORM_BLOCK,
    vk::Format::BC5_UNORM_BLOCK,
    vk::Format::BC5_SNORM_BLOCK,
    vk::Format::BC6H_UFLOAT_BLOCK,
    vk::Format::BC6H_SFLOAT_BLOCK,
    vk::Format::BC7_UNORM_BLOCK,
    vk::Format::BC7_SRGB_BLOCK,
    vk::Format::D16_UNORM,
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    // Typed views of depth-stencil formats alias their storage format.
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D32_SFLOAT_S8_UINT,
];

pub fn format_to_vk(format: Format) -> vk::Format {
    VK_FORMATS[format as usize]
}

/// First NRI format that maps onto `format`, `Unknown` if none does.
pub fn format_from_vk(format: vk::Format) -> Format {
    Format::ALL
        .into_iter()
        .find(|f| format_to_vk(*f) == format)
        .unwrap_or(Format::Unknown)
}

/// Aspects present in a format.
pub fn format_aspects(format: Format) -> vk::ImageAspectFlags {
    if format.is_depth_or_stencil() {
        let mut aspects = vk::ImageAspectFlags::empty();
        if format.is_depth() {
            aspects |= vk::ImageAspectFlags::DEPTH;
        }
        if format.is_stencil() {
            aspects |= vk::ImageAspectFlags::STENCIL;
        }
        aspects
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

/// Aspect mask of `planes` within `format`; empty planes select every aspect.
pub fn planes_to_aspect(planes: PlaneBits, format: Format) -> vk::ImageAspectFlags {
    let present = format_aspects(format);
    if planes.is_empty() {
        return present;
    }
    let mut aspects = vk::ImageAspectFlags::empty();
    if planes.contains(PlaneBits::COLOR) {
        aspects |= vk::ImageAspectFlags::COLOR;
    }
    if planes.contains(PlaneBits::DEPTH) {
        aspects |= vk::ImageAspectFlags::DEPTH;
    }
    if planes.contains(PlaneBits::STENCIL) {
        aspects |= vk::ImageAspectFlags::STENCIL;
    }
    let aspects = aspects & present;
    if aspects.is_empty() {
        present
    } else {
        aspects
    }
}

pub fn format_support_from_vk(props: vk::FormatProperties) -> FormatSupportBits {
    const OPTIMAL: [(vk::FormatFeatureFlags, FormatSupportBits); 6] = [
        (vk::FormatFeatureFlags::SAMPLED_IMAGE, FormatSupportBits::TEXTURE),
        (vk::FormatFeatureFlags::STORAGE_IMAGE, FormatSupportBits::STORAGE_TEXTURE),
        (vk::FormatFeatureFlags::COLOR_ATTACHMENT, FormatSupportBits::COLOR_ATTACHMENT),
        (
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            FormatSupportBits::DEPTH_STENCIL_ATTACHMENT,
        ),
        (vk::FormatFeatureFlags::COLOR_ATTACHMENT_BLEND, FormatSupportBits::BLEND),
        (
            vk::FormatFeatureFlags::STORAGE_IMAGE_ATOMIC,
            FormatSupportBits::STORAGE_TEXTURE_ATOMICS,
        ),
    ];
    const BUFFER: [(vk::FormatFeatureFlags, FormatSupportBits); 4] = [
        (vk::FormatFeatureFlags::UNIFORM_TEXEL_BUFFER, FormatSupportBits::BUFFER),
        (vk::FormatFeatureFlags::STORAGE_TEXEL_BUFFER, FormatSupportBits::STORAGE_BUFFER),
        (vk::FormatFeatureFlags::VERTEX_BUFFER, FormatSupportBits::VERTEX_BUFFER),
        (
            vk::FormatFeatureFlags::STORAGE_TEXEL_BUFFER_ATOMIC,
            FormatSupportBits::STORAGE_BUFFER_ATOMICS,
        ),
    ];

    let mut support = FormatSupportBits::empty();
    for (vk_bit, bit) in OPTIMAL {
        if props.optimal_tiling_features.contains(vk_bit) {
            support |= bit;
        }
    }
    for (vk_bit, bit) in BUFFER {
        if props.buffer_features.contains(vk_bit) {
            support |= bit;
        }
    }
    support
}

pub fn layout_to_vk(layout: Layout) -> vk::ImageLayout {
    match layout {
        Layout::Unknown => vk::ImageLayout::UNDEFINED,
        Layout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        Layout::DepthStencilAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        Layout::DepthStencilReadonly => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        Layout::ShaderResource => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        Layout::ShaderResourceStorage => vk::ImageLayout::GENERAL,
        Layout::CopySource | Layout::ResolveSource => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        Layout::CopyDestination | Layout::ResolveDestination => {
            vk::ImageLayout::TRANSFER_DST_OPTIMAL
        }
        Layout::Present => vk::ImageLayout::PRESENT_SRC_KHR,
        Layout::ShadingRateAttachment => {
            vk::ImageLayout::FRAGMENT_SHADING_RATE_ATTACHMENT_OPTIMAL_KHR
        }
    }
}

const ACCESS_TABLE: [(AccessBits, vk::AccessFlags2); 18] = [
    (AccessBits::INDEX_BUFFER, vk::AccessFlags2::INDEX_READ),
    (AccessBits::VERTEX_BUFFER, vk::AccessFlags2::VERTEX_ATTRIBUTE_READ),
    (AccessBits::CONSTANT_BUFFER, vk::AccessFlags2::UNIFORM_READ),
    (AccessBits::ARGUMENT_BUFFER, vk::AccessFlags2::INDIRECT_COMMAND_READ),
    (AccessBits::SHADER_RESOURCE, vk::AccessFlags2::SHADER_READ),
    (AccessBits::SHADER_RESOURCE_STORAGE, vk::AccessFlags2::SHADER_READ),
    (AccessBits::SHADER_RESOURCE_STORAGE, vk::AccessFlags2::SHADER_WRITE),
    (AccessBits::COLOR_ATTACHMENT, vk::AccessFlags2::COLOR_ATTACHMENT_READ),
    (AccessBits::COLOR_ATTACHMENT, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE),
    (
        AccessBits::DEPTH_STENCIL_ATTACHMENT_READ,
        vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ,
    ),
    (
        AccessBits::DEPTH_STENCIL_ATTACHMENT_WRITE,
        vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
    ),
    (AccessBits::COPY_SOURCE, vk::AccessFlags2::TRANSFER_READ),
    (AccessBits::COPY_DESTINATION, vk::AccessFlags2::TRANSFER_WRITE),
    (AccessBits::RESOLVE_SOURCE, vk::AccessFlags2::TRANSFER_READ),
    (AccessBits::RESOLVE_DESTINATION, vk::AccessFlags2::TRANSFER_WRITE),
    (
        AccessBits::ACCELERATION_STRUCTURE_READ,
        vk::AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR,
    ),
    (
        AccessBits::ACCELERATION_STRUCTURE_WRITE,
        vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR,
    ),
    (
        AccessBits::SHADING_RATE_ATTACHMENT,
        vk::AccessFlags2::FRAGMENT_SHADING_RATE_ATTACHMENT_READ_KHR,
    ),
];

pub fn access_to_vk(access: AccessBits) -> vk::AccessFlags2 {
    ACCESS_TABLE
        .iter()
        .filter(|(bit, _)| access.contains(*bit))
        .fold(vk::AccessFlags2::NONE, |acc, (_, vk_bit)| acc | *vk_bit)
}

const STAGE_TABLE: [(StageBits, vk::PipelineStageFlags2); 23] = [
    (StageBits::INDEX_INPUT, vk::PipelineStageFlags2::INDEX_INPUT),
    (StageBits::VERTEX_SHADER, vk::PipelineStageFlags2::VERTEX_SHADER),
    (
        StageBits::TESS_CONTROL_SHADER,
        vk::PipelineStageFlags2::TESSELLATION_CONTROL_SHADER,
    ),
    (
        StageBits::TESS_EVALUATION_SHADER,
        vk::PipelineStageFlags2::TESSELLATION_EVALUATION_SHADER,
    ),
    (StageBits::GEOMETRY_SHADER, vk::PipelineStageFlags2::GEOMETRY_SHADER),
    (StageBits::TASK_SHADER, vk::PipelineStageFlags2::TASK_SHADER_EXT),
    (StageBits::MESH_SHADER, vk::PipelineStageFlags2::MESH_SHADER_EXT),
    (StageBits::FRAGMENT_SHADER, vk::PipelineStageFlags2::FRAGMENT_SHADER),
    (
        StageBits::DEPTH_STENCIL_ATTACHMENT,
        vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS,
    ),
    (
        StageBits::DEPTH_STENCIL_ATTACHMENT,
        vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS,
    ),
    (
        StageBits::COLOR_ATTACHMENT,
        vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
    ),
    (StageBits::COMPUTE_SHADER, vk::PipelineStageFlags2::COMPUTE_SHADER),
    (StageBits::RAYGEN_SHADER, vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR),
    (StageBits::MISS_SHADER, vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR),
    (
        StageBits::INTERSECTION_SHADER,
        vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
    ),
    (
        StageBits::CLOSEST_HIT_SHADER,
        vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
    ),
    (StageBits::ANY_HIT_SHADER, vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR),
    (
        StageBits::CALLABLE_SHADER,
        vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
    ),
    (StageBits::INDIRECT, vk::PipelineStageFlags2::DRAW_INDIRECT),
    (StageBits::COPY, vk::PipelineStageFlags2::COPY),
    (StageBits::RESOLVE, vk::PipelineStageFlags2::RESOLVE),
    (StageBits::CLEAR_STORAGE, vk::PipelineStageFlags2::CLEAR),
    (
        StageBits::ACCELERATION_STRUCTURE,
        vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR,
    ),
];

/// Pipeline stages of a barrier or submission. `ALL` maps to `ALL_COMMANDS`.
pub fn stages_to_vk(stages: StageBits) -> vk::PipelineStageFlags2 {
    if stages == StageBits::ALL {
        return vk::PipelineStageFlags2::ALL_COMMANDS;
    }
    STAGE_TABLE
        .iter()
        .filter(|(bit, _)| stages.contains(*bit))
        .fold(vk::PipelineStageFlags2::NONE, |acc, (_, vk_bit)| acc | *vk_bit)
}

const SHADER_STAGE_TABLE: [(StageBits, vk::ShaderStageFlags); 14] = [
    (StageBits::VERTEX_SHADER, vk::ShaderStageFlags::VERTEX),
    (
        StageBits::TESS_CONTROL_SHADER,
        vk::ShaderStageFlags::TESSELLATION_CONTROL,
    ),
    (
        StageBits::TESS_EVALUATION_SHADER,
        vk::ShaderStageFlags::TESSELLATION_EVALUATION,
    ),
    (StageBits::GEOMETRY_SHADER, vk::ShaderStageFlags::GEOMETRY),
    (StageBits::TASK_SHADER, vk::ShaderStageFlags::TASK_EXT),
    (StageBits::MESH_SHADER, vk::ShaderStageFlags::MESH_EXT),
    (StageBits::FRAGMENT_SHADER, vk::ShaderStageFlags::FRAGMENT),
    (StageBits::COMPUTE_SHADER, vk::ShaderStageFlags::COMPUTE),
    (StageBits::RAYGEN_SHADER, vk::ShaderStageFlags::RAYGEN_KHR),
    (StageBits::MISS_SHADER, vk::ShaderStageFlags::MISS_KHR),
    (StageBits::INTERSECTION_SHADER, vk::ShaderStageFlags::INTERSECTION_KHR),
    (StageBits::CLOSEST_HIT_SHADER, vk::ShaderStageFlags::CLOSEST_HIT_KHR),
    (StageBits::ANY_HIT_SHADER, vk::ShaderStageFlags::ANY_HIT_KHR),
    (StageBits::CALLABLE_SHADER, vk::ShaderStageFlags::CALLABLE_KHR),
];

/// Shader stage mask. `ALL` (or no shader stage at all) maps to `ShaderStageFlags::ALL`.
pub fn shader_stages_to_vk(stages: StageBits) -> vk::ShaderStageFlags {
    if stages == StageBits::ALL || !stages.intersects(StageBits::ALL_SHADERS) {
        return vk::ShaderStageFlags::ALL;
    }
    SHADER_STAGE_TABLE
        .iter()
        .filter(|(bit, _)| stages.contains(*bit))
        .fold(vk::ShaderStageFlags::empty(), |acc, (_, vk_bit)| acc | *vk_bit)
}

pub fn topology_to_vk(topology: Topology) -> vk::PrimitiveTopology {
    match topology {
        Topology::PointList => vk::PrimitiveTopology::POINT_LIST,
        Topology::LineList => vk::PrimitiveTopology::LINE_LIST,
        Topology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        Topology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        Topology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        Topology::LineListWithAdjacency => vk::PrimitiveTopology::LINE_LIST_WITH_ADJACENCY,
        Topology::LineStripWithAdjacency => vk::PrimitiveTopology::LINE_STRIP_WITH_ADJACENCY,
        Topology::TriangleListWithAdjacency => {
            vk::PrimitiveTopology::TRIANGLE_LIST_WITH_ADJACENCY
        }
        Topology::TriangleStripWithAdjacency => {
            vk::PrimitiveTopology::TRIANGLE_STRIP_WITH_ADJACENCY
        }
        Topology::PatchList => vk::PrimitiveTopology::PATCH_LIST,
    }
}

pub fn fill_mode_to_vk(mode: FillMode) -> vk::PolygonMode {
    match mode {
        FillMode::Solid => vk::PolygonMode::FILL,
        FillMode::Wireframe => vk::PolygonMode::LINE,
    }
}

pub fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

/// `CompareFunc::None` becomes `NEVER`; callers disable the test separately.
pub fn compare_func_to_vk(func: CompareFunc) -> vk::CompareOp {
    match func {
        CompareFunc::None | CompareFunc::Never => vk::CompareOp::NEVER,
        CompareFunc::Always => vk::CompareOp::ALWAYS,
        CompareFunc::Equal => vk::CompareOp::EQUAL,
        CompareFunc::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareFunc::Less => vk::CompareOp::LESS,
        CompareFunc::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareFunc::Greater => vk::CompareOp::GREATER,
        CompareFunc::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
    }
}

pub fn stencil_func_to_vk(func: StencilFunc) -> vk::StencilOp {
    match func {
        StencilFunc::Keep => vk::StencilOp::KEEP,
        StencilFunc::Zero => vk::StencilOp::ZERO,
        StencilFunc::Replace => vk::StencilOp::REPLACE,
        StencilFunc::IncrementAndClamp => vk::StencilOp::INCREMENT_AND_CLAMP,
        StencilFunc::DecrementAndClamp => vk::StencilOp::DECREMENT_AND_CLAMP,
        StencilFunc::Invert => vk::StencilOp::INVERT,
        StencilFunc::IncrementAndWrap => vk::StencilOp::INCREMENT_AND_WRAP,
        StencilFunc::DecrementAndWrap => vk::StencilOp::DECREMENT_AND_WRAP,
    }
}

pub fn logic_func_to_vk(func: LogicFunc) -> vk::LogicOp {
    match func {
        LogicFunc::None | LogicFunc::Clear => vk::LogicOp::CLEAR,
        LogicFunc::And => vk::LogicOp::AND,
        LogicFunc::AndReverse => vk::LogicOp::AND_REVERSE,
        LogicFunc::Copy => vk::LogicOp::COPY,
        LogicFunc::AndInverted => vk::LogicOp::AND_INVERTED,
        LogicFunc::Xor => vk::LogicOp::XOR,
        LogicFunc::Or => vk::LogicOp::OR,
        LogicFunc::Nor => vk::LogicOp::NOR,
        LogicFunc::Equivalent => vk::LogicOp::EQUIVALENT,
        LogicFunc::Invert => vk::LogicOp::INVERT,
        LogicFunc::OrReverse => vk::LogicOp::OR_REVERSE,
        LogicFunc::CopyInverted => vk::LogicOp::COPY_INVERTED,
        LogicFunc::OrInverted => vk::LogicOp::OR_INVERTED,
        LogicFunc::Nand => vk::LogicOp::NAND,
        LogicFunc::Set => vk::LogicOp::SET,
    }
}

pub fn blend_factor_to_vk(factor: BlendFactor) -> vk::BlendFactor {
    match factor {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::SrcColor => vk::BlendFactor::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => vk::BlendFactor::DST_COLOR,
        BlendFactor::OneMinusDstColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        BlendFactor::ConstantColor => vk::BlendFactor::CONSTANT_COLOR,
        BlendFactor::OneMinusConstantColor => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
        BlendFactor::ConstantAlpha => vk::BlendFactor::CONSTANT_ALPHA,
        BlendFactor::OneMinusConstantAlpha => vk::BlendFactor::ONE_MINUS_CONSTANT_ALPHA,
        BlendFactor::SrcAlphaSaturate => vk::BlendFactor::SRC_ALPHA_SATURATE,
        BlendFactor::Src1Color => vk::BlendFactor::SRC1_COLOR,
        BlendFactor::OneMinusSrc1Color => vk::BlendFactor::ONE_MINUS_SRC1_COLOR,
        BlendFactor::Src1Alpha => vk::BlendFactor::SRC1_ALPHA,
        BlendFactor::OneMinusSrc1Alpha => vk::BlendFactor::ONE_MINUS_SRC1_ALPHA,
    }
}

pub fn blend_func_to_vk(func: BlendFunc) -> vk::BlendOp {
    match func {
        BlendFunc::Add => vk::BlendOp::ADD,
        BlendFunc::Subtract => vk::BlendOp::SUBTRACT,
        BlendFunc::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        BlendFunc::Min => vk::BlendOp::MIN,
        BlendFunc::Max => vk::BlendOp::MAX,
    }
}

/// NRI and Vulkan share the R, G, B, A bit order.
pub fn color_write_to_vk(mask: ColorWriteBits) -> vk::ColorComponentFlags {
    vk::ColorComponentFlags::from_raw(u32::from(mask.bits()))
}

pub fn filter_to_vk(filter: Filter) -> vk::Filter {
    match filter {
        Filter::Nearest => vk::Filter::NEAREST,
        Filter::Linear => vk::Filter::LINEAR,
    }
}

pub fn mip_filter_to_vk(filter: Filter) -> vk::SamplerMipmapMode {
    match filter {
        Filter::Nearest => vk::SamplerMipmapMode::NEAREST,
        Filter::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub fn reduction_mode_to_vk(mode: ReductionMode) -> vk::SamplerReductionMode {
    match mode {
        ReductionMode::Average => vk::SamplerReductionMode::WEIGHTED_AVERAGE,
        ReductionMode::Min => vk::SamplerReductionMode::MIN,
        ReductionMode::Max => vk::SamplerReductionMode::MAX,
    }
}

pub fn address_mode_to_vk(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        AddressMode::MirrorClampToEdge => vk::SamplerAddressMode::MIRROR_CLAMP_TO_EDGE,
    }
}

pub fn border_color_to_vk(color: BorderColor) -> vk::BorderColor {
    match color {
        BorderColor::FloatTransparentBlack => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
        BorderColor::FloatOpaqueBlack => vk::BorderColor::FLOAT_OPAQUE_BLACK,
        BorderColor::FloatOpaqueWhite => vk::BorderColor::FLOAT_OPAQUE_WHITE,
        BorderColor::IntTransparentBlack => vk::BorderColor::INT_TRANSPARENT_BLACK,
        BorderColor::IntOpaqueBlack => vk::BorderColor::INT_OPAQUE_BLACK,
        BorderColor::IntOpaqueWhite => vk::BorderColor::INT_OPAQUE_WHITE,
    }
}

pub fn descriptor_type_to_vk(descriptor_type: DescriptorType) -> vk::DescriptorType {
    match descriptor_type {
        DescriptorType::Sampler => vk::DescriptorType::SAMPLER,
        DescriptorType::ConstantBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        DescriptorType::Texture => vk::DescriptorType::SAMPLED_IMAGE,
        DescriptorType::StorageTexture => vk::DescriptorType::STORAGE_IMAGE,
        DescriptorType::Buffer => vk::DescriptorType::UNIFORM_TEXEL_BUFFER,
        DescriptorType::StorageBuffer => vk::DescriptorType::STORAGE_TEXEL_BUFFER,
        DescriptorType::StructuredBuffer | DescriptorType::StorageStructuredBuffer => {
            vk::DescriptorType::STORAGE_BUFFER
        }
        DescriptorType::AccelerationStructure => vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
    }
}

pub fn texture_type_to_vk(texture_type: TextureType) -> vk::ImageType {
    match texture_type {
        TextureType::Texture1D => vk::ImageType::TYPE_1D,
        TextureType::Texture2D => vk::ImageType::TYPE_2D,
        TextureType::Texture3D => vk::ImageType::TYPE_3D,
    }
}

pub fn view_type_1d_to_vk(view_type: Texture1DViewType) -> vk::ImageViewType {
    match view_type {
        Texture1DViewType::ShaderResource1DArray | Texture1DViewType::ShaderResourceStorage1DArray => {
            vk::ImageViewType::TYPE_1D_ARRAY
        }
        _ => vk::ImageViewType::TYPE_1D,
    }
}

pub fn view_type_2d_to_vk(view_type: Texture2DViewType) -> vk::ImageViewType {
    match view_type {
        Texture2DViewType::ShaderResource2DArray | Texture2DViewType::ShaderResourceStorage2DArray => {
            vk::ImageViewType::TYPE_2D_ARRAY
        }
        Texture2DViewType::ShaderResourceCube => vk::ImageViewType::CUBE,
        Texture2DViewType::ShaderResourceCubeArray => vk::ImageViewType::CUBE_ARRAY,
        _ => vk::ImageViewType::TYPE_2D,
    }
}

/// Color attachments of volume textures render into 2D slices.
pub fn view_type_3d_to_vk(view_type: Texture3DViewType) -> vk::ImageViewType {
    match view_type {
        Texture3DViewType::ColorAttachment => vk::ImageViewType::TYPE_2D_ARRAY,
        _ => vk::ImageViewType::TYPE_3D,
    }
}

const BUFFER_USAGE_TABLE: [(BufferUsageBits, vk::BufferUsageFlags); 12] = [
    (BufferUsageBits::SHADER_RESOURCE, vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER),
    (BufferUsageBits::SHADER_RESOURCE, vk::BufferUsageFlags::STORAGE_BUFFER),
    (
        BufferUsageBits::SHADER_RESOURCE_STORAGE,
        vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER,
    ),
    (BufferUsageBits::SHADER_RESOURCE_STORAGE, vk::BufferUsageFlags::STORAGE_BUFFER),
    (BufferUsageBits::VERTEX_BUFFER, vk::BufferUsageFlags::VERTEX_BUFFER),
    (BufferUsageBits::INDEX_BUFFER, vk::BufferUsageFlags::INDEX_BUFFER),
    (BufferUsageBits::CONSTANT_BUFFER, vk::BufferUsageFlags::UNIFORM_BUFFER),
    (BufferUsageBits::ARGUMENT_BUFFER, vk::BufferUsageFlags::INDIRECT_BUFFER),
    (BufferUsageBits::SCRATCH_BUFFER, vk::BufferUsageFlags::STORAGE_BUFFER),
    (
        BufferUsageBits::SHADER_BINDING_TABLE,
        vk::BufferUsageFlags::SHADER_BINDING_TABLE_KHR,
    ),
    (
        BufferUsageBits::ACCELERATION_STRUCTURE_BUILD_INPUT,
        vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR,
    ),
    (
        BufferUsageBits::ACCELERATION_STRUCTURE_STORAGE,
        vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR,
    ),
];

/// Buffers can always be copied and have a device address.
pub fn buffer_usage_to_vk(usage: BufferUsageBits) -> vk::BufferUsageFlags {
    BUFFER_USAGE_TABLE
        .iter()
        .filter(|(bit, _)| usage.contains(*bit))
        .fold(
            vk::BufferUsageFlags::TRANSFER_SRC
                | vk::BufferUsageFlags::TRANSFER_DST
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            |acc, (_, vk_bit)| acc | *vk_bit,
        )
}

/// Textures can always be copied.
pub fn texture_usage_to_vk(usage: TextureUsageBits) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST;
    if usage.contains(TextureUsageBits::SHADER_RESOURCE) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(TextureUsageBits::SHADER_RESOURCE_STORAGE) {
        flags |= vk::ImageUsageFlags::STORAGE;
    }
    if usage.contains(TextureUsageBits::COLOR_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(TextureUsageBits::DEPTH_STENCIL_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(TextureUsageBits::SHADING_RATE_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR;
    }
    flags
}

pub fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::Uint16 => vk::IndexType::UINT16,
        IndexType::Uint32 => vk::IndexType::UINT32,
    }
}

pub fn query_type_to_vk(query_type: QueryType) -> vk::QueryType {
    match query_type {
        QueryType::Timestamp | QueryType::TimestampCopyQueue => vk::QueryType::TIMESTAMP,
        QueryType::Occlusion => vk::QueryType::OCCLUSION,
        QueryType::PipelineStatistics => vk::QueryType::PIPELINE_STATISTICS,
        QueryType::AccelerationStructureSize => {
            vk::QueryType::ACCELERATION_STRUCTURE_SERIALIZATION_SIZE_KHR
        }
        QueryType::AccelerationStructureCompactedSize => {
            vk::QueryType::ACCELERATION_STRUCTURE_COMPACTED_SIZE_KHR
        }
    }
}

pub fn acceleration_structure_flags_to_vk(
    flags: AccelerationStructureBits,
) -> vk::BuildAccelerationStructureFlagsKHR {
    let mut out = vk::BuildAccelerationStructureFlagsKHR::empty();
    if flags.contains(AccelerationStructureBits::ALLOW_UPDATE) {
        out |= vk::BuildAccelerationStructureFlagsKHR::ALLOW_UPDATE;
    }
    if flags.contains(AccelerationStructureBits::ALLOW_COMPACTION) {
        out |= vk::BuildAccelerationStructureFlagsKHR::ALLOW_COMPACTION;
    }
    if flags.contains(AccelerationStructureBits::PREFER_FAST_TRACE) {
        out |= vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE;
    }
    if flags.contains(AccelerationStructureBits::PREFER_FAST_BUILD) {
        out |= vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_BUILD;
    }
    if flags.contains(AccelerationStructureBits::MINIMIZE_MEMORY) {
        out |= vk::BuildAccelerationStructureFlagsKHR::LOW_MEMORY;
    }
    out
}

pub fn geometry_flags_to_vk(flags: BottomLevelGeometryBits) -> vk::GeometryFlagsKHR {
    let mut out = vk::GeometryFlagsKHR::empty();
    if flags.contains(BottomLevelGeometryBits::OPAQUE_GEOMETRY) {
        out |= vk::GeometryFlagsKHR::OPAQUE;
    }
    if flags.contains(BottomLevelGeometryBits::NO_DUPLICATE_ANY_HIT_INVOCATION) {
        out |= vk::GeometryFlagsKHR::NO_DUPLICATE_ANY_HIT_INVOCATION;
    }
    out
}

/// Sample counts are single bits equal to the count; anything else is one sample.
pub fn sample_count_to_vk(sample_num: u32) -> vk::SampleCountFlags {
    if sample_num.is_power_of_two() && sample_num <= 64 {
        vk::SampleCountFlags::from_raw(sample_num)
    } else {
        vk::SampleCountFlags::TYPE_1
    }
}

/// Highest sample count set in `flags`.
pub fn max_sample_count(flags: vk::SampleCountFlags) -> u32 {
    let raw = flags.as_raw();
    if raw == 0 {
        1
    } else {
        1 << (31 - raw.leading_zeros())
    }
}
