//! Adapter and device descriptions.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Native API a device forwards to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphicsApi {
    #[default]
    None,
    D3D11,
    D3D12,
    Vk,
}

/// GPU vendor identification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vendor {
    #[default]
    Unknown,
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl Vendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0 => Self::Unknown,
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// Memory architecture of an adapter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    #[default]
    Unknown,
    /// CPU and GPU share memory.
    Integrated,
    /// The GPU has its own memory.
    Descrete,
}

/// Queue types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueueType {
    Graphics,
    Compute,
    Copy,
}

impl QueueType {
    pub const COUNT: usize = 3;
    pub const ALL: [Self; Self::COUNT] = [Self::Graphics, Self::Compute, Self::Copy];
}

/// Description of a physical adapter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterDesc {
    pub name: String,
    pub luid: u64,
    pub video_memory_size: u64,
    pub system_memory_size: u64,
    pub device_id: u32,
    pub vendor: Vendor,
    pub architecture: Architecture,
}

impl AdapterDesc {
    /// Human-readable one-liner.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}, {:?}) - {} MB VRAM",
            self.name,
            self.vendor,
            self.architecture,
            self.video_memory_size / (1024 * 1024)
        )
    }
}

bitflags! {
    /// Optional capabilities of a device.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        const SWAP_CHAIN = 1 << 0;
        const RAY_TRACING = 1 << 1;
        const MESH_SHADER = 1 << 2;
        const PUSH_DESCRIPTORS = 1 << 3;
        const DRAW_INDIRECT_COUNT = 1 << 4;
        const INDEPENDENT_FRONT_AND_BACK_STENCIL = 1 << 5;
        const LINE_SMOOTHING = 1 << 6;
        const COPY_QUEUE_TIMESTAMP = 1 << 7;
        const MEMORY_BUDGET = 1 << 8;
        const DEPTH_BOUNDS_TEST = 1 << 9;
        const TEXTURE_FILTER_MIN_MAX = 1 << 10;
        const LOGIC_OP = 1 << 11;
        const ENHANCED_BARRIERS = 1 << 12;
        const BUFFER_DEVICE_ADDRESS = 1 << 13;
        const DESCRIPTOR_INDEXING = 1 << 14;
        const GEOMETRY_SHADER = 1 << 15;
        const TESSELLATION = 1 << 16;
        const SHADER_FLOAT16 = 1 << 17;
        const SHADER_INT64 = 1 << 18;
    }
}

/// Hardware limits and capabilities of a created device.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceDesc {
    pub adapter_desc: AdapterDesc,
    pub graphics_api: GraphicsApi,
    pub nri_version_major: u16,
    pub nri_version_minor: u16,
    /// Native API version, e.g. `(1, 3)`.
    pub api_version: (u32, u32),

    /// Number of queues available per `QueueType`, indexed by `QueueType as usize`.
    pub queue_num: [u32; QueueType::COUNT],

    // Viewports
    pub viewport_max_num: u32,
    pub viewport_bounds_range: [i32; 2],

    // Attachments
    pub attachment_max_dim: u32,
    pub attachment_layer_max_num: u32,
    pub color_attachment_max_num: u32,

    // Multi-sampling
    pub color_sample_max_num: u32,
    pub depth_sample_max_num: u32,
    pub stencil_sample_max_num: u32,
    pub zero_attachments_sample_max_num: u32,
    pub texture_color_sample_max_num: u32,
    pub texture_integer_sample_max_num: u32,
    pub texture_depth_sample_max_num: u32,
    pub texture_stencil_sample_max_num: u32,
    pub storage_texture_sample_max_num: u32,

    // Resource dimensions
    pub texture_1d_max_dim: u32,
    pub texture_2d_max_dim: u32,
    pub texture_3d_max_dim: u32,
    pub texture_array_layer_max_num: u32,
    pub typed_buffer_max_dim: u32,

    // Memory
    pub device_upload_heap_size: u64,
    pub memory_allocation_max_num: u32,
    pub sampler_allocation_max_num: u32,
    pub constant_buffer_max_range: u32,
    pub storage_buffer_max_range: u32,
    pub buffer_texture_granularity: u64,
    pub buffer_max_size: u64,

    // Alignment
    pub upload_buffer_texture_row_alignment: u32,
    pub upload_buffer_texture_slice_alignment: u32,
    pub buffer_shader_resource_offset_alignment: u32,
    pub constant_buffer_offset_alignment: u32,
    pub scratch_buffer_offset_alignment: u32,
    pub shader_binding_table_alignment: u32,

    // Pipeline layout
    pub pipeline_layout_descriptor_set_max_num: u32,
    pub pipeline_layout_root_constant_max_size: u32,
    pub pipeline_layout_root_descriptor_max_num: u32,

    // Descriptor sets
    pub descriptor_set_sampler_max_num: u32,
    pub descriptor_set_constant_buffer_max_num: u32,
    pub descriptor_set_storage_buffer_max_num: u32,
    pub descriptor_set_texture_max_num: u32,
    pub descriptor_set_storage_texture_max_num: u32,

    // Per-stage resources
    pub per_stage_descriptor_sampler_max_num: u32,
    pub per_stage_descriptor_constant_buffer_max_num: u32,
    pub per_stage_descriptor_storage_buffer_max_num: u32,
    pub per_stage_descriptor_texture_max_num: u32,
    pub per_stage_descriptor_storage_texture_max_num: u32,
    pub per_stage_resource_max_num: u32,

    // Vertex shader
    pub vertex_shader_attribute_max_num: u32,
    pub vertex_shader_stream_max_num: u32,
    pub vertex_shader_output_component_max_num: u32,

    // Fragment shader
    pub fragment_shader_input_component_max_num: u32,
    pub fragment_shader_output_attachment_max_num: u32,

    // Compute shader
    pub compute_shader_shared_memory_max_size: u32,
    pub compute_shader_work_group_max_num: [u32; 3],
    pub compute_shader_work_group_invocation_max_num: u32,
    pub compute_shader_work_group_max_dim: [u32; 3],

    // Ray tracing
    pub ray_tracing_shader_group_identifier_size: u32,
    pub ray_tracing_shader_table_max_stride: u32,
    pub ray_tracing_shader_recursion_max_depth: u32,
    pub ray_tracing_geometry_object_max_num: u32,

    // Mesh shaders
    pub mesh_control_shared_memory_max_size: u32,
    pub mesh_control_work_group_invocation_max_num: u32,
    pub mesh_control_payload_max_size: u32,
    pub mesh_evaluation_output_vertices_max_num: u32,
    pub mesh_evaluation_output_primitive_max_num: u32,
    pub mesh_evaluation_output_component_max_num: u32,
    pub mesh_evaluation_shared_memory_max_size: u32,
    pub mesh_evaluation_work_group_invocation_max_num: u32,

    // Precision
    pub viewport_precision_bits: u32,
    pub sub_pixel_precision_bits: u32,
    pub sub_texel_precision_bits: u32,
    pub mipmap_precision_bits: u32,

    // Timing
    pub timestamp_frequency_hz: u64,
    pub draw_indirect_max_num: u32,

    // Sampler
    pub sampler_lod_bias_min: f32,
    pub sampler_lod_bias_max: f32,
    pub sampler_anisotropy_max: f32,

    // Clip / cull
    pub texel_offset_min: i32,
    pub texel_offset_max: u32,
    pub texel_gather_offset_min: i32,
    pub texel_gather_offset_max: u32,
    pub clip_distance_max_num: u32,
    pub cull_distance_max_num: u32,
    pub combined_clip_and_cull_distance_max_num: u32,

    pub features: Features,
}

impl DeviceDesc {
    /// Check a feature bit.
    pub fn supports(&self, features: Features) -> bool {
        self.features.contains(features)
    }

    /// Number of queues of a type.
    pub fn queues(&self, queue_type: QueueType) -> u32 {
        self.queue_num[queue_type as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_identification() {
        assert_eq!(Vendor::from_vendor_id(0x10DE), Vendor::Nvidia);
        assert_eq!(Vendor::from_vendor_id(0x1002), Vendor::Amd);
        assert_eq!(Vendor::from_vendor_id(0x8086), Vendor::Intel);
        assert_eq!(Vendor::from_vendor_id(0), Vendor::Unknown);
        assert_eq!(Vendor::from_vendor_id(0x5143), Vendor::Other(0x5143));
    }

    #[test]
    fn queue_lookup() {
        let desc = DeviceDesc {
            queue_num: [1, 2, 0],
            features: Features::RAY_TRACING | Features::SWAP_CHAIN,
            ..Default::default()
        };
        assert_eq!(desc.queues(QueueType::Compute), 2);
        assert_eq!(desc.queues(QueueType::Copy), 0);
        assert!(desc.supports(Features::RAY_TRACING));
        assert!(!desc.supports(Features::MESH_SHADER | Features::RAY_TRACING));
    }
}
