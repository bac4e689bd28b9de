//! `DeviceDesc` from physical device properties.

use ash::vk;
use nri_core::{AdapterDesc, DeviceDesc, Features, GraphicsApi, QueueType};

use crate::conversions::max_sample_count;

/// Properties queried at device creation. Extension structs are present only
/// when the extension is enabled.
#[derive(Default)]
pub(crate) struct DeviceProperties {
    pub core: vk::PhysicalDeviceProperties,
    pub vulkan11: vk::PhysicalDeviceVulkan11Properties<'static>,
    pub push_descriptor: Option<vk::PhysicalDevicePushDescriptorPropertiesKHR<'static>>,
    pub acceleration_structure:
        Option<vk::PhysicalDeviceAccelerationStructurePropertiesKHR<'static>>,
    pub ray_tracing: Option<vk::PhysicalDeviceRayTracingPipelinePropertiesKHR<'static>>,
    pub mesh_shader: Option<vk::PhysicalDeviceMeshShaderPropertiesEXT<'static>>,
}

fn timestamp_frequency(period_ns: f32) -> u64 {
    if period_ns > 0.0 {
        (1.0e9 / f64::from(period_ns)) as u64
    } else {
        0
    }
}

pub(crate) fn fill_device_desc(
    props: &DeviceProperties,
    adapter_desc: AdapterDesc,
    features: Features,
    queue_num: [u32; QueueType::COUNT],
    device_upload_heap_size: u64,
) -> DeviceDesc {
    let core = &props.core;
    let l = &core.limits;

    let mut desc = DeviceDesc {
        adapter_desc,
        graphics_api: GraphicsApi::Vk,
        nri_version_major: nri_core::NRI_VERSION_MAJOR,
        nri_version_minor: nri_core::NRI_VERSION_MINOR,
        api_version: (
            vk::api_version_major(core.api_version),
            vk::api_version_minor(core.api_version),
        ),
        queue_num,

        viewport_max_num: l.max_viewports,
        viewport_bounds_range: [l.viewport_bounds_range[0] as i32, l.viewport_bounds_range[1] as i32],

        attachment_max_dim: l.max_framebuffer_width.min(l.max_framebuffer_height),
        attachment_layer_max_num: l.max_framebuffer_layers,
        color_attachment_max_num: l.max_color_attachments,

        color_sample_max_num: max_sample_count(l.framebuffer_color_sample_counts),
        depth_sample_max_num: max_sample_count(l.framebuffer_depth_sample_counts),
        stencil_sample_max_num: max_sample_count(l.framebuffer_stencil_sample_counts),
        zero_attachments_sample_max_num: max_sample_count(
            l.framebuffer_no_attachments_sample_counts,
        ),
        texture_color_sample_max_num: max_sample_count(l.sampled_image_color_sample_counts),
        texture_integer_sample_max_num: max_sample_count(l.sampled_image_integer_sample_counts),
        texture_depth_sample_max_num: max_sample_count(l.sampled_image_depth_sample_counts),
        texture_stencil_sample_max_num: max_sample_count(l.sampled_image_stencil_sample_counts),
        storage_texture_sample_max_num: max_sample_count(l.storage_image_sample_counts),

        texture_1d_max_dim: l.max_image_dimension1_d,
        texture_2d_max_dim: l.max_image_dimension2_d,
        texture_3d_max_dim: l.max_image_dimension3_d,
        texture_array_layer_max_num: l.max_image_array_layers,
        typed_buffer_max_dim: l.max_texel_buffer_elements,

        device_upload_heap_size,
        memory_allocation_max_num: l.max_memory_allocation_count,
        sampler_allocation_max_num: l.max_sampler_allocation_count,
        constant_buffer_max_range: l.max_uniform_buffer_range,
        storage_buffer_max_range: l.max_storage_buffer_range,
        buffer_texture_granularity: l.buffer_image_granularity,
        buffer_max_size: props.vulkan11.max_memory_allocation_size,

        upload_buffer_texture_row_alignment: l.optimal_buffer_copy_row_pitch_alignment.max(1)
            as u32,
        upload_buffer_texture_slice_alignment: l.optimal_buffer_copy_offset_alignment.max(1)
            as u32,
        buffer_shader_resource_offset_alignment: l
            .min_texel_buffer_offset_alignment
            .max(l.min_storage_buffer_offset_alignment)
            as u32,
        constant_buffer_offset_alignment: l.min_uniform_buffer_offset_alignment as u32,

        pipeline_layout_descriptor_set_max_num: l.max_bound_descriptor_sets,
        pipeline_layout_root_constant_max_size: l.max_push_constants_size,
        pipeline_layout_root_descriptor_max_num: props
            .push_descriptor
            .map_or(0, |p| p.max_push_descriptors),

        descriptor_set_sampler_max_num: l.max_descriptor_set_samplers,
        descriptor_set_constant_buffer_max_num: l.max_descriptor_set_uniform_buffers,
        descriptor_set_storage_buffer_max_num: l.max_descriptor_set_storage_buffers,
        descriptor_set_texture_max_num: l.max_descriptor_set_sampled_images,
        descriptor_set_storage_texture_max_num: l.max_descriptor_set_storage_images,

        per_stage_descriptor_sampler_max_num: l.max_per_stage_descriptor_samplers,
        per_stage_descriptor_constant_buffer_max_num: l.max_per_stage_descriptor_uniform_buffers,
        per_stage_descriptor_storage_buffer_max_num: l.max_per_stage_descriptor_storage_buffers,
        per_stage_descriptor_texture_max_num: l.max_per_stage_descriptor_sampled_images,
        per_stage_descriptor_storage_texture_max_num: l.max_per_stage_descriptor_storage_images,
        per_stage_resource_max_num: l.max_per_stage_resources,

        vertex_shader_attribute_max_num: l.max_vertex_input_attributes,
        vertex_shader_stream_max_num: l.max_vertex_input_bindings,
        vertex_shader_output_component_max_num: l.max_vertex_output_components,

        fragment_shader_input_component_max_num: l.max_fragment_input_components,
        fragment_shader_output_attachment_max_num: l.max_fragment_output_attachments,

        compute_shader_shared_memory_max_size: l.max_compute_shared_memory_size,
        compute_shader_work_group_max_num: l.max_compute_work_group_count,
        compute_shader_work_group_invocation_max_num: l.max_compute_work_group_invocations,
        compute_shader_work_group_max_dim: l.max_compute_work_group_size,

        viewport_precision_bits: l.viewport_sub_pixel_bits,
        sub_pixel_precision_bits: l.sub_pixel_precision_bits,
        sub_texel_precision_bits: l.sub_texel_precision_bits,
        mipmap_precision_bits: l.mipmap_precision_bits,

        timestamp_frequency_hz: timestamp_frequency(l.timestamp_period),
        draw_indirect_max_num: l.max_draw_indirect_count,

        sampler_lod_bias_min: -l.max_sampler_lod_bias,
        sampler_lod_bias_max: l.max_sampler_lod_bias,
        sampler_anisotropy_max: l.max_sampler_anisotropy,

        texel_offset_min: l.min_texel_offset,
        texel_offset_max: l.max_texel_offset,
        texel_gather_offset_min: l.min_texel_gather_offset,
        texel_gather_offset_max: l.max_texel_gather_offset,
        clip_distance_max_num: l.max_clip_distances,
        cull_distance_max_num: l.max_cull_distances,
        combined_clip_and_cull_distance_max_num: l.max_combined_clip_and_cull_distances,

        features,
        ..Default::default()
    };

    if let Some(accel) = &props.acceleration_structure {
        desc.scratch_buffer_offset_alignment =
            accel.min_acceleration_structure_scratch_offset_alignment;
        desc.ray_tracing_geometry_object_max_num =
            u32::try_from(accel.max_geometry_count).unwrap_or(u32::MAX);
    }
    if let Some(rt) = &props.ray_tracing {
        desc.shader_binding_table_alignment = rt.shader_group_base_alignment;
        desc.ray_tracing_shader_group_identifier_size = rt.shader_group_handle_size;
        desc.ray_tracing_shader_table_max_stride = rt.max_shader_group_stride;
        desc.ray_tracing_shader_recursion_max_depth = rt.max_ray_recursion_depth;
    }
    if let Some(mesh) = &props.mesh_shader {
        desc.mesh_control_shared_memory_max_size = mesh.max_task_shared_memory_size;
        desc.mesh_control_work_group_invocation_max_num = mesh.max_task_work_group_invocations;
        desc.mesh_control_payload_max_size = mesh.max_task_payload_size;
        desc.mesh_evaluation_output_vertices_max_num = mesh.max_mesh_output_vertices;
        desc.mesh_evaluation_output_primitive_max_num = mesh.max_mesh_output_primitives;
        desc.mesh_evaluation_output_component_max_num = mesh.max_mesh_output_components;
        desc.mesh_evaluation_shared_memory_max_size = mesh.max_mesh_shared_memory_size;
        desc.mesh_evaluation_work_group_invocation_max_num = mesh.max_mesh_work_group_invocations;
    }
    desc
}

/// Optional capabilities reported by the core and 1.2 feature structs.
pub(crate) fn core_features(
    core: &vk::PhysicalDeviceFeatures,
    vulkan12: &vk::PhysicalDeviceVulkan12Features<'_>,
) -> Features {
    let mut features = Features::ENHANCED_BARRIERS | Features::INDEPENDENT_FRONT_AND_BACK_STENCIL;
    let mut set = |flag: Features, supported: vk::Bool32| {
        if supported == vk::TRUE {
            features |= flag;
        }
    };
    set(Features::DEPTH_BOUNDS_TEST, core.depth_bounds);
    set(Features::LOGIC_OP, core.logic_op);
    set(Features::GEOMETRY_SHADER, core.geometry_shader);
    set(Features::TESSELLATION, core.tessellation_shader);
    set(Features::SHADER_INT64, core.shader_int64);
    set(Features::DRAW_INDIRECT_COUNT, vulkan12.draw_indirect_count);
    set(Features::TEXTURE_FILTER_MIN_MAX, vulkan12.sampler_filter_minmax);
    set(Features::BUFFER_DEVICE_ADDRESS, vulkan12.buffer_device_address);
    set(Features::DESCRIPTOR_INDEXING, vulkan12.descriptor_indexing);
    set(Features::SHADER_FLOAT16, vulkan12.shader_float16);
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties() -> DeviceProperties {
        let mut props = DeviceProperties::default();
        props.core.api_version = vk::make_api_version(0, 1, 3, 280);
        let l = &mut props.core.limits;
        l.max_framebuffer_width = 16384;
        l.max_framebuffer_height = 8192;
        l.framebuffer_color_sample_counts =
            vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_4 | vk::SampleCountFlags::TYPE_8;
        l.optimal_buffer_copy_row_pitch_alignment = 0;
        l.optimal_buffer_copy_offset_alignment = 4;
        l.min_texel_buffer_offset_alignment = 16;
        l.min_storage_buffer_offset_alignment = 64;
        l.timestamp_period = 1.0;
        l.max_sampler_lod_bias = 15.0;
        l.max_push_constants_size = 256;
        props
    }

    #[test]
    fn limits_are_translated() {
        let desc = fill_device_desc(
            &properties(),
            AdapterDesc::default(),
            Features::SWAP_CHAIN,
            [1, 1, 1],
            256 << 20,
        );
        assert_eq!(desc.graphics_api, GraphicsApi::Vk);
        assert_eq!(desc.api_version, (1, 3));
        assert_eq!(desc.attachment_max_dim, 8192);
        assert_eq!(desc.color_sample_max_num, 8);
        assert_eq!(desc.upload_buffer_texture_row_alignment, 1);
        assert_eq!(desc.upload_buffer_texture_slice_alignment, 4);
        assert_eq!(desc.buffer_shader_resource_offset_alignment, 64);
        assert_eq!(desc.timestamp_frequency_hz, 1_000_000_000);
        assert_eq!(desc.sampler_lod_bias_min, -15.0);
        assert_eq!(desc.pipeline_layout_root_constant_max_size, 256);
        assert_eq!(desc.pipeline_layout_root_descriptor_max_num, 0);
        assert_eq!(desc.device_upload_heap_size, 256 << 20);
        assert!(desc.supports(Features::SWAP_CHAIN));
    }

    #[test]
    fn extension_limits_need_the_extension() {
        let mut props = properties();
        let desc = fill_device_desc(&props, AdapterDesc::default(), Features::empty(), [1, 0, 0], 0);
        assert_eq!(desc.ray_tracing_shader_group_identifier_size, 0);
        assert_eq!(desc.mesh_evaluation_output_vertices_max_num, 0);

        props.ray_tracing = Some(
            vk::PhysicalDeviceRayTracingPipelinePropertiesKHR::default()
                .shader_group_handle_size(32)
                .shader_group_base_alignment(64)
                .max_ray_recursion_depth(31),
        );
        props.mesh_shader =
            Some(vk::PhysicalDeviceMeshShaderPropertiesEXT::default().max_mesh_output_vertices(256));
        let desc = fill_device_desc(&props, AdapterDesc::default(), Features::empty(), [1, 0, 0], 0);
        assert_eq!(desc.ray_tracing_shader_group_identifier_size, 32);
        assert_eq!(desc.shader_binding_table_alignment, 64);
        assert_eq!(desc.ray_tracing_shader_recursion_max_depth, 31);
        assert_eq!(desc.mesh_evaluation_output_vertices_max_num, 256);
    }

    #[test]
    fn feature_bits() {
        let core = vk::PhysicalDeviceFeatures::default()
            .geometry_shader(true)
            .shader_int64(true);
        let vulkan12 = vk::PhysicalDeviceVulkan12Features::default()
            .draw_indirect_count(true)
            .buffer_device_address(true);
        let features = core_features(&core, &vulkan12);
        assert!(features.contains(
            Features::GEOMETRY_SHADER
                | Features::SHADER_INT64
                | Features::DRAW_INDIRECT_COUNT
                | Features::BUFFER_DEVICE_ADDRESS
                | Features::ENHANCED_BARRIERS
        ));
        assert!(!features.intersects(Features::TESSELLATION | Features::LOGIC_OP));
    }

    #[test]
    fn zero_timestamp_period() {
        assert_eq!(timestamp_frequency(0.0), 0);
        assert_eq!(timestamp_frequency(52.08), 19_201_228);
    }
}
