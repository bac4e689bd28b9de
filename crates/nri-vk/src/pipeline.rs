//! Graphics, compute and ray tracing pipelines.

use std::ffi::CString;
use std::io::Cursor;

use ash::vk;
use nri_core::{
    CompareFunc, ComputePipelineDesc, Error, Features, Format, GraphicsPipelineDesc, LogicFunc,
    OutputMergerDesc, PrimitiveRestart, RayTracingPipelineDesc, Result, ShaderDesc,
    ShaderGroupDesc, StageBits, StencilDesc, Topology, VertexInputDesc, VertexStreamStepRate,
};
use tracing::debug;

use crate::conversions::{
    blend_factor_to_vk, blend_func_to_vk, color_write_to_vk, compare_func_to_vk,
    cull_mode_to_vk, fill_mode_to_vk, format_to_vk, logic_func_to_vk, sample_count_to_vk,
    shader_stages_to_vk, stencil_func_to_vk, topology_to_vk,
};
use crate::device::DeviceVk;
use crate::error::VkResultExt;
use crate::Vulkan;

#[derive(Debug)]
pub struct PipelineVk {
    pub(crate) handle: vk::Pipeline,
    pub(crate) bind_point: vk::PipelineBindPoint,
    /// Shader groups of a ray tracing pipeline.
    pub(crate) group_num: u32,
}

impl PipelineVk {
    pub fn handle(&self) -> vk::Pipeline {
        self.handle
    }
}

/// Shader modules of one pipeline build, destroyed when the build is done.
struct ShaderModules<'a> {
    device: &'a ash::Device,
    modules: Vec<vk::ShaderModule>,
    names: Vec<CString>,
}

impl<'a> ShaderModules<'a> {
    fn new(device: &'a ash::Device) -> Self {
        Self {
            device,
            modules: Vec::new(),
            names: Vec::new(),
        }
    }

    fn load(&mut self, shaders: &[ShaderDesc<'_>]) -> Result<()> {
        for shader in shaders {
            let code = ash::util::read_spv(&mut Cursor::new(shader.bytecode))
                .map_err(|e| Error::invalid(format!("shader bytecode is not SPIR-V: {e}")))?;
            let info = vk::ShaderModuleCreateInfo::default().code(&code);
            let module = unsafe { self.device.create_shader_module(&info, None) }
                .or_nri("vkCreateShaderModule")?;
            self.modules.push(module);
            self.names.push(entry_point(shader.entry_point)?);
        }
        Ok(())
    }

    fn stages(&self, shaders: &[ShaderDesc<'_>]) -> Vec<vk::PipelineShaderStageCreateInfo<'_>> {
        shaders
            .iter()
            .zip(&self.modules)
            .zip(&self.names)
            .map(|((shader, module), name)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stages_to_vk(shader.stage))
                    .module(*module)
                    .name(name)
            })
            .collect()
    }
}

impl Drop for ShaderModules<'_> {
    fn drop(&mut self) {
        for module in self.modules.drain(..) {
            unsafe { self.device.destroy_shader_module(module, None) };
        }
    }
}

fn entry_point(name: &str) -> Result<CString> {
    let name = if name.is_empty() { "main" } else { name };
    CString::new(name).map_err(|_| Error::invalid("shader entry point contains a NUL byte"))
}

/// Vertex bindings and attributes; attributes find their binding through the stream.
pub(crate) fn vertex_input(
    input: &VertexInputDesc<'_>,
) -> Result<(
    Vec<vk::VertexInputBindingDescription>,
    Vec<vk::VertexInputAttributeDescription>,
)> {
    let bindings = input
        .streams
        .iter()
        .map(|s| vk::VertexInputBindingDescription {
            binding: u32::from(s.binding_slot),
            stride: u32::from(s.stride),
            input_rate: match s.step_rate {
                VertexStreamStepRate::PerVertex => vk::VertexInputRate::VERTEX,
                VertexStreamStepRate::PerInstance => vk::VertexInputRate::INSTANCE,
            },
        })
        .collect();
    let attributes = input
        .attributes
        .iter()
        .map(|a| {
            let stream = input.streams.get(usize::from(a.stream_index)).ok_or_else(|| {
                Error::invalid(format!(
                    "attribute at location {} uses missing stream {}",
                    a.location, a.stream_index
                ))
            })?;
            Ok(vk::VertexInputAttributeDescription {
                location: a.location,
                binding: u32::from(stream.binding_slot),
                format: format_to_vk(a.format),
                offset: a.offset,
            })
        })
        .collect::<Result<_>>()?;
    Ok((bindings, attributes))
}

pub(crate) fn stencil_state(desc: &StencilDesc) -> vk::StencilOpState {
    vk::StencilOpState {
        fail_op: stencil_func_to_vk(desc.fail),
        pass_op: stencil_func_to_vk(desc.pass),
        depth_fail_op: stencil_func_to_vk(desc.depth_fail),
        compare_op: compare_func_to_vk(desc.compare_func),
        compare_mask: u32::from(desc.compare_mask),
        write_mask: u32::from(desc.write_mask),
        reference: 0,
    }
}

pub(crate) fn depth_stencil_state(om: &OutputMergerDesc<'_>) -> vk::PipelineDepthStencilStateCreateInfo<'static> {
    let stencil_test = om.stencil.front.compare_func != CompareFunc::None
        || om.stencil.back.compare_func != CompareFunc::None;
    vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(om.depth.compare_func != CompareFunc::None)
        .depth_write_enable(om.depth.write)
        .depth_compare_op(compare_func_to_vk(om.depth.compare_func))
        .depth_bounds_test_enable(om.depth.bounds_test)
        .stencil_test_enable(stencil_test)
        .front(stencil_state(&om.stencil.front))
        .back(stencil_state(&om.stencil.back))
        .min_depth_bounds(0.0)
        .max_depth_bounds(1.0)
}

/// Attachment formats for dynamic rendering: colours, depth and stencil.
pub(crate) fn rendering_formats(om: &OutputMergerDesc<'_>) -> (Vec<vk::Format>, vk::Format, vk::Format) {
    let colors = om.colors.iter().map(|c| format_to_vk(c.format)).collect();
    let ds = om.depth_stencil_format;
    let native = format_to_vk(ds);
    let depth = if ds != Format::Unknown && ds.is_depth() {
        native
    } else {
        vk::Format::UNDEFINED
    };
    let stencil = if ds != Format::Unknown && ds.is_stencil() {
        native
    } else {
        vk::Format::UNDEFINED
    };
    (colors, depth, stencil)
}

pub(crate) fn dynamic_states(om: &OutputMergerDesc<'_>) -> Vec<vk::DynamicState> {
    let mut states = vec![
        vk::DynamicState::VIEWPORT_WITH_COUNT,
        vk::DynamicState::SCISSOR_WITH_COUNT,
        vk::DynamicState::STENCIL_REFERENCE,
        vk::DynamicState::BLEND_CONSTANTS,
    ];
    if om.depth.bounds_test {
        states.push(vk::DynamicState::DEPTH_BOUNDS);
    }
    states
}

/// Ray tracing shader groups from 1-based library indices.
///
/// A group whose only shader is a raygen, miss or callable shader is a general
/// group. Anything else is a hit group, procedural when it has an intersection shader.
pub(crate) fn shader_groups(
    library: &[StageBits],
    groups: &[ShaderGroupDesc],
) -> Result<Vec<vk::RayTracingShaderGroupCreateInfoKHR<'static>>> {
    const GENERAL: StageBits = StageBits::RAYGEN_SHADER
        .union(StageBits::MISS_SHADER)
        .union(StageBits::CALLABLE_SHADER);

    groups
        .iter()
        .map(|group| {
            let mut info = vk::RayTracingShaderGroupCreateInfoKHR::default()
                .general_shader(vk::SHADER_UNUSED_KHR)
                .closest_hit_shader(vk::SHADER_UNUSED_KHR)
                .any_hit_shader(vk::SHADER_UNUSED_KHR)
                .intersection_shader(vk::SHADER_UNUSED_KHR)
                .ty(vk::RayTracingShaderGroupTypeKHR::TRIANGLES_HIT_GROUP);
            let mut any = false;
            for &index in group.shader_indices.iter().filter(|&&i| i != 0) {
                let shader = index - 1;
                let stage = *library.get(shader as usize).ok_or_else(|| {
                    Error::invalid(format!("shader group references missing shader {index}"))
                })?;
                any = true;
                if stage.intersects(GENERAL) {
                    info = info
                        .ty(vk::RayTracingShaderGroupTypeKHR::GENERAL)
                        .general_shader(shader);
                } else if stage.contains(StageBits::CLOSEST_HIT_SHADER) {
                    info = info.closest_hit_shader(shader);
                } else if stage.contains(StageBits::ANY_HIT_SHADER) {
                    info = info.any_hit_shader(shader);
                } else if stage.contains(StageBits::INTERSECTION_SHADER) {
                    info = info
                        .ty(vk::RayTracingShaderGroupTypeKHR::PROCEDURAL_HIT_GROUP)
                        .intersection_shader(shader);
                } else {
                    return Err(Error::invalid(format!(
                        "shader {index} is not a ray tracing shader"
                    )));
                }
            }
            if !any {
                return Err(Error::invalid("shader group has no shaders"));
            }
            Ok(info)
        })
        .collect()
}

fn first_pipeline(
    result: std::result::Result<Vec<vk::Pipeline>, (Vec<vk::Pipeline>, vk::Result)>,
    context: &str,
) -> Result<vk::Pipeline> {
    let pipelines = result.map_err(|(_, e)| e).or_nri(context)?;
    pipelines
        .into_iter()
        .next()
        .ok_or_else(|| Error::failure(format!("{context} returned no pipeline")))
}

impl DeviceVk {
    pub(crate) fn create_graphics_pipeline_impl(
        &self,
        desc: &GraphicsPipelineDesc<'_, Vulkan>,
    ) -> Result<PipelineVk> {
        let om = &desc.output_merger;
        let raster = &desc.rasterization;
        if raster.line_smoothing {
            self.require(Features::LINE_SMOOTHING, "line smoothing")?;
        }
        if raster.conservative_raster {
            return Err(Error::unsupported("conservative rasterization"));
        }
        if om.depth.bounds_test {
            self.require(Features::DEPTH_BOUNDS_TEST, "depth bounds test")?;
        }
        if om.logic_func != LogicFunc::None {
            self.require(Features::LOGIC_OP, "logic operations")?;
        }

        let mut modules = ShaderModules::new(&self.shared.device);
        modules.load(desc.shaders)?;
        let stages = modules.stages(desc.shaders);

        let (bindings, attributes) = match &desc.vertex_input {
            Some(input) => vertex_input(input)?,
            None => (Vec::new(), Vec::new()),
        };
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let ia = &desc.input_assembly;
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(ia.topology))
            .primitive_restart_enable(ia.primitive_restart != PrimitiveRestart::Disabled);
        let tessellation = vk::PipelineTessellationStateCreateInfo::default()
            .patch_control_points(u32::from(ia.tess_control_point_num));

        // Counts come from the dynamic *_WITH_COUNT state.
        let viewport_state = vk::PipelineViewportStateCreateInfo::default();

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(raster.depth_clamp)
            .rasterizer_discard_enable(false)
            .polygon_mode(fill_mode_to_vk(raster.fill_mode))
            .cull_mode(cull_mode_to_vk(raster.cull_mode))
            .front_face(if raster.front_counter_clockwise {
                vk::FrontFace::COUNTER_CLOCKWISE
            } else {
                vk::FrontFace::CLOCKWISE
            })
            .depth_bias_enable(raster.depth_bias.is_enabled())
            .depth_bias_constant_factor(raster.depth_bias.constant)
            .depth_bias_clamp(raster.depth_bias.clamp)
            .depth_bias_slope_factor(raster.depth_bias.slope)
            .line_width(1.0);

        let ms = desc.multisample.unwrap_or_default();
        let sample_mask = [ms.sample_mask];
        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(sample_count_to_vk(ms.sample_num))
            .sample_mask(&sample_mask)
            .alpha_to_coverage_enable(ms.alpha_to_coverage);

        let depth_stencil = depth_stencil_state(om);

        let blend_attachments: Vec<_> = om
            .colors
            .iter()
            .map(|c| {
                vk::PipelineColorBlendAttachmentState::default()
                    .blend_enable(c.blend_enabled)
                    .src_color_blend_factor(blend_factor_to_vk(c.color_blend.src_factor))
                    .dst_color_blend_factor(blend_factor_to_vk(c.color_blend.dst_factor))
                    .color_blend_op(blend_func_to_vk(c.color_blend.func))
                    .src_alpha_blend_factor(blend_factor_to_vk(c.alpha_blend.src_factor))
                    .dst_alpha_blend_factor(blend_factor_to_vk(c.alpha_blend.dst_factor))
                    .alpha_blend_op(blend_func_to_vk(c.alpha_blend.func))
                    .color_write_mask(color_write_to_vk(c.color_write_mask))
            })
            .collect();
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(om.logic_func != LogicFunc::None)
            .logic_op(logic_func_to_vk(om.logic_func))
            .attachments(&blend_attachments);

        let dynamic = dynamic_states(om);
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic);

        let (color_formats, depth_format, stencil_format) = rendering_formats(om);
        let mut rendering = vk::PipelineRenderingCreateInfo::default()
            .color_attachment_formats(&color_formats)
            .depth_attachment_format(depth_format)
            .stencil_attachment_format(stencil_format);

        let mut info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(desc.pipeline_layout.handle)
            .push_next(&mut rendering);
        if ia.topology == Topology::PatchList {
            info = info.tessellation_state(&tessellation);
        }

        let handle = first_pipeline(
            unsafe {
                self.shared.device.create_graphics_pipelines(
                    vk::PipelineCache::null(),
                    std::slice::from_ref(&info),
                    None,
                )
            },
            "vkCreateGraphicsPipelines",
        )?;
        debug!("Created graphics pipeline {:?} ({} stages)", handle, stages.len());
        Ok(PipelineVk {
            handle,
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            group_num: 0,
        })
    }

    pub(crate) fn create_compute_pipeline_impl(
        &self,
        desc: &ComputePipelineDesc<'_, Vulkan>,
    ) -> Result<PipelineVk> {
        let shaders = std::slice::from_ref(&desc.shader);
        let mut modules = ShaderModules::new(&self.shared.device);
        modules.load(shaders)?;
        let stages = modules.stages(shaders);
        let Some(stage) = stages.first().copied() else {
            return Err(Error::invalid("compute pipelines need a shader"));
        };

        let info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(desc.pipeline_layout.handle);
        let handle = first_pipeline(
            unsafe {
                self.shared.device.create_compute_pipelines(
                    vk::PipelineCache::null(),
                    std::slice::from_ref(&info),
                    None,
                )
            },
            "vkCreateComputePipelines",
        )?;
        debug!("Created compute pipeline {:?}", handle);
        Ok(PipelineVk {
            handle,
            bind_point: vk::PipelineBindPoint::COMPUTE,
            group_num: 0,
        })
    }

    pub(crate) fn create_ray_tracing_pipeline_impl(
        &self,
        desc: &RayTracingPipelineDesc<'_, Vulkan>,
    ) -> Result<PipelineVk> {
        self.require(Features::RAY_TRACING, "ray tracing pipelines")?;
        let Some(loader) = &self.shared.extensions.ray_tracing_pipeline else {
            return Err(Error::unsupported("VK_KHR_ray_tracing_pipeline is not enabled"));
        };
        let max_depth = self.shared.desc.ray_tracing_shader_recursion_max_depth;
        if desc.recursion_max_depth > max_depth {
            return Err(Error::invalid(format!(
                "recursion depth {} exceeds the device's {max_depth}",
                desc.recursion_max_depth
            )));
        }

        let library: Vec<_> = desc.shader_library.iter().map(|s| s.stage).collect();
        let groups = shader_groups(&library, desc.shader_groups)?;

        let mut modules = ShaderModules::new(&self.shared.device);
        modules.load(desc.shader_library)?;
        let stages = modules.stages(desc.shader_library);

        let info = vk::RayTracingPipelineCreateInfoKHR::default()
            .stages(&stages)
            .groups(&groups)
            .max_pipeline_ray_recursion_depth(desc.recursion_max_depth)
            .layout(desc.pipeline_layout.handle);
        let handle = first_pipeline(
            unsafe {
                loader.create_ray_tracing_pipelines(
                    vk::DeferredOperationKHR::null(),
                    vk::PipelineCache::null(),
                    std::slice::from_ref(&info),
                    None,
                )
            },
            "vkCreateRayTracingPipelinesKHR",
        )?;
        debug!(
            "Created ray tracing pipeline {:?} ({} shaders, {} groups)",
            handle,
            stages.len(),
            groups.len()
        );
        Ok(PipelineVk {
            handle,
            bind_point: vk::PipelineBindPoint::RAY_TRACING_KHR,
            group_num: groups.len() as u32,
        })
    }

    pub(crate) fn write_shader_group_identifiers_impl(
        &self,
        pipeline: &PipelineVk,
        base_group: u32,
        group_num: u32,
        dst: &mut [u8],
    ) -> Result<()> {
        let Some(loader) = &self.shared.extensions.ray_tracing_pipeline else {
            return Err(Error::unsupported("VK_KHR_ray_tracing_pipeline is not enabled"));
        };
        if base_group + group_num > pipeline.group_num {
            return Err(Error::invalid(format!(
                "groups {base_group}+{group_num} exceed the pipeline's {}",
                pipeline.group_num
            )));
        }
        let size = (self.shared.desc.ray_tracing_shader_group_identifier_size * group_num) as usize;
        if dst.len() < size {
            return Err(Error::invalid(format!(
                "{size} bytes of identifiers do not fit in {}",
                dst.len()
            )));
        }
        let handles = unsafe {
            loader.get_ray_tracing_shader_group_handles(pipeline.handle, base_group, group_num, size)
        }
        .or_nri("vkGetRayTracingShaderGroupHandlesKHR")?;
        dst[..size].copy_from_slice(&handles);
        Ok(())
    }

    pub(crate) unsafe fn destroy_pipeline_impl(&self, pipeline: PipelineVk) {
        self.shared.device.destroy_pipeline(pipeline.handle, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nri_core::{
        ColorAttachmentDesc, DepthAttachmentDesc, StencilAttachmentDesc, StencilFunc,
        VertexAttributeDesc, VertexStreamDesc,
    };

    #[test]
    fn entry_points_default_to_main() {
        assert_eq!(entry_point("").ok(), CString::new("main").ok());
        assert_eq!(entry_point("cs_main").ok(), CString::new("cs_main").ok());
        assert!(entry_point("bad\0name").is_err());
    }

    #[test]
    fn attributes_bind_through_their_stream() {
        let streams = [
            VertexStreamDesc {
                stride: 12,
                binding_slot: 0,
                step_rate: VertexStreamStepRate::PerVertex,
            },
            VertexStreamDesc {
                stride: 64,
                binding_slot: 3,
                step_rate: VertexStreamStepRate::PerInstance,
            },
        ];
        let attributes = [
            VertexAttributeDesc {
                location: 0,
                offset: 0,
                format: Format::Rgb32Sfloat,
                stream_index: 0,
            },
            VertexAttributeDesc {
                location: 4,
                offset: 16,
                format: Format::Rgba32Sfloat,
                stream_index: 1,
            },
        ];
        let input = VertexInputDesc {
            attributes: &attributes,
            streams: &streams,
        };
        let (bindings, attrs) = vertex_input(&input).expect("valid input");
        assert_eq!(bindings[1].binding, 3);
        assert_eq!(bindings[1].input_rate, vk::VertexInputRate::INSTANCE);
        assert_eq!(attrs[1].binding, 3);
        assert_eq!(attrs[1].format, vk::Format::R32G32B32A32_SFLOAT);

        let orphan = [VertexAttributeDesc {
            stream_index: 5,
            ..attributes[0]
        }];
        let bad = VertexInputDesc {
            attributes: &orphan,
            streams: &streams,
        };
        assert!(vertex_input(&bad).is_err());
    }

    #[test]
    fn depth_and_stencil_tests_follow_compare_funcs() {
        let colors = [ColorAttachmentDesc::opaque(Format::Rgba8Unorm)];
        let mut om = OutputMergerDesc {
            colors: &colors,
            depth: DepthAttachmentDesc {
                compare_func: CompareFunc::Greater,
                write: true,
                bounds_test: false,
            },
            depth_stencil_format: Format::D32Sfloat,
            ..Default::default()
        };
        let state = depth_stencil_state(&om);
        assert_eq!(state.depth_test_enable, vk::TRUE);
        assert_eq!(state.depth_compare_op, vk::CompareOp::GREATER);
        assert_eq!(state.stencil_test_enable, vk::FALSE);

        om.stencil = StencilAttachmentDesc {
            back: StencilDesc {
                compare_func: CompareFunc::Equal,
                pass: StencilFunc::Replace,
                ..Default::default()
            },
            ..Default::default()
        };
        let state = depth_stencil_state(&om);
        assert_eq!(state.stencil_test_enable, vk::TRUE);
        assert_eq!(state.back.pass_op, vk::StencilOp::REPLACE);
        assert_eq!(state.back.write_mask, 0xFF);
    }

    #[test]
    fn rendering_formats_split_depth_and_stencil() {
        let colors = [
            ColorAttachmentDesc::opaque(Format::Rgba16Sfloat),
            ColorAttachmentDesc::opaque(Format::Bgra8Srgb),
        ];
        let om = OutputMergerDesc {
            colors: &colors,
            depth_stencil_format: Format::D24UnormS8Uint,
            ..Default::default()
        };
        let (formats, depth, stencil) = rendering_formats(&om);
        assert_eq!(
            formats,
            vec![vk::Format::R16G16B16A16_SFLOAT, vk::Format::B8G8R8A8_SRGB]
        );
        assert_eq!(depth, vk::Format::D24_UNORM_S8_UINT);
        assert_eq!(stencil, vk::Format::D24_UNORM_S8_UINT);

        let depth_only = OutputMergerDesc {
            depth_stencil_format: Format::D32Sfloat,
            ..Default::default()
        };
        let (_, depth, stencil) = rendering_formats(&depth_only);
        assert_eq!(depth, vk::Format::D32_SFLOAT);
        assert_eq!(stencil, vk::Format::UNDEFINED);

        let (_, depth, _) = rendering_formats(&OutputMergerDesc::default());
        assert_eq!(depth, vk::Format::UNDEFINED);
    }

    #[test]
    fn depth_bounds_are_dynamic_only_when_tested() {
        let mut om = OutputMergerDesc::default();
        assert!(!dynamic_states(&om).contains(&vk::DynamicState::DEPTH_BOUNDS));
        om.depth.bounds_test = true;
        assert!(dynamic_states(&om).contains(&vk::DynamicState::DEPTH_BOUNDS));
    }

    #[test]
    fn shader_groups_from_library() {
        let library = [
            StageBits::RAYGEN_SHADER,
            StageBits::MISS_SHADER,
            StageBits::CLOSEST_HIT_SHADER,
            StageBits::ANY_HIT_SHADER,
            StageBits::INTERSECTION_SHADER,
        ];
        let groups = [
            ShaderGroupDesc {
                shader_indices: [1, 0, 0],
            },
            ShaderGroupDesc {
                shader_indices: [2, 0, 0],
            },
            ShaderGroupDesc {
                shader_indices: [3, 4, 0],
            },
            ShaderGroupDesc {
                shader_indices: [3, 5, 0],
            },
        ];
        let infos = shader_groups(&library, &groups).expect("valid groups");
        assert_eq!(infos[0].ty, vk::RayTracingShaderGroupTypeKHR::GENERAL);
        assert_eq!(infos[0].general_shader, 0);
        assert_eq!(infos[1].general_shader, 1);
        assert_eq!(infos[2].ty, vk::RayTracingShaderGroupTypeKHR::TRIANGLES_HIT_GROUP);
        assert_eq!((infos[2].closest_hit_shader, infos[2].any_hit_shader), (2, 3));
        assert_eq!(infos[2].general_shader, vk::SHADER_UNUSED_KHR);
        assert_eq!(infos[3].ty, vk::RayTracingShaderGroupTypeKHR::PROCEDURAL_HIT_GROUP);
        assert_eq!(infos[3].intersection_shader, 4);

        let empty = [ShaderGroupDesc::default()];
        assert!(shader_groups(&library, &empty).is_err());
        let missing = [ShaderGroupDesc {
            shader_indices: [9, 0, 0],
        }];
        assert!(shader_groups(&library, &missing).is_err());
    }
}
