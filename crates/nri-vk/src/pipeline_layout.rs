//! Pipeline layouts.
//!
//! NRI layouts speak in HLSL registers: a descriptor set is a register space
//! and ranges are register windows. [`plan_layout`] turns that into Vulkan set
//! indices and SPIR-V bindings without touching the device, so the mapping can
//! be tested on its own.

use std::collections::BTreeSet;
use std::sync::Arc;

use ash::vk;
use nri_core::{
    align_up, DescriptorRangeBits, DescriptorSetBits, DescriptorType, Error, Features,
    PipelineLayoutBits, PipelineLayoutDesc, QueueType, Result, SpirvBindingOffsets, StageBits,
};
use tracing::debug;

use crate::conversions::{descriptor_type_to_vk, shader_stages_to_vk};
use crate::device::DeviceVk;
use crate::error::VkResultExt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BindingPlan {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub count: u32,
    pub stages: vk::ShaderStageFlags,
    pub flags: vk::DescriptorBindingFlags,
}

/// Where one NRI range landed inside its set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RangePlan {
    pub first_binding: u32,
    pub descriptor_num: u32,
    /// One array binding instead of `descriptor_num` bindings.
    pub is_array: bool,
    pub descriptor_type: DescriptorType,
    pub vk_type: vk::DescriptorType,
}

impl RangePlan {
    /// Binding and array element of descriptor `index` within the range.
    pub fn slot(&self, index: u32) -> (u32, u32) {
        if self.is_array {
            (self.first_binding, index)
        } else {
            (self.first_binding + index, 0)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SetPlan {
    pub register_space: u32,
    pub bindings: Vec<BindingPlan>,
    pub ranges: Vec<RangePlan>,
    pub update_after_bind: bool,
    /// The last range is sized at allocation time.
    pub variable_sized: bool,
    /// Filler for a set index no NRI set uses.
    pub empty: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PushConstantPlan {
    pub offset: u32,
    pub size: u32,
    pub stages: vk::ShaderStageFlags,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RootDescriptorPlan {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LayoutPlan {
    /// Indexed by Vulkan set index.
    pub sets: Vec<Arc<SetPlan>>,
    pub push_constants: Vec<PushConstantPlan>,
    /// Set index of the push-descriptor set holding root descriptors.
    pub root_set: Option<u32>,
    pub root_descriptors: Vec<RootDescriptorPlan>,
    pub root_descriptor_stages: vk::ShaderStageFlags,
}

fn binding_of(
    offsets: &SpirvBindingOffsets,
    ignore: bool,
    ty: DescriptorType,
    register: u32,
) -> Result<u32> {
    if ignore {
        return Ok(register);
    }
    register
        .checked_add(offsets.offset_for(ty))
        .ok_or_else(|| Error::invalid(format!("register {register} overflows its {ty:?} binding offset")))
}

fn stages_or(stages: StageBits, fallback: StageBits) -> vk::ShaderStageFlags {
    if stages.is_empty() {
        shader_stages_to_vk(fallback)
    } else {
        shader_stages_to_vk(stages)
    }
}

/// Device limits a layout is planned against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LayoutLimits {
    pub root_constant_max_size: u32,
    pub descriptor_set_max_num: u32,
    pub push_descriptors: bool,
}

/// Translate an NRI layout description into Vulkan sets and bindings.
pub(crate) fn plan_layout(
    desc: &PipelineLayoutDesc<'_>,
    offsets: &SpirvBindingOffsets,
    limits: LayoutLimits,
) -> Result<LayoutPlan> {
    let ignore = desc.flags.contains(PipelineLayoutBits::IGNORE_GLOBAL_SPIRV_OFFSETS);

    let mut spaces = BTreeSet::new();
    for set in desc.descriptor_sets {
        if !spaces.insert(set.register_space) {
            return Err(Error::invalid(format!(
                "register space {} used by two descriptor sets",
                set.register_space
            )));
        }
    }
    let has_root = !desc.root_descriptors.is_empty();
    if has_root {
        if !limits.push_descriptors {
            return Err(Error::unsupported("root descriptors need push descriptors"));
        }
        if spaces.contains(&desc.root_register_space) {
            return Err(Error::invalid(format!(
                "root register space {} collides with a descriptor set",
                desc.root_register_space
            )));
        }
    }

    let set_num = spaces
        .iter()
        .copied()
        .chain(has_root.then_some(desc.root_register_space))
        .max()
        .map_or(0, |max| u64::from(max) + 1);
    if set_num > u64::from(limits.descriptor_set_max_num) {
        return Err(Error::invalid(format!(
            "register spaces need {set_num} descriptor sets, the device binds at most {}",
            limits.descriptor_set_max_num
        )));
    }
    let mut sets: Vec<SetPlan> = (0..set_num)
        .map(|space| SetPlan {
            register_space: space as u32,
            empty: true,
            ..Default::default()
        })
        .collect();

    for set_desc in desc.descriptor_sets {
        let set = &mut sets[set_desc.register_space as usize];
        set.empty = false;
        set.update_after_bind = set_desc.flags.contains(DescriptorSetBits::ALLOW_UPDATE_AFTER_SET)
            || set_desc
                .ranges
                .iter()
                .any(|r| r.flags.contains(DescriptorRangeBits::ALLOW_UPDATE_AFTER_SET));

        let mut used = BTreeSet::new();
        for (i, range) in set_desc.ranges.iter().enumerate() {
            let variable = range.flags.contains(DescriptorRangeBits::VARIABLE_SIZED_ARRAY);
            if variable && i + 1 != set_desc.ranges.len() {
                return Err(Error::invalid(
                    "only the last range of a set may be variable sized",
                ));
            }
            if range.descriptor_num == 0 {
                return Err(Error::invalid("descriptor ranges must not be empty"));
            }

            let mut flags = vk::DescriptorBindingFlags::empty();
            if range.flags.contains(DescriptorRangeBits::PARTIALLY_BOUND) {
                flags |= vk::DescriptorBindingFlags::PARTIALLY_BOUND;
            }
            if variable {
                flags |= vk::DescriptorBindingFlags::VARIABLE_DESCRIPTOR_COUNT;
            }
            if set.update_after_bind {
                flags |= vk::DescriptorBindingFlags::UPDATE_AFTER_BIND;
            }

            let first_binding =
                binding_of(offsets, ignore, range.descriptor_type, range.base_register_index)?;
            if variable && used.iter().any(|&b| b >= first_binding) {
                return Err(Error::invalid(
                    "a variable sized range must have the highest binding of its set",
                ));
            }
            let is_array = range.is_array();
            let vk_type = descriptor_type_to_vk(range.descriptor_type);
            let stages = stages_or(range.shader_stages, desc.shader_stages);
            let (binding_num, count) = if is_array {
                (1, range.descriptor_num)
            } else {
                (range.descriptor_num, 1)
            };
            let end_binding = first_binding.checked_add(binding_num).ok_or_else(|| {
                Error::invalid(format!(
                    "{} descriptors from binding {first_binding} overflow the binding range",
                    range.descriptor_num
                ))
            })?;
            for binding in first_binding..end_binding {
                if !used.insert(binding) {
                    return Err(Error::invalid(format!(
                        "binding {binding} of register space {} is used twice",
                        set_desc.register_space
                    )));
                }
                set.bindings.push(BindingPlan {
                    binding,
                    descriptor_type: vk_type,
                    count,
                    stages,
                    flags,
                });
            }
            set.variable_sized |= variable;
            set.ranges.push(RangePlan {
                first_binding,
                descriptor_num: range.descriptor_num,
                is_array,
                descriptor_type: range.descriptor_type,
                vk_type,
            });
        }
    }

    let mut root_descriptors = Vec::with_capacity(desc.root_descriptors.len());
    let mut root_descriptor_stages = vk::ShaderStageFlags::empty();
    if has_root {
        let set = &mut sets[desc.root_register_space as usize];
        set.empty = false;
        let mut used = BTreeSet::new();
        for root in desc.root_descriptors {
            let descriptor_type = match root.descriptor_type {
                DescriptorType::ConstantBuffer => vk::DescriptorType::UNIFORM_BUFFER,
                DescriptorType::StructuredBuffer | DescriptorType::StorageStructuredBuffer => {
                    vk::DescriptorType::STORAGE_BUFFER
                }
                other => {
                    return Err(Error::invalid(format!(
                        "{other:?} cannot be a root descriptor"
                    )))
                }
            };
            let binding = binding_of(offsets, ignore, root.descriptor_type, root.register_index)?;
            if !used.insert(binding) {
                return Err(Error::invalid(format!("root binding {binding} is used twice")));
            }
            let stages = stages_or(root.shader_stages, desc.shader_stages);
            root_descriptor_stages |= stages;
            set.bindings.push(BindingPlan {
                binding,
                descriptor_type,
                count: 1,
                stages,
                flags: vk::DescriptorBindingFlags::empty(),
            });
            root_descriptors.push(RootDescriptorPlan {
                binding,
                descriptor_type,
            });
        }
    }

    let mut push_constants = Vec::with_capacity(desc.root_constants.len());
    let mut offset = 0u32;
    for constant in desc.root_constants {
        if constant.size == 0 {
            return Err(Error::invalid("root constants must not be empty"));
        }
        let size = u32::try_from(align_up(u64::from(constant.size), 4))
            .map_err(|_| Error::invalid(format!("root constant of {} bytes", constant.size)))?;
        push_constants.push(PushConstantPlan {
            offset,
            size,
            stages: stages_or(constant.shader_stages, desc.shader_stages),
        });
        offset = offset
            .checked_add(size)
            .ok_or_else(|| Error::invalid("root constants overflow the push constant range"))?;
    }
    if offset > limits.root_constant_max_size {
        return Err(Error::invalid(format!(
            "root constants take {offset} bytes, the device allows {}",
            limits.root_constant_max_size
        )));
    }

    Ok(LayoutPlan {
        sets: sets.into_iter().map(Arc::new).collect(),
        push_constants,
        root_set: has_root.then_some(desc.root_register_space),
        root_descriptors,
        root_descriptor_stages,
    })
}

/// Bind points a layout's stages can be used from.
///
/// The ray tracing bind point is only valid once the device enabled ray
/// tracing pipelines.
pub(crate) fn bind_points(stages: StageBits, ray_tracing: bool) -> Vec<vk::PipelineBindPoint> {
    let stages = if stages.is_empty() { StageBits::ALL } else { stages };
    let mut points = Vec::with_capacity(3);
    if stages.intersects(StageBits::GRAPHICS_SHADERS) {
        points.push(vk::PipelineBindPoint::GRAPHICS);
    }
    if stages.contains(StageBits::COMPUTE_SHADER) {
        points.push(vk::PipelineBindPoint::COMPUTE);
    }
    if ray_tracing && stages.intersects(StageBits::RAY_TRACING_SHADERS) {
        points.push(vk::PipelineBindPoint::RAY_TRACING_KHR);
    }
    points
}

/// The subset of `points` a command buffer of `queue_type` may bind at.
pub(crate) fn queue_bind_points(
    points: &[vk::PipelineBindPoint],
    queue_type: QueueType,
) -> Vec<vk::PipelineBindPoint> {
    points
        .iter()
        .copied()
        .filter(|&point| match queue_type {
            QueueType::Graphics => true,
            QueueType::Compute => point != vk::PipelineBindPoint::GRAPHICS,
            QueueType::Copy => false,
        })
        .collect()
}

#[derive(Debug)]
pub struct PipelineLayoutVk {
    pub(crate) handle: vk::PipelineLayout,
    pub(crate) set_layouts: Vec<vk::DescriptorSetLayout>,
    pub(crate) plan: Arc<LayoutPlan>,
    pub(crate) bind_points: Vec<vk::PipelineBindPoint>,
}

impl PipelineLayoutVk {
    pub fn handle(&self) -> vk::PipelineLayout {
        self.handle
    }
}

impl DeviceVk {
    fn create_set_layout(&self, set: &SetPlan, push: bool) -> Result<vk::DescriptorSetLayout> {
        let bindings: Vec<_> = set
            .bindings
            .iter()
            .map(|b| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(b.binding)
                    .descriptor_type(b.descriptor_type)
                    .descriptor_count(b.count)
                    .stage_flags(b.stages)
            })
            .collect();
        let binding_flags: Vec<_> = set.bindings.iter().map(|b| b.flags).collect();

        let mut flags = vk::DescriptorSetLayoutCreateFlags::empty();
        if push {
            flags |= vk::DescriptorSetLayoutCreateFlags::PUSH_DESCRIPTOR_KHR;
        }
        if set.update_after_bind {
            flags |= vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL;
        }
        let mut flags_info =
            vk::DescriptorSetLayoutBindingFlagsCreateInfo::default().binding_flags(&binding_flags);
        let info = vk::DescriptorSetLayoutCreateInfo::default()
            .flags(flags)
            .bindings(&bindings)
            .push_next(&mut flags_info);
        unsafe { self.shared.device.create_descriptor_set_layout(&info, None) }
            .or_nri("vkCreateDescriptorSetLayout")
    }

    pub(crate) fn create_pipeline_layout_impl(
        &self,
        desc: &PipelineLayoutDesc<'_>,
    ) -> Result<PipelineLayoutVk> {
        let device_desc = &self.shared.desc;
        let plan = plan_layout(
            desc,
            &self.shared.spirv_binding_offsets,
            LayoutLimits {
                root_constant_max_size: device_desc.pipeline_layout_root_constant_max_size,
                descriptor_set_max_num: device_desc.pipeline_layout_descriptor_set_max_num,
                push_descriptors: device_desc.features.contains(Features::PUSH_DESCRIPTORS),
            },
        )?;
        if plan.sets.iter().any(|s| s.update_after_bind || s.variable_sized) {
            self.require(Features::DESCRIPTOR_INDEXING, "update-after-bind and variable ranges")?;
        }

        let mut set_layouts = Vec::with_capacity(plan.sets.len());
        for (index, set) in plan.sets.iter().enumerate() {
            let push = plan.root_set == Some(index as u32);
            match self.create_set_layout(set, push) {
                Ok(layout) => set_layouts.push(layout),
                Err(e) => {
                    self.destroy_set_layouts(&set_layouts);
                    return Err(e);
                }
            }
        }

        let ranges: Vec<_> = plan
            .push_constants
            .iter()
            .map(|p| {
                vk::PushConstantRange::default()
                    .stage_flags(p.stages)
                    .offset(p.offset)
                    .size(p.size)
            })
            .collect();
        let info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&ranges);
        let handle = match unsafe { self.shared.device.create_pipeline_layout(&info, None) }
            .or_nri("vkCreatePipelineLayout")
        {
            Ok(handle) => handle,
            Err(e) => {
                self.destroy_set_layouts(&set_layouts);
                return Err(e);
            }
        };
        debug!(
            "Created pipeline layout {:?}: {} sets, {} push constant ranges",
            handle,
            set_layouts.len(),
            ranges.len()
        );

        Ok(PipelineLayoutVk {
            handle,
            set_layouts,
            plan: Arc::new(plan),
            bind_points: bind_points(
                desc.shader_stages,
                self.shared.desc.features.contains(Features::RAY_TRACING),
            ),
        })
    }

    fn destroy_set_layouts(&self, layouts: &[vk::DescriptorSetLayout]) {
        for layout in layouts {
            unsafe { self.shared.device.destroy_descriptor_set_layout(*layout, None) };
        }
    }

    pub(crate) unsafe fn destroy_pipeline_layout_impl(&self, layout: PipelineLayoutVk) {
        self.shared.device.destroy_pipeline_layout(layout.handle, None);
        self.destroy_set_layouts(&layout.set_layouts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nri_core::{
        DescriptorRangeDesc, DescriptorSetDesc, RootConstantDesc, RootDescriptorDesc,
    };

    const PS: StageBits = StageBits::FRAGMENT_SHADER;

    fn limits(root_constant_max_size: u32, push_descriptors: bool) -> LayoutLimits {
        LayoutLimits {
            root_constant_max_size,
            descriptor_set_max_num: 8,
            push_descriptors,
        }
    }

    fn dump(plan: &LayoutPlan) -> String {
        let mut out = String::new();
        for (index, set) in plan.sets.iter().enumerate() {
            if set.empty {
                out.push_str(&format!("set {index}: empty\n"));
                continue;
            }
            out.push_str(&format!("set {index}:\n"));
            for b in &set.bindings {
                out.push_str(&format!("  {} {:?} x{}\n", b.binding, b.descriptor_type, b.count));
            }
        }
        out
    }

    #[test]
    fn registers_become_offset_bindings() {
        let material = [
            DescriptorRangeDesc::new(0, 2, DescriptorType::Texture, PS),
            DescriptorRangeDesc::new(0, 1, DescriptorType::Sampler, PS),
            DescriptorRangeDesc::new(1, 1, DescriptorType::ConstantBuffer, PS),
        ];
        let bindless = [DescriptorRangeDesc::new(0, 1024, DescriptorType::Texture, PS)
            .with_flags(DescriptorRangeBits::VARIABLE_SIZED_ARRAY | DescriptorRangeBits::PARTIALLY_BOUND)];
        let sets = [
            DescriptorSetDesc {
                register_space: 0,
                ranges: &material,
                ..Default::default()
            },
            DescriptorSetDesc {
                register_space: 2,
                ranges: &bindless,
                ..Default::default()
            },
        ];
        let desc = PipelineLayoutDesc {
            descriptor_sets: &sets,
            shader_stages: PS,
            ..Default::default()
        };
        let plan = plan_layout(&desc, &SpirvBindingOffsets::default(), limits(128, false))
            .expect("valid layout");

        insta::assert_snapshot!(dump(&plan), @r"
        set 0:
          0 SAMPLED_IMAGE x1
          1 SAMPLED_IMAGE x1
          100 SAMPLER x1
          201 UNIFORM_BUFFER x1
        set 1: empty
        set 2:
          0 SAMPLED_IMAGE x1024
        ");

        let bindless = &plan.sets[2];
        assert!(bindless.variable_sized);
        assert_eq!(
            bindless.bindings[0].flags,
            vk::DescriptorBindingFlags::PARTIALLY_BOUND
                | vk::DescriptorBindingFlags::VARIABLE_DESCRIPTOR_COUNT
        );
        assert_eq!(plan.sets[0].ranges[0].slot(1), (1, 0));
        assert_eq!(bindless.ranges[0].slot(7), (0, 7));
        assert_eq!(plan.root_set, None);
    }

    #[test]
    fn offsets_can_be_ignored() {
        let ranges = [
            DescriptorRangeDesc::new(3, 1, DescriptorType::Sampler, PS),
            DescriptorRangeDesc::new(4, 1, DescriptorType::StorageBuffer, PS),
        ];
        let sets = [DescriptorSetDesc {
            register_space: 0,
            ranges: &ranges,
            ..Default::default()
        }];
        let desc = PipelineLayoutDesc {
            descriptor_sets: &sets,
            flags: PipelineLayoutBits::IGNORE_GLOBAL_SPIRV_OFFSETS,
            ..Default::default()
        };
        let plan = plan_layout(&desc, &SpirvBindingOffsets::default(), limits(128, false))
            .expect("valid layout");
        let bindings: Vec<_> = plan.sets[0].bindings.iter().map(|b| b.binding).collect();
        assert_eq!(bindings, [3, 4]);
        assert_eq!(plan.sets[0].bindings[1].descriptor_type, vk::DescriptorType::STORAGE_TEXEL_BUFFER);
        assert_eq!(plan.sets[0].bindings[0].stages, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn overlapping_bindings_are_rejected() {
        // t0..t3 and t2 collide once the texture offset is applied.
        let ranges = [
            DescriptorRangeDesc::new(0, 4, DescriptorType::Texture, PS),
            DescriptorRangeDesc::new(2, 1, DescriptorType::Buffer, PS),
        ];
        let sets = [DescriptorSetDesc {
            register_space: 0,
            ranges: &ranges,
            ..Default::default()
        }];
        let desc = PipelineLayoutDesc {
            descriptor_sets: &sets,
            ..Default::default()
        };
        let err = plan_layout(&desc, &SpirvBindingOffsets::default(), limits(128, false)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn variable_ranges_must_be_last() {
        let ranges = [
            DescriptorRangeDesc::new(0, 16, DescriptorType::Texture, PS)
                .with_flags(DescriptorRangeBits::VARIABLE_SIZED_ARRAY),
            DescriptorRangeDesc::new(0, 1, DescriptorType::Sampler, PS),
        ];
        let sets = [DescriptorSetDesc {
            register_space: 0,
            ranges: &ranges,
            ..Default::default()
        }];
        let desc = PipelineLayoutDesc {
            descriptor_sets: &sets,
            ..Default::default()
        };
        assert!(plan_layout(&desc, &SpirvBindingOffsets::default(), limits(128, false)).is_err());
    }

    #[test]
    fn update_after_set_marks_every_binding() {
        let ranges = [
            DescriptorRangeDesc::new(0, 1, DescriptorType::Texture, PS),
            DescriptorRangeDesc::new(1, 1, DescriptorType::Texture, PS)
                .with_flags(DescriptorRangeBits::ALLOW_UPDATE_AFTER_SET),
        ];
        let sets = [DescriptorSetDesc {
            register_space: 0,
            ranges: &ranges,
            ..Default::default()
        }];
        let desc = PipelineLayoutDesc {
            descriptor_sets: &sets,
            ..Default::default()
        };
        let plan = plan_layout(&desc, &SpirvBindingOffsets::ZERO, limits(128, false)).expect("valid layout");
        assert!(plan.sets[0].update_after_bind);
        assert!(plan.sets[0]
            .bindings
            .iter()
            .all(|b| b.flags.contains(vk::DescriptorBindingFlags::UPDATE_AFTER_BIND)));
    }

    #[test]
    fn root_constants_accumulate() {
        let constants = [
            RootConstantDesc {
                register_index: 0,
                size: 6,
                shader_stages: StageBits::VERTEX_SHADER,
            },
            RootConstantDesc {
                register_index: 1,
                size: 16,
                shader_stages: PS,
            },
        ];
        let desc = PipelineLayoutDesc {
            root_constants: &constants,
            ..Default::default()
        };
        let plan = plan_layout(&desc, &SpirvBindingOffsets::default(), limits(128, false))
            .expect("valid layout");
        assert!(plan.sets.is_empty());
        assert_eq!(
            plan.push_constants,
            vec![
                PushConstantPlan {
                    offset: 0,
                    size: 8,
                    stages: vk::ShaderStageFlags::VERTEX,
                },
                PushConstantPlan {
                    offset: 8,
                    size: 16,
                    stages: vk::ShaderStageFlags::FRAGMENT,
                },
            ]
        );

        let err = plan_layout(&desc, &SpirvBindingOffsets::default(), limits(16, false)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn root_descriptors_get_a_push_set() {
        let ranges = [DescriptorRangeDesc::new(0, 1, DescriptorType::Texture, PS)];
        let sets = [DescriptorSetDesc {
            register_space: 0,
            ranges: &ranges,
            ..Default::default()
        }];
        let roots = [
            RootDescriptorDesc {
                register_index: 0,
                descriptor_type: DescriptorType::ConstantBuffer,
                shader_stages: PS,
            },
            RootDescriptorDesc {
                register_index: 1,
                descriptor_type: DescriptorType::StorageStructuredBuffer,
                shader_stages: StageBits::COMPUTE_SHADER,
            },
        ];
        let desc = PipelineLayoutDesc {
            root_register_space: 3,
            root_descriptors: &roots,
            descriptor_sets: &sets,
            ..Default::default()
        };
        let plan = plan_layout(&desc, &SpirvBindingOffsets::default(), limits(128, true))
            .expect("valid layout");
        assert_eq!(plan.root_set, Some(3));
        assert_eq!(plan.sets.len(), 4);
        assert!(plan.sets[1].empty && plan.sets[2].empty);
        assert_eq!(
            plan.root_descriptors,
            vec![
                RootDescriptorPlan {
                    binding: 200,
                    descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                },
                RootDescriptorPlan {
                    binding: 301,
                    descriptor_type: vk::DescriptorType::STORAGE_BUFFER,
                },
            ]
        );
        assert_eq!(
            plan.root_descriptor_stages,
            vk::ShaderStageFlags::FRAGMENT | vk::ShaderStageFlags::COMPUTE
        );

        assert!(matches!(
            plan_layout(&desc, &SpirvBindingOffsets::default(), limits(128, false)),
            Err(Error::Unsupported(_))
        ));
        let colliding = PipelineLayoutDesc {
            root_register_space: 0,
            ..desc
        };
        assert!(matches!(
            plan_layout(&colliding, &SpirvBindingOffsets::default(), limits(128, true)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn duplicate_spaces_are_rejected() {
        let ranges = [DescriptorRangeDesc::new(0, 1, DescriptorType::Texture, PS)];
        let set = DescriptorSetDesc {
            register_space: 1,
            ranges: &ranges,
            ..Default::default()
        };
        let sets = [set, set];
        let desc = PipelineLayoutDesc {
            descriptor_sets: &sets,
            ..Default::default()
        };
        assert!(plan_layout(&desc, &SpirvBindingOffsets::default(), limits(128, false)).is_err());
    }

    #[test]
    fn bind_points_follow_stages() {
        assert_eq!(bind_points(PS, true), vec![vk::PipelineBindPoint::GRAPHICS]);
        assert_eq!(
            bind_points(StageBits::COMPUTE_SHADER, true),
            vec![vk::PipelineBindPoint::COMPUTE]
        );
        assert_eq!(bind_points(StageBits::empty(), true).len(), 3);
        assert_eq!(
            bind_points(StageBits::RAYGEN_SHADER | StageBits::MISS_SHADER, true),
            vec![vk::PipelineBindPoint::RAY_TRACING_KHR]
        );
    }

    #[test]
    fn ray_tracing_bind_point_needs_the_feature() {
        assert_eq!(
            bind_points(StageBits::empty(), false),
            vec![vk::PipelineBindPoint::GRAPHICS, vk::PipelineBindPoint::COMPUTE]
        );
        assert!(bind_points(StageBits::RAYGEN_SHADER, false).is_empty());
    }

    #[test]
    fn queues_bind_only_what_they_support() {
        let all = bind_points(StageBits::empty(), true);
        assert_eq!(queue_bind_points(&all, QueueType::Graphics), all);
        assert_eq!(
            queue_bind_points(&all, QueueType::Compute),
            vec![vk::PipelineBindPoint::COMPUTE, vk::PipelineBindPoint::RAY_TRACING_KHR]
        );
        let default_layout = bind_points(StageBits::empty(), false);
        assert_eq!(
            queue_bind_points(&default_layout, QueueType::Compute),
            vec![vk::PipelineBindPoint::COMPUTE]
        );
        assert!(queue_bind_points(&all, QueueType::Copy).is_empty());
    }

    #[test]
    fn set_count_is_bounded_by_the_device() {
        let ranges = [DescriptorRangeDesc::new(0, 1, DescriptorType::Texture, PS)];
        let sets = [DescriptorSetDesc {
            register_space: u32::MAX,
            ranges: &ranges,
            ..Default::default()
        }];
        let desc = PipelineLayoutDesc {
            descriptor_sets: &sets,
            ..Default::default()
        };
        let err = plan_layout(&desc, &SpirvBindingOffsets::default(), limits(128, false)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let sets = [DescriptorSetDesc {
            register_space: 8,
            ranges: &ranges,
            ..Default::default()
        }];
        let desc = PipelineLayoutDesc {
            descriptor_sets: &sets,
            ..Default::default()
        };
        assert!(plan_layout(&desc, &SpirvBindingOffsets::default(), limits(128, false)).is_err());
        let sets = [DescriptorSetDesc {
            register_space: 7,
            ..sets[0]
        }];
        let desc = PipelineLayoutDesc {
            descriptor_sets: &sets,
            ..Default::default()
        };
        let plan = plan_layout(&desc, &SpirvBindingOffsets::default(), limits(128, false))
            .expect("valid layout");
        assert_eq!(plan.sets.len(), 8);
    }

    #[test]
    fn overflowing_bindings_are_rejected() {
        let ranges = [DescriptorRangeDesc::new(u32::MAX - 1, 4, DescriptorType::Texture, PS)];
        let sets = [DescriptorSetDesc {
            register_space: 0,
            ranges: &ranges,
            ..Default::default()
        }];
        let desc = PipelineLayoutDesc {
            descriptor_sets: &sets,
            flags: PipelineLayoutBits::IGNORE_GLOBAL_SPIRV_OFFSETS,
            ..Default::default()
        };
        let err = plan_layout(&desc, &SpirvBindingOffsets::default(), limits(128, false)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        // s(MAX) with the default sampler offset.
        let samplers = [DescriptorRangeDesc::new(u32::MAX, 1, DescriptorType::Sampler, PS)];
        let sets = [DescriptorSetDesc {
            register_space: 0,
            ranges: &samplers,
            ..Default::default()
        }];
        let desc = PipelineLayoutDesc {
            descriptor_sets: &sets,
            ..Default::default()
        };
        let err = plan_layout(&desc, &SpirvBindingOffsets::default(), limits(128, false)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn overflowing_root_constants_are_rejected() {
        let constants = [
            RootConstantDesc {
                register_index: 0,
                size: u32::MAX - 3,
                shader_stages: PS,
            },
            RootConstantDesc {
                register_index: 1,
                size: 16,
                shader_stages: PS,
            },
        ];
        let desc = PipelineLayoutDesc {
            root_constants: &constants,
            ..Default::default()
        };
        let err = plan_layout(&desc, &SpirvBindingOffsets::default(), limits(u32::MAX, false))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
