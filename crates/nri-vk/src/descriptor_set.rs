//! Descriptor pools, descriptor sets and descriptor writes.

use std::slice;
use std::sync::Arc;

use ash::vk;
use nri_core::{
    DescriptorPoolBits, DescriptorPoolDesc, DescriptorRangeUpdateDesc, DescriptorSetCopyDesc,
    DescriptorType, Error, Result,
};
use tracing::debug;

use crate::descriptor::DescriptorVk;
use crate::device::DeviceVk;
use crate::error::VkResultExt;
use crate::pipeline_layout::{LayoutPlan, PipelineLayoutVk, RangePlan, SetPlan};
use crate::Vulkan;

#[derive(Debug)]
pub struct DescriptorPoolVk {
    pub(crate) handle: vk::DescriptorPool,
}

#[derive(Debug)]
pub struct DescriptorSetVk {
    pub(crate) handle: vk::DescriptorSet,
    pub(crate) plan: Arc<SetPlan>,
    /// Size of a trailing variable-sized range.
    pub(crate) variable_num: u32,
}

impl DescriptorSetVk {
    pub fn handle(&self) -> vk::DescriptorSet {
        self.handle
    }

    fn range(&self, index: u32) -> Result<&RangePlan> {
        self.plan
            .ranges
            .get(index as usize)
            .ok_or_else(|| Error::invalid(format!("descriptor range {index} does not exist")))
    }

    /// Descriptors a range holds in this set.
    fn capacity(&self, index: u32) -> Result<u32> {
        let range = self.range(index)?;
        let last = index as usize + 1 == self.plan.ranges.len();
        Ok(if last && self.plan.variable_sized {
            self.variable_num
        } else {
            range.descriptor_num
        })
    }
}

/// The plan of a set the layout declares, checked against the variable size
/// requested for its trailing range.
pub(crate) fn allocatable_set(
    layout: &LayoutPlan,
    set_index: u32,
    variable_descriptor_num: u32,
) -> Result<&Arc<SetPlan>> {
    let plan = layout
        .sets
        .get(set_index as usize)
        .ok_or_else(|| Error::invalid(format!("layout has no set {set_index}")))?;
    if layout.root_set == Some(set_index) {
        return Err(Error::invalid("the root descriptor set is pushed, not allocated"));
    }
    if plan.empty {
        return Err(Error::invalid(format!(
            "layout declares no descriptor set in register space {set_index}"
        )));
    }
    if plan.variable_sized {
        let max = plan.ranges.last().map_or(0, |r| r.descriptor_num);
        if variable_descriptor_num > max {
            return Err(Error::invalid(format!(
                "variable range holds at most {max} descriptors, {variable_descriptor_num} requested"
            )));
        }
    }
    Ok(plan)
}

/// Pool sizes for a pool description; structured buffers share `STORAGE_BUFFER`.
pub(crate) fn pool_sizes(desc: &DescriptorPoolDesc) -> Vec<vk::DescriptorPoolSize> {
    let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
    for ty in DescriptorType::ALL {
        let count = desc.max_num(ty);
        if count == 0 {
            continue;
        }
        let vk_type = crate::conversions::descriptor_type_to_vk(ty);
        match sizes.iter_mut().find(|s| s.ty == vk_type) {
            Some(size) => size.descriptor_count += count,
            None => sizes.push(vk::DescriptorPoolSize {
                ty: vk_type,
                descriptor_count: count,
            }),
        }
    }
    sizes
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriteKind {
    Image,
    Buffer,
    TexelBuffer,
    AccelerationStructure,
}

#[derive(Clone, Copy, Debug)]
struct PendingWrite {
    binding: u32,
    element: u32,
    ty: vk::DescriptorType,
    kind: WriteKind,
    /// Index into the info vector of `kind`.
    index: usize,
}

/// Descriptor infos collected before the native write structs borrow them.
#[derive(Default)]
pub(crate) struct WriteBatch {
    images: Vec<vk::DescriptorImageInfo>,
    buffers: Vec<vk::DescriptorBufferInfo>,
    texel_views: Vec<vk::BufferView>,
    structures: Vec<vk::AccelerationStructureKHR>,
    pending: Vec<PendingWrite>,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queue `descriptor` for binding slot `(binding, element)` of type `ty`.
    pub fn push(
        &mut self,
        binding: u32,
        element: u32,
        ty: vk::DescriptorType,
        descriptor: &DescriptorVk,
    ) -> Result<()> {
        let mismatch = || Error::invalid(format!("descriptor cannot be written as {ty:?}"));
        let (kind, index) = match ty {
            vk::DescriptorType::SAMPLER => match descriptor {
                DescriptorVk::Sampler(sampler) => {
                    self.images.push(vk::DescriptorImageInfo::default().sampler(*sampler));
                    (WriteKind::Image, self.images.len() - 1)
                }
                _ => return Err(mismatch()),
            },
            vk::DescriptorType::SAMPLED_IMAGE | vk::DescriptorType::STORAGE_IMAGE => {
                let view = descriptor.texture_view().map_err(|_| mismatch())?;
                let layout = if ty == vk::DescriptorType::STORAGE_IMAGE {
                    vk::ImageLayout::GENERAL
                } else {
                    view.layout
                };
                self.images.push(
                    vk::DescriptorImageInfo::default()
                        .image_view(view.view)
                        .image_layout(layout),
                );
                (WriteKind::Image, self.images.len() - 1)
            }
            vk::DescriptorType::UNIFORM_TEXEL_BUFFER | vk::DescriptorType::STORAGE_TEXEL_BUFFER => {
                let view = descriptor.buffer_view().map_err(|_| mismatch())?;
                if view.view == vk::BufferView::null() {
                    return Err(Error::invalid("typed buffer descriptors need a format"));
                }
                self.texel_views.push(view.view);
                (WriteKind::TexelBuffer, self.texel_views.len() - 1)
            }
            vk::DescriptorType::UNIFORM_BUFFER | vk::DescriptorType::STORAGE_BUFFER => {
                let view = descriptor.buffer_view().map_err(|_| mismatch())?;
                self.buffers.push(
                    vk::DescriptorBufferInfo::default()
                        .buffer(view.buffer)
                        .offset(view.offset)
                        .range(view.size),
                );
                (WriteKind::Buffer, self.buffers.len() - 1)
            }
            vk::DescriptorType::ACCELERATION_STRUCTURE_KHR => match descriptor {
                DescriptorVk::AccelerationStructure(handle) => {
                    self.structures.push(*handle);
                    (WriteKind::AccelerationStructure, self.structures.len() - 1)
                }
                _ => return Err(mismatch()),
            },
            _ => return Err(mismatch()),
        };
        self.pending.push(PendingWrite {
            binding,
            element,
            ty,
            kind,
            index,
        });
        Ok(())
    }

    /// Queue `descriptors` into `range` starting at descriptor `base`.
    pub fn push_range(
        &mut self,
        range: &RangePlan,
        base: u32,
        descriptors: &[&DescriptorVk],
    ) -> Result<()> {
        for (i, descriptor) in descriptors.iter().enumerate() {
            let (binding, element) = range.slot(base + i as u32);
            self.push(binding, element, range.vk_type, descriptor)?;
        }
        Ok(())
    }

    /// Native writes into `dst`, handed to `f` while the infos are borrowed.
    pub fn with_writes<R>(
        &self,
        dst: vk::DescriptorSet,
        f: impl FnOnce(&[vk::WriteDescriptorSet<'_>]) -> R,
    ) -> R {
        let mut structure_infos: Vec<_> = self
            .pending
            .iter()
            .filter(|w| w.kind == WriteKind::AccelerationStructure)
            .map(|w| {
                vk::WriteDescriptorSetAccelerationStructureKHR::default()
                    .acceleration_structures(slice::from_ref(&self.structures[w.index]))
            })
            .collect();
        let mut structure_infos = structure_infos.iter_mut();

        let mut writes = Vec::with_capacity(self.pending.len());
        for w in &self.pending {
            let write = vk::WriteDescriptorSet::default()
                .dst_set(dst)
                .dst_binding(w.binding)
                .dst_array_element(w.element)
                .descriptor_type(w.ty);
            let write = match w.kind {
                WriteKind::Image => write.image_info(slice::from_ref(&self.images[w.index])),
                WriteKind::Buffer => write.buffer_info(slice::from_ref(&self.buffers[w.index])),
                WriteKind::TexelBuffer => {
                    write.texel_buffer_view(slice::from_ref(&self.texel_views[w.index]))
                }
                WriteKind::AccelerationStructure => match structure_infos.next() {
                    Some(info) => write.descriptor_count(1).push_next(info),
                    None => continue,
                },
            };
            writes.push(write);
        }
        f(&writes)
    }
}

/// Copies between two ranges of equal shape.
fn range_copies(
    src: vk::DescriptorSet,
    src_range: &RangePlan,
    dst: vk::DescriptorSet,
    dst_range: &RangePlan,
    count: u32,
) -> Result<Vec<vk::CopyDescriptorSet<'static>>> {
    if src_range.vk_type != dst_range.vk_type || src_range.is_array != dst_range.is_array {
        return Err(Error::invalid("copied ranges differ in type or shape"));
    }
    let copy = |src_binding, dst_binding, descriptor_count| {
        vk::CopyDescriptorSet::default()
            .src_set(src)
            .src_binding(src_binding)
            .dst_set(dst)
            .dst_binding(dst_binding)
            .descriptor_count(descriptor_count)
    };
    Ok(if src_range.is_array {
        vec![copy(src_range.first_binding, dst_range.first_binding, count)]
    } else {
        (0..count)
            .map(|i| copy(src_range.first_binding + i, dst_range.first_binding + i, 1))
            .collect()
    })
}

impl DeviceVk {
    pub(crate) fn create_descriptor_pool_impl(
        &self,
        desc: &DescriptorPoolDesc,
    ) -> Result<DescriptorPoolVk> {
        let sizes = pool_sizes(desc);
        let mut flags = vk::DescriptorPoolCreateFlags::empty();
        if desc.flags.contains(DescriptorPoolBits::ALLOW_UPDATE_AFTER_SET) {
            flags |= vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND;
        }
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(flags)
            .max_sets(desc.descriptor_set_max_num.max(1))
            .pool_sizes(&sizes);
        let handle = unsafe { self.shared.device.create_descriptor_pool(&info, None) }
            .or_nri("vkCreateDescriptorPool")?;
        debug!("Created descriptor pool {:?} ({} sets)", handle, desc.descriptor_set_max_num);
        Ok(DescriptorPoolVk { handle })
    }

    pub(crate) fn allocate_descriptor_sets_impl(
        &self,
        pool: &DescriptorPoolVk,
        layout: &PipelineLayoutVk,
        set_index: u32,
        num: u32,
        variable_descriptor_num: u32,
    ) -> Result<Vec<DescriptorSetVk>> {
        let plan = allocatable_set(&layout.plan, set_index, variable_descriptor_num)?;
        if num == 0 {
            return Ok(Vec::new());
        }

        let set_layouts = vec![layout.set_layouts[set_index as usize]; num as usize];
        let counts = vec![variable_descriptor_num; num as usize];
        let mut variable =
            vk::DescriptorSetVariableDescriptorCountAllocateInfo::default().descriptor_counts(&counts);
        let mut info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool.handle)
            .set_layouts(&set_layouts);
        if plan.variable_sized {
            info = info.push_next(&mut variable);
        }
        let handles = unsafe { self.shared.device.allocate_descriptor_sets(&info) }
            .or_nri("vkAllocateDescriptorSets")?;

        Ok(handles
            .into_iter()
            .map(|handle| DescriptorSetVk {
                handle,
                plan: Arc::clone(plan),
                variable_num: if plan.variable_sized {
                    variable_descriptor_num
                } else {
                    0
                },
            })
            .collect())
    }

    pub(crate) unsafe fn update_descriptor_ranges_impl(
        &self,
        set: &DescriptorSetVk,
        base_range: u32,
        updates: &[DescriptorRangeUpdateDesc<'_, Vulkan>],
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        for (i, update) in updates.iter().enumerate() {
            let index = base_range
                .checked_add(i as u32)
                .ok_or_else(|| Error::invalid("descriptor range index overflows"))?;
            let capacity = set.capacity(index)?;
            let end = update.base_descriptor as usize + update.descriptors.len();
            if end > capacity as usize {
                return Err(Error::invalid(format!(
                    "range {index} holds {capacity} descriptors, the update ends at {end}"
                )));
            }
            batch.push_range(set.range(index)?, update.base_descriptor, update.descriptors)?;
        }
        if !batch.is_empty() {
            batch.with_writes(set.handle, |writes| unsafe {
                self.shared.device.update_descriptor_sets(writes, &[]);
            });
        }
        Ok(())
    }

    pub(crate) unsafe fn copy_descriptor_set_impl(
        &self,
        dst: &DescriptorSetVk,
        desc: &DescriptorSetCopyDesc<'_, Vulkan>,
    ) -> Result<()> {
        let src = desc.src_descriptor_set;
        let mut copies = Vec::new();
        for i in 0..desc.range_num {
            let (Some(src_index), Some(dst_index)) = (
                desc.src_base_range.checked_add(i),
                desc.dst_base_range.checked_add(i),
            ) else {
                return Err(Error::invalid("descriptor range index overflows"));
            };
            let count = src.capacity(src_index)?.min(dst.capacity(dst_index)?);
            copies.extend(range_copies(
                src.handle,
                src.range(src_index)?,
                dst.handle,
                dst.range(dst_index)?,
                count,
            )?);
        }
        self.shared.device.update_descriptor_sets(&[], &copies);
        Ok(())
    }

    pub(crate) unsafe fn reset_descriptor_pool_impl(&self, pool: &DescriptorPoolVk) -> Result<()> {
        self.shared
            .device
            .reset_descriptor_pool(pool.handle, vk::DescriptorPoolResetFlags::empty())
            .or_nri("vkResetDescriptorPool")
    }

    pub(crate) unsafe fn destroy_descriptor_pool_impl(&self, pool: DescriptorPoolVk) {
        self.shared.device.destroy_descriptor_pool(pool.handle, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::BufferViewVk;
    use ash::vk::Handle;

    fn range(first_binding: u32, descriptor_num: u32, is_array: bool, ty: DescriptorType) -> RangePlan {
        RangePlan {
            first_binding,
            descriptor_num,
            is_array,
            descriptor_type: ty,
            vk_type: crate::conversions::descriptor_type_to_vk(ty),
        }
    }

    fn buffer_descriptor(raw: u64, offset: u64, size: u64) -> DescriptorVk {
        DescriptorVk::Buffer(BufferViewVk {
            buffer: vk::Buffer::from_raw(raw),
            view: vk::BufferView::null(),
            offset,
            size,
        })
    }

    fn layout_plan() -> LayoutPlan {
        let fixed = SetPlan {
            register_space: 0,
            ranges: vec![range(0, 4, false, DescriptorType::Texture)],
            ..Default::default()
        };
        let filler = SetPlan {
            register_space: 1,
            empty: true,
            ..Default::default()
        };
        let bindless = SetPlan {
            register_space: 2,
            ranges: vec![
                range(0, 1, false, DescriptorType::Sampler),
                range(1, 64, true, DescriptorType::Texture),
            ],
            variable_sized: true,
            ..Default::default()
        };
        LayoutPlan {
            sets: vec![Arc::new(fixed), Arc::new(filler), Arc::new(bindless)],
            ..Default::default()
        }
    }

    #[test]
    fn only_declared_sets_are_allocatable() {
        let layout = layout_plan();
        assert!(allocatable_set(&layout, 0, 0).is_ok());
        for set_index in [1, 3] {
            let err = allocatable_set(&layout, set_index, 0).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "set {set_index}");
        }

        let pushed = LayoutPlan {
            root_set: Some(0),
            ..layout
        };
        assert!(matches!(
            allocatable_set(&pushed, 0, 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn variable_counts_are_bounded_by_the_range() {
        let layout = layout_plan();
        assert!(allocatable_set(&layout, 2, 64).is_ok());
        assert!(allocatable_set(&layout, 2, 0).is_ok());
        assert!(matches!(
            allocatable_set(&layout, 2, 65),
            Err(Error::InvalidArgument(_))
        ));
        // Sets without a variable range ignore the count.
        assert!(allocatable_set(&layout, 0, 1000).is_ok());
    }

    #[test]
    fn structured_buffers_share_a_pool_size() {
        let desc = DescriptorPoolDesc {
            descriptor_set_max_num: 4,
            structured_buffer_max_num: 3,
            storage_structured_buffer_max_num: 5,
            texture_max_num: 8,
            ..Default::default()
        };
        let sizes = pool_sizes(&desc);
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[0].ty, vk::DescriptorType::SAMPLED_IMAGE);
        assert_eq!(sizes[0].descriptor_count, 8);
        assert_eq!(sizes[1].ty, vk::DescriptorType::STORAGE_BUFFER);
        assert_eq!(sizes[1].descriptor_count, 8);
    }

    #[test]
    fn writes_follow_range_shape() {
        let a = buffer_descriptor(1, 0, 64);
        let b = buffer_descriptor(2, 256, 128);

        let mut batch = WriteBatch::default();
        let split = range(300, 4, false, DescriptorType::StorageStructuredBuffer);
        batch.push_range(&split, 1, &[&a, &b]).expect("valid writes");
        let array = range(10, 8, true, DescriptorType::StructuredBuffer);
        batch.push_range(&array, 6, &[&b]).expect("valid writes");

        let set = vk::DescriptorSet::from_raw(7);
        let slots = batch.with_writes(set, |writes| {
            writes
                .iter()
                .map(|w| (w.dst_binding, w.dst_array_element, w.descriptor_count))
                .collect::<Vec<_>>()
        });
        assert_eq!(slots, vec![(301, 0, 1), (302, 0, 1), (10, 6, 1)]);
        assert_eq!(batch.buffers[1].offset, 256);
        assert_eq!(batch.buffers[1].range, 128);
    }

    #[test]
    fn mismatched_descriptors_are_rejected() {
        let buffer = buffer_descriptor(1, 0, 64);
        let sampler = DescriptorVk::Sampler(vk::Sampler::from_raw(3));
        let mut batch = WriteBatch::default();
        assert!(batch
            .push(0, 0, vk::DescriptorType::SAMPLED_IMAGE, &buffer)
            .is_err());
        assert!(batch
            .push(0, 0, vk::DescriptorType::UNIFORM_BUFFER, &sampler)
            .is_err());
        // Raw views cannot back typed buffer descriptors.
        assert!(batch
            .push(0, 0, vk::DescriptorType::UNIFORM_TEXEL_BUFFER, &buffer)
            .is_err());
        assert!(batch.push(0, 0, vk::DescriptorType::SAMPLER, &sampler).is_ok());
        assert!(!batch.is_empty());
    }

    #[test]
    fn acceleration_structures_chain_their_info() {
        let tlas = DescriptorVk::AccelerationStructure(vk::AccelerationStructureKHR::from_raw(9));
        let mut batch = WriteBatch::default();
        batch
            .push(5, 0, vk::DescriptorType::ACCELERATION_STRUCTURE_KHR, &tlas)
            .expect("valid write");
        batch.with_writes(vk::DescriptorSet::null(), |writes| {
            assert_eq!(writes.len(), 1);
            assert_eq!(writes[0].descriptor_count, 1);
            assert!(!writes[0].p_next.is_null());
        });
    }

    #[test]
    fn copies_match_range_shape() {
        let src = vk::DescriptorSet::from_raw(1);
        let dst = vk::DescriptorSet::from_raw(2);
        let split = range(4, 3, false, DescriptorType::Texture);
        let copies = range_copies(src, &split, dst, &range(0, 3, false, DescriptorType::Texture), 3)
            .expect("same shape");
        let bindings: Vec<_> = copies.iter().map(|c| (c.src_binding, c.dst_binding)).collect();
        assert_eq!(bindings, vec![(4, 0), (5, 1), (6, 2)]);

        let array = range(0, 16, true, DescriptorType::Texture);
        let copies = range_copies(src, &array, dst, &array, 16).expect("same shape");
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].descriptor_count, 16);

        assert!(range_copies(src, &split, dst, &array, 3).is_err());
    }
}
