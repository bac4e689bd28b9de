//! Synchronisation2 barrier translation.

use ash::vk;
use nri_core::{BufferBarrierDesc, GlobalBarrierDesc, TextureBarrierDesc};

use crate::conversions::{access_to_vk, layout_to_vk, planes_to_aspect, stages_to_vk};
use crate::Vulkan;

pub(crate) fn memory_barrier(desc: &GlobalBarrierDesc) -> vk::MemoryBarrier2<'static> {
    vk::MemoryBarrier2::default()
        .src_stage_mask(stages_to_vk(desc.before.stages))
        .src_access_mask(access_to_vk(desc.before.access))
        .dst_stage_mask(stages_to_vk(desc.after.stages))
        .dst_access_mask(access_to_vk(desc.after.access))
}

pub(crate) fn buffer_barrier(desc: &BufferBarrierDesc<'_, Vulkan>) -> vk::BufferMemoryBarrier2<'static> {
    vk::BufferMemoryBarrier2::default()
        .src_stage_mask(stages_to_vk(desc.before.stages))
        .src_access_mask(access_to_vk(desc.before.access))
        .dst_stage_mask(stages_to_vk(desc.after.stages))
        .dst_access_mask(access_to_vk(desc.after.access))
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .buffer(desc.buffer.handle)
        .offset(0)
        .size(vk::WHOLE_SIZE)
}

/// Queue families of an ownership transfer; ignored unless the families differ.
fn queue_families(src: Option<u32>, dst: Option<u32>) -> (u32, u32) {
    match (src, dst) {
        (Some(src), Some(dst)) if src != dst => (src, dst),
        _ => (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED),
    }
}

pub(crate) fn texture_barrier(desc: &TextureBarrierDesc<'_, Vulkan>) -> vk::ImageMemoryBarrier2<'static> {
    let texture = desc.texture;
    let (src_family, dst_family) = queue_families(
        desc.src_queue.map(|q| q.family_index),
        desc.dst_queue.map(|q| q.family_index),
    );
    let range = vk::ImageSubresourceRange {
        aspect_mask: planes_to_aspect(desc.planes, texture.desc.format),
        base_mip_level: desc.mip_offset,
        level_count: texture.desc.resolve_mips(desc.mip_offset, desc.mip_num),
        base_array_layer: desc.layer_offset,
        layer_count: texture.desc.resolve_layers(desc.layer_offset, desc.layer_num),
    };
    vk::ImageMemoryBarrier2::default()
        .src_stage_mask(stages_to_vk(desc.before.stages))
        .src_access_mask(access_to_vk(desc.before.access))
        .dst_stage_mask(stages_to_vk(desc.after.stages))
        .dst_access_mask(access_to_vk(desc.after.access))
        .old_layout(layout_to_vk(desc.before.layout))
        .new_layout(layout_to_vk(desc.after.layout))
        .src_queue_family_index(src_family)
        .dst_queue_family_index(dst_family)
        .image(texture.handle)
        .subresource_range(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureVk;
    use nri_core::{
        AccessBits, AccessLayoutStage, AccessStage, Format, Layout, PlaneBits, StageBits,
        TextureDesc,
    };

    #[test]
    fn global_barriers_map_access_and_stages() {
        let barrier = memory_barrier(&GlobalBarrierDesc {
            before: AccessStage::new(AccessBits::COPY_DESTINATION, StageBits::COPY),
            after: AccessStage::new(AccessBits::SHADER_RESOURCE, StageBits::FRAGMENT_SHADER),
        });
        assert_eq!(barrier.src_stage_mask, vk::PipelineStageFlags2::COPY);
        assert_eq!(barrier.src_access_mask, vk::AccessFlags2::TRANSFER_WRITE);
        assert_eq!(barrier.dst_stage_mask, vk::PipelineStageFlags2::FRAGMENT_SHADER);
        assert_eq!(barrier.dst_access_mask, vk::AccessFlags2::SHADER_READ);
    }

    #[test]
    fn ownership_transfers_need_distinct_families() {
        assert_eq!(queue_families(Some(0), Some(2)), (0, 2));
        assert_eq!(
            queue_families(Some(1), Some(1)),
            (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED)
        );
        assert_eq!(
            queue_families(None, Some(1)),
            (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED)
        );
    }

    #[test]
    fn texture_barriers_resolve_ranges_and_planes() {
        let desc = TextureDesc::texture_2d(Format::D24UnormS8Uint, 256, 256, 4, 2);
        let texture = TextureVk::swap_chain_image(vk::Image::null(), desc);

        let mut barrier = TextureBarrierDesc::<Vulkan>::new(
            &texture,
            AccessLayoutStage::UNDEFINED,
            AccessLayoutStage::new(
                AccessBits::DEPTH_STENCIL_ATTACHMENT_WRITE,
                Layout::DepthStencilAttachment,
                StageBits::DEPTH_STENCIL_ATTACHMENT,
            ),
        );
        barrier.mip_offset = 1;
        let native = texture_barrier(&barrier);
        assert_eq!(native.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(native.new_layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        assert_eq!(native.src_stage_mask, vk::PipelineStageFlags2::NONE);
        assert_eq!(
            native.dst_stage_mask,
            vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS
        );
        let range = native.subresource_range;
        assert_eq!((range.base_mip_level, range.level_count), (1, 3));
        assert_eq!(range.layer_count, 2);
        assert_eq!(
            range.aspect_mask,
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );

        barrier.planes = PlaneBits::STENCIL;
        assert_eq!(
            texture_barrier(&barrier).subresource_range.aspect_mask,
            vk::ImageAspectFlags::STENCIL
        );
    }
}
