//! Command allocators and command buffer recording.

use std::ffi::CString;
use std::sync::Arc;

use ash::vk;
use nri_core::{
    AttachmentsDesc, BarrierGroupDesc, ClearDesc, Color, CommandBufferInterface, DispatchDesc,
    DrawDesc, DrawIndexedDesc, Error, IndexType, IndirectDesc, MeshShaderInterface, QueueType,
    Rect, Result, TextureDataLayoutDesc, TextureRegionDesc, Viewport,
};
use tracing::{debug, warn};

use crate::barrier::{buffer_barrier, memory_barrier, texture_barrier};
use crate::buffer::BufferVk;
use crate::conversions::index_type_to_vk;
use crate::descriptor::{DescriptorVk, TextureViewVk};
use crate::descriptor_set::{DescriptorPoolVk, DescriptorSetVk, WriteBatch};
use crate::device::{DeviceShared, DeviceVk};
use crate::error::VkResultExt;
use crate::pipeline::PipelineVk;
use crate::pipeline_layout::{queue_bind_points, LayoutPlan, PipelineLayoutVk};
use crate::query_pool::QueryPoolVk;
use crate::queue::QueueVk;
use crate::texture::TextureVk;
use crate::transfer::{
    buffer_image_copy, clear_attachment, clear_color, clear_rects, image_copies, image_resolves,
    rect_to_vk, viewport_to_vk,
};
use crate::Vulkan;

#[derive(Debug)]
pub struct CommandAllocatorVk {
    pub(crate) handle: vk::CommandPool,
    pub(crate) queue_type: QueueType,
}

impl CommandAllocatorVk {
    pub fn handle(&self) -> vk::CommandPool {
        self.handle
    }
}

/// Layout state commands resolve root constants and descriptors against.
#[derive(Debug, Clone)]
struct BoundLayout {
    handle: vk::PipelineLayout,
    plan: Arc<LayoutPlan>,
    bind_points: Vec<vk::PipelineBindPoint>,
}

/// What the open rendering pass covers.
#[derive(Debug, Clone, Copy, Default)]
struct RenderingState {
    area: vk::Rect2D,
    layer_count: u32,
    depth_stencil_aspects: vk::ImageAspectFlags,
}

#[derive(Debug)]
pub struct CommandBufferVk {
    pub(crate) shared: Arc<DeviceShared>,
    pub(crate) handle: vk::CommandBuffer,
    pub(crate) pool: vk::CommandPool,
    pub(crate) queue_type: QueueType,
    layout: Option<BoundLayout>,
    rendering: Option<RenderingState>,
}

/// Area and layer count every attachment can cover.
pub(crate) fn render_area<'a>(views: impl IntoIterator<Item = &'a TextureViewVk>) -> (vk::Rect2D, u32) {
    let mut extent = vk::Extent2D {
        width: u32::MAX,
        height: u32::MAX,
    };
    let mut layers = u32::MAX;
    let mut any = false;
    for view in views {
        any = true;
        extent.width = extent.width.min(view.extent.width);
        extent.height = extent.height.min(view.extent.height);
        layers = layers.min(view.range.layer_count);
    }
    if !any {
        return (vk::Rect2D::default(), 0);
    }
    (
        vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent,
        },
        layers,
    )
}

fn attachment_info(view: &TextureViewVk, layout: vk::ImageLayout) -> vk::RenderingAttachmentInfo<'static> {
    vk::RenderingAttachmentInfo::default()
        .image_view(view.view)
        .image_layout(layout)
        .load_op(vk::AttachmentLoadOp::LOAD)
        .store_op(vk::AttachmentStoreOp::STORE)
}

impl CommandBufferVk {
    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }

    fn device(&self) -> &ash::Device {
        &self.shared.device
    }

    fn layout(&self) -> Result<&BoundLayout> {
        self.layout
            .as_ref()
            .ok_or_else(|| Error::invalid("no pipeline layout is bound"))
    }

    /// The bound layout, if descriptors can be bound with it on this queue.
    fn descriptor_layout(&self) -> Result<&BoundLayout> {
        let layout = self.layout()?;
        if layout.bind_points.is_empty() {
            return Err(Error::invalid(format!(
                "the bound layout has no bind point usable on a {:?} queue",
                self.queue_type
            )));
        }
        Ok(layout)
    }

    unsafe fn indirect(&self, desc: &IndirectDesc<'_, Vulkan>, indexed: bool) {
        let device = self.device();
        let buffer = desc.buffer.handle;
        match (desc.count_buffer, indexed) {
            (Some((count, count_offset)), false) => device.cmd_draw_indirect_count(
                self.handle,
                buffer,
                desc.offset,
                count.handle,
                count_offset,
                desc.draw_num,
                desc.stride,
            ),
            (Some((count, count_offset)), true) => device.cmd_draw_indexed_indirect_count(
                self.handle,
                buffer,
                desc.offset,
                count.handle,
                count_offset,
                desc.draw_num,
                desc.stride,
            ),
            (None, false) => {
                device.cmd_draw_indirect(self.handle, buffer, desc.offset, desc.draw_num, desc.stride)
            }
            (None, true) => device.cmd_draw_indexed_indirect(
                self.handle,
                buffer,
                desc.offset,
                desc.draw_num,
                desc.stride,
            ),
        }
    }
}

impl CommandBufferInterface<Vulkan> for CommandBufferVk {
    unsafe fn begin(&mut self, _descriptor_pool: Option<&DescriptorPoolVk>) -> Result<()> {
        let info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        self.device()
            .begin_command_buffer(self.handle, &info)
            .or_nri("vkBeginCommandBuffer")?;
        self.layout = None;
        self.rendering = None;
        Ok(())
    }

    unsafe fn end(&mut self) -> Result<()> {
        if self.rendering.is_some() {
            return Err(Error::invalid("end called inside begin_rendering"));
        }
        self.device()
            .end_command_buffer(self.handle)
            .or_nri("vkEndCommandBuffer")
    }

    unsafe fn set_viewports(&mut self, viewports: &[Viewport]) {
        let viewports: Vec<_> = viewports.iter().map(viewport_to_vk).collect();
        self.device().cmd_set_viewport_with_count(self.handle, &viewports);
    }

    unsafe fn set_scissors(&mut self, rects: &[Rect]) {
        let rects: Vec<_> = rects.iter().map(rect_to_vk).collect();
        self.device().cmd_set_scissor_with_count(self.handle, &rects);
    }

    unsafe fn set_depth_bounds(&mut self, min: f32, max: f32) {
        self.device().cmd_set_depth_bounds(self.handle, min, max);
    }

    unsafe fn set_stencil_reference(&mut self, front: u8, back: u8) {
        let device = self.device();
        device.cmd_set_stencil_reference(self.handle, vk::StencilFaceFlags::FRONT, u32::from(front));
        device.cmd_set_stencil_reference(self.handle, vk::StencilFaceFlags::BACK, u32::from(back));
    }

    unsafe fn set_blend_constants(&mut self, color: [f32; 4]) {
        self.device().cmd_set_blend_constants(self.handle, &color);
    }

    unsafe fn begin_rendering(&mut self, attachments: &AttachmentsDesc<'_, Vulkan>) -> Result<()> {
        if self.rendering.is_some() {
            return Err(Error::invalid("rendering is already in progress"));
        }
        if attachments.shading_rate.is_some() {
            return Err(Error::unsupported("shading rate attachments"));
        }
        let colors = attachments
            .colors
            .iter()
            .map(|d| d.texture_view())
            .collect::<Result<Vec<_>>>()?;
        let depth_stencil = attachments.depth_stencil.map(|d| d.texture_view()).transpose()?;

        let (area, layer_count) = render_area(colors.iter().copied().chain(depth_stencil));
        let color_infos: Vec<_> = colors
            .iter()
            .map(|v| attachment_info(v, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL))
            .collect();
        let aspects = depth_stencil.map_or(vk::ImageAspectFlags::empty(), |v| v.range.aspect_mask);
        let depth_info = depth_stencil
            .filter(|_| aspects.contains(vk::ImageAspectFlags::DEPTH))
            .map(|v| attachment_info(v, v.layout));
        let stencil_info = depth_stencil
            .filter(|_| aspects.contains(vk::ImageAspectFlags::STENCIL))
            .map(|v| attachment_info(v, v.layout));

        let layers = if attachments.view_mask != 0 { 1 } else { layer_count.max(1) };
        let mut info = vk::RenderingInfo::default()
            .render_area(area)
            .layer_count(layers)
            .view_mask(attachments.view_mask)
            .color_attachments(&color_infos);
        if let Some(depth) = &depth_info {
            info = info.depth_attachment(depth);
        }
        if let Some(stencil) = &stencil_info {
            info = info.stencil_attachment(stencil);
        }
        self.device().cmd_begin_rendering(self.handle, &info);
        self.rendering = Some(RenderingState {
            area,
            layer_count: layers,
            depth_stencil_aspects: aspects,
        });
        Ok(())
    }

    unsafe fn clear_attachments(&mut self, clears: &[ClearDesc], rects: &[Rect]) {
        let Some(state) = self.rendering else {
            warn!("clear_attachments outside begin_rendering is ignored");
            return;
        };
        let attachments: Vec<_> = clears
            .iter()
            .map(|c| clear_attachment(c, state.depth_stencil_aspects))
            .filter(|a| !a.aspect_mask.is_empty())
            .collect();
        if attachments.is_empty() {
            return;
        }
        let rects = clear_rects(rects, state.area, state.layer_count);
        self.device()
            .cmd_clear_attachments(self.handle, &attachments, &rects);
    }

    unsafe fn end_rendering(&mut self) {
        if self.rendering.take().is_some() {
            self.device().cmd_end_rendering(self.handle);
        }
    }

    unsafe fn set_vertex_buffers(&mut self, base_slot: u32, buffers: &[&BufferVk], offsets: &[u64]) {
        let handles: Vec<_> = buffers.iter().map(|b| b.handle).collect();
        let offsets: Vec<_> = (0..handles.len())
            .map(|i| offsets.get(i).copied().unwrap_or(0))
            .collect();
        self.device()
            .cmd_bind_vertex_buffers(self.handle, base_slot, &handles, &offsets);
    }

    unsafe fn set_index_buffer(&mut self, buffer: &BufferVk, offset: u64, index_type: IndexType) {
        self.device().cmd_bind_index_buffer(
            self.handle,
            buffer.handle,
            offset,
            index_type_to_vk(index_type),
        );
    }

    unsafe fn set_pipeline_layout(&mut self, layout: &PipelineLayoutVk) {
        self.layout = Some(BoundLayout {
            handle: layout.handle,
            plan: Arc::clone(&layout.plan),
            bind_points: queue_bind_points(&layout.bind_points, self.queue_type),
        });
    }

    unsafe fn set_pipeline(&mut self, pipeline: &PipelineVk) {
        self.device()
            .cmd_bind_pipeline(self.handle, pipeline.bind_point, pipeline.handle);
    }

    unsafe fn set_descriptor_pool(&mut self, _pool: &DescriptorPoolVk) {
        // Sets carry their pool; nothing is bound natively.
    }

    unsafe fn set_descriptor_set(
        &mut self,
        set_index: u32,
        set: &DescriptorSetVk,
        dynamic_offsets: &[u32],
    ) -> Result<()> {
        let layout = self.descriptor_layout()?;
        if set_index as usize >= layout.plan.sets.len() || layout.plan.root_set == Some(set_index) {
            return Err(Error::invalid(format!(
                "set {set_index} is not a descriptor set of the bound layout"
            )));
        }
        for &bind_point in &layout.bind_points {
            self.shared.device.cmd_bind_descriptor_sets(
                self.handle,
                bind_point,
                layout.handle,
                set_index,
                &[set.handle],
                dynamic_offsets,
            );
        }
        Ok(())
    }

    unsafe fn set_root_constants(&mut self, root_constant_index: u32, data: &[u8]) -> Result<()> {
        let layout = self.layout()?;
        let range = layout
            .plan
            .push_constants
            .get(root_constant_index as usize)
            .ok_or_else(|| Error::invalid(format!("no root constant {root_constant_index}")))?;
        if data.len() as u32 > range.size || data.len() % 4 != 0 {
            return Err(Error::invalid(format!(
                "{} bytes do not fit root constant {root_constant_index} ({} bytes)",
                data.len(),
                range.size
            )));
        }
        self.shared.device.cmd_push_constants(
            self.handle,
            layout.handle,
            range.stages,
            range.offset,
            data,
        );
        Ok(())
    }

    unsafe fn set_root_descriptor(
        &mut self,
        root_descriptor_index: u32,
        descriptor: &DescriptorVk,
    ) -> Result<()> {
        let layout = self.descriptor_layout()?;
        let (Some(set), Some(root)) = (
            layout.plan.root_set,
            layout.plan.root_descriptors.get(root_descriptor_index as usize),
        ) else {
            return Err(Error::invalid(format!(
                "no root descriptor {root_descriptor_index}"
            )));
        };
        let Some(push_descriptor) = &self.shared.extensions.push_descriptor else {
            return Err(Error::unsupported("VK_KHR_push_descriptor is not enabled"));
        };
        let mut batch = WriteBatch::default();
        batch.push(root.binding, 0, root.descriptor_type, descriptor)?;
        batch.with_writes(vk::DescriptorSet::null(), |writes| {
            for &bind_point in &layout.bind_points {
                // SAFETY: recording into this command buffer is the caller's contract.
                unsafe {
                    push_descriptor.cmd_push_descriptor_set(
                        self.handle,
                        bind_point,
                        layout.handle,
                        set,
                        writes,
                    )
                };
            }
        });
        Ok(())
    }

    unsafe fn draw(&mut self, desc: &DrawDesc) {
        self.device().cmd_draw(
            self.handle,
            desc.vertex_num,
            desc.instance_num,
            desc.base_vertex,
            desc.base_instance,
        );
    }

    unsafe fn draw_indexed(&mut self, desc: &DrawIndexedDesc) {
        self.device().cmd_draw_indexed(
            self.handle,
            desc.index_num,
            desc.instance_num,
            desc.base_index,
            desc.base_vertex,
            desc.base_instance,
        );
    }

    unsafe fn draw_indirect(&mut self, desc: &IndirectDesc<'_, Vulkan>) {
        self.indirect(desc, false);
    }

    unsafe fn draw_indexed_indirect(&mut self, desc: &IndirectDesc<'_, Vulkan>) {
        self.indirect(desc, true);
    }

    unsafe fn dispatch(&mut self, desc: &DispatchDesc) {
        self.device().cmd_dispatch(self.handle, desc.x, desc.y, desc.z);
    }

    unsafe fn dispatch_indirect(&mut self, buffer: &BufferVk, offset: u64) {
        self.device()
            .cmd_dispatch_indirect(self.handle, buffer.handle, offset);
    }

    unsafe fn barrier(&mut self, group: &BarrierGroupDesc<'_, Vulkan>) {
        let memory: Vec<_> = group.globals.iter().map(memory_barrier).collect();
        let buffers: Vec<_> = group.buffers.iter().map(buffer_barrier).collect();
        let images: Vec<_> = group.textures.iter().map(texture_barrier).collect();
        if memory.is_empty() && buffers.is_empty() && images.is_empty() {
            return;
        }
        let info = vk::DependencyInfo::default()
            .memory_barriers(&memory)
            .buffer_memory_barriers(&buffers)
            .image_memory_barriers(&images);
        self.device().cmd_pipeline_barrier2(self.handle, &info);
    }

    unsafe fn copy_buffer(
        &mut self,
        dst: &BufferVk,
        dst_offset: u64,
        src: &BufferVk,
        src_offset: u64,
        size: u64,
    ) {
        let size = match src.resolve_range(src_offset, size) {
            Ok(size) => size,
            Err(e) => {
                warn!("copy_buffer skipped: {e}");
                return;
            }
        };
        let region = vk::BufferCopy {
            src_offset,
            dst_offset,
            size,
        };
        self.device()
            .cmd_copy_buffer(self.handle, src.handle, dst.handle, &[region]);
    }

    unsafe fn copy_texture(
        &mut self,
        dst: &TextureVk,
        dst_region: Option<&TextureRegionDesc>,
        src: &TextureVk,
        src_region: Option<&TextureRegionDesc>,
    ) {
        let regions = image_copies(&dst.desc, dst_region, &src.desc, src_region);
        self.device().cmd_copy_image(
            self.handle,
            src.handle,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            dst.handle,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &regions,
        );
    }

    unsafe fn upload_buffer_to_texture(
        &mut self,
        dst: &TextureVk,
        dst_region: &TextureRegionDesc,
        src: &BufferVk,
        src_layout: &TextureDataLayoutDesc,
    ) {
        let region = buffer_image_copy(&dst.desc, dst_region, src_layout);
        self.device().cmd_copy_buffer_to_image(
            self.handle,
            src.handle,
            dst.handle,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );
    }

    unsafe fn readback_texture_to_buffer(
        &mut self,
        dst: &BufferVk,
        dst_layout: &TextureDataLayoutDesc,
        src: &TextureVk,
        src_region: &TextureRegionDesc,
    ) {
        let region = buffer_image_copy(&src.desc, src_region, dst_layout);
        self.device().cmd_copy_image_to_buffer(
            self.handle,
            src.handle,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            dst.handle,
            &[region],
        );
    }

    unsafe fn resolve_texture(
        &mut self,
        dst: &TextureVk,
        dst_region: Option<&TextureRegionDesc>,
        src: &TextureVk,
        src_region: Option<&TextureRegionDesc>,
    ) {
        let regions = image_resolves(&dst.desc, dst_region, &src.desc, src_region);
        self.device().cmd_resolve_image(
            self.handle,
            src.handle,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            dst.handle,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &regions,
        );
    }

    unsafe fn clear_storage_buffer(&mut self, storage_buffer: &DescriptorVk, value: u32) {
        let Ok(view) = storage_buffer.buffer_view() else {
            warn!("clear_storage_buffer needs a buffer view");
            return;
        };
        self.device()
            .cmd_fill_buffer(self.handle, view.buffer, view.offset, view.size, value);
    }

    unsafe fn clear_storage_texture(&mut self, storage_texture: &DescriptorVk, value: Color) {
        let Ok(view) = storage_texture.texture_view() else {
            warn!("clear_storage_texture needs a texture view");
            return;
        };
        self.device().cmd_clear_color_image(
            self.handle,
            view.image,
            vk::ImageLayout::GENERAL,
            &clear_color(value),
            &[view.range],
        );
    }

    unsafe fn reset_queries(&mut self, pool: &QueryPoolVk, offset: u32, num: u32) {
        self.device()
            .cmd_reset_query_pool(self.handle, pool.handle, offset, num);
    }

    unsafe fn begin_query(&mut self, pool: &QueryPoolVk, offset: u32) {
        if pool.is_timestamp() || pool.is_acceleration_structure() {
            return;
        }
        self.device().cmd_begin_query(
            self.handle,
            pool.handle,
            offset,
            vk::QueryControlFlags::empty(),
        );
    }

    unsafe fn end_query(&mut self, pool: &QueryPoolVk, offset: u32) {
        if pool.is_timestamp() {
            self.device().cmd_write_timestamp2(
                self.handle,
                vk::PipelineStageFlags2::ALL_COMMANDS,
                pool.handle,
                offset,
            );
        } else if !pool.is_acceleration_structure() {
            self.device().cmd_end_query(self.handle, pool.handle, offset);
        }
    }

    unsafe fn copy_queries(
        &mut self,
        pool: &QueryPoolVk,
        offset: u32,
        num: u32,
        dst: &BufferVk,
        dst_offset: u64,
    ) {
        self.device().cmd_copy_query_pool_results(
            self.handle,
            pool.handle,
            offset,
            num,
            dst.handle,
            dst_offset,
            u64::from(pool.query_type.result_size()),
            vk::QueryResultFlags::TYPE_64 | vk::QueryResultFlags::WAIT,
        );
    }

    unsafe fn begin_annotation(&mut self, name: &str) {
        if let Some(debug_utils) = &self.shared.extensions.debug_utils {
            let name = CString::new(name.replace('\0', "")).unwrap_or_default();
            let label = vk::DebugUtilsLabelEXT::default().label_name(&name);
            debug_utils.cmd_begin_debug_utils_label(self.handle, &label);
        }
    }

    unsafe fn end_annotation(&mut self) {
        if let Some(debug_utils) = &self.shared.extensions.debug_utils {
            debug_utils.cmd_end_debug_utils_label(self.handle);
        }
    }
}

impl MeshShaderInterface<Vulkan> for CommandBufferVk {
    unsafe fn draw_mesh_tasks(&mut self, desc: &DispatchDesc) {
        if let Some(mesh) = &self.shared.extensions.mesh_shader {
            mesh.cmd_draw_mesh_tasks(self.handle, desc.x, desc.y, desc.z);
        }
    }

    unsafe fn draw_mesh_tasks_indirect(&mut self, desc: &IndirectDesc<'_, Vulkan>) {
        let Some(mesh) = &self.shared.extensions.mesh_shader else {
            return;
        };
        match desc.count_buffer {
            Some((count, count_offset)) => mesh.cmd_draw_mesh_tasks_indirect_count(
                self.handle,
                desc.buffer.handle,
                desc.offset,
                count.handle,
                count_offset,
                desc.draw_num,
                desc.stride,
            ),
            None => mesh.cmd_draw_mesh_tasks_indirect(
                self.handle,
                desc.buffer.handle,
                desc.offset,
                desc.draw_num,
                desc.stride,
            ),
        }
    }
}

impl DeviceVk {
    pub(crate) fn create_command_allocator_impl(&self, queue: &QueueVk) -> Result<CommandAllocatorVk> {
        let info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::TRANSIENT)
            .queue_family_index(queue.family_index);
        let handle = unsafe { self.shared.device.create_command_pool(&info, None) }
            .or_nri("vkCreateCommandPool")?;
        debug!(
            "Created command allocator {:?} for {:?} family {}",
            handle, queue.queue_type, queue.family_index
        );
        Ok(CommandAllocatorVk {
            handle,
            queue_type: queue.queue_type,
        })
    }

    pub(crate) fn create_command_buffer_impl(
        &self,
        allocator: &CommandAllocatorVk,
    ) -> Result<CommandBufferVk> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(allocator.handle)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let handle = unsafe { self.shared.device.allocate_command_buffers(&info) }
            .or_nri("vkAllocateCommandBuffers")?
            .into_iter()
            .next()
            .ok_or_else(|| Error::failure("vkAllocateCommandBuffers returned nothing"))?;
        Ok(CommandBufferVk {
            shared: Arc::clone(&self.shared),
            handle,
            pool: allocator.handle,
            queue_type: allocator.queue_type,
            layout: None,
            rendering: None,
        })
    }

    pub(crate) unsafe fn reset_command_allocator_impl(
        &self,
        allocator: &CommandAllocatorVk,
    ) -> Result<()> {
        self.shared
            .device
            .reset_command_pool(allocator.handle, vk::CommandPoolResetFlags::empty())
            .or_nri("vkResetCommandPool")
    }

    pub(crate) unsafe fn destroy_command_buffer_impl(&self, command_buffer: CommandBufferVk) {
        self.shared
            .device
            .free_command_buffers(command_buffer.pool, &[command_buffer.handle]);
    }

    pub(crate) unsafe fn destroy_command_allocator_impl(&self, allocator: CommandAllocatorVk) {
        self.shared.device.destroy_command_pool(allocator.handle, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(width: u32, height: u32, layers: u32) -> TextureViewVk {
        TextureViewVk {
            view: vk::ImageView::null(),
            image: vk::Image::null(),
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            range: vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: layers,
            },
            extent: vk::Extent2D { width, height },
        }
    }

    #[test]
    fn render_area_is_the_smallest_attachment() {
        let views = [view(1920, 1080, 2), view(1280, 1440, 6)];
        let (area, layers) = render_area(&views);
        assert_eq!(area.extent, vk::Extent2D { width: 1280, height: 1080 });
        assert_eq!(layers, 2);
    }

    #[test]
    fn no_attachments_render_nothing() {
        let (area, layers) = render_area(std::iter::empty());
        assert_eq!(area.extent.width, 0);
        assert_eq!(layers, 0);
    }

    #[test]
    fn attachments_load_and_store() {
        let info = attachment_info(&view(4, 4, 1), vk::ImageLayout::GENERAL);
        assert_eq!(info.load_op, vk::AttachmentLoadOp::LOAD);
        assert_eq!(info.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(info.image_layout, vk::ImageLayout::GENERAL);
    }
}
