//! `CoreInterface` for the Vulkan device.

use std::ptr::NonNull;

use nri_core::{
    AllocateMemoryDesc, BufferDesc, BufferMemoryBindingDesc, BufferViewDesc, ComputePipelineDesc,
    CoreInterface, DescriptorPoolDesc, DescriptorRangeUpdateDesc, DescriptorSetCopyDesc,
    DeviceDesc, Error, Format, FormatSupportBits, GraphicsPipelineDesc, MemoryDesc,
    MemoryLocation, Object, PipelineLayoutDesc, QueryPoolDesc, QueueType, Result, SamplerDesc,
    Texture1DViewDesc, Texture2DViewDesc, Texture3DViewDesc, TextureDesc,
    TextureMemoryBindingDesc,
};

use crate::buffer::BufferVk;
use crate::command::{CommandAllocatorVk, CommandBufferVk};
use crate::conversions::{format_support_from_vk, format_to_vk};
use crate::descriptor::DescriptorVk;
use crate::descriptor_set::{DescriptorPoolVk, DescriptorSetVk};
use crate::device::DeviceVk;
use crate::fence::FenceVk;
use crate::memory::MemoryVk;
use crate::pipeline::PipelineVk;
use crate::pipeline_layout::PipelineLayoutVk;
use crate::query_pool::QueryPoolVk;
use crate::queue::QueueVk;
use crate::texture::TextureVk;
use crate::Vulkan;

impl CoreInterface<Vulkan> for DeviceVk {
    fn get_device_desc(&self) -> &DeviceDesc {
        &self.shared.desc
    }

    fn get_format_support(&self, format: Format) -> FormatSupportBits {
        if format == Format::Unknown {
            return FormatSupportBits::empty();
        }
        let props = unsafe {
            self.shared
                .instance
                .raw
                .get_physical_device_format_properties(self.shared.physical_device, format_to_vk(format))
        };
        format_support_from_vk(props)
    }

    fn get_queue(&self, queue_type: QueueType, queue_index: u32) -> Result<&QueueVk> {
        self.queues[queue_type as usize]
            .get(queue_index as usize)
            .ok_or_else(|| {
                Error::invalid(format!(
                    "{queue_type:?} queue {queue_index} was not created"
                ))
            })
    }

    fn get_buffer_desc<'a>(&self, buffer: &'a BufferVk) -> &'a BufferDesc {
        &buffer.desc
    }

    fn get_texture_desc<'a>(&self, texture: &'a TextureVk) -> &'a TextureDesc {
        &texture.desc
    }

    fn set_debug_name(&self, object: Object<'_, Vulkan>, name: &str) {
        let shared = &self.shared;
        match object {
            Object::Queue(queue) => shared.set_object_name(queue.handle, name),
            Object::CommandAllocator(allocator) => shared.set_object_name(allocator.handle, name),
            Object::CommandBuffer(command_buffer) => {
                shared.set_object_name(command_buffer.handle, name);
            }
            Object::Buffer(buffer) => shared.set_object_name(buffer.handle, name),
            Object::Texture(texture) => shared.set_object_name(texture.handle, name),
            Object::Memory(memory) => shared.set_object_name(memory.handle, name),
            Object::Descriptor(descriptor) => descriptor.set_name(shared, name),
            Object::DescriptorPool(pool) => shared.set_object_name(pool.handle, name),
            Object::DescriptorSet(set) => shared.set_object_name(set.handle, name),
            Object::PipelineLayout(layout) => shared.set_object_name(layout.handle, name),
            Object::Pipeline(pipeline) => shared.set_object_name(pipeline.handle, name),
            Object::QueryPool(pool) => shared.set_object_name(pool.handle, name),
            Object::Fence(fence) => shared.set_object_name(fence.handle, name),
            Object::AccelerationStructure(structure) => {
                if let Some(handle) = structure.handle.get() {
                    shared.set_object_name(*handle, name);
                }
                shared.set_object_name(structure.buffer.handle, name);
            }
        }
    }

    fn create_command_allocator(&self, queue: &QueueVk) -> Result<CommandAllocatorVk> {
        self.create_command_allocator_impl(queue)
    }

    fn create_command_buffer(&self, allocator: &CommandAllocatorVk) -> Result<CommandBufferVk> {
        self.create_command_buffer_impl(allocator)
    }

    unsafe fn reset_command_allocator(&self, allocator: &CommandAllocatorVk) -> Result<()> {
        self.reset_command_allocator_impl(allocator)
    }

    fn create_descriptor_pool(&self, desc: &DescriptorPoolDesc) -> Result<DescriptorPoolVk> {
        self.create_descriptor_pool_impl(desc)
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferVk> {
        self.create_buffer_impl(desc)
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<TextureVk> {
        self.create_texture_impl(desc)
    }

    fn create_buffer_view(&self, desc: &BufferViewDesc<'_, Vulkan>) -> Result<DescriptorVk> {
        self.create_buffer_view_impl(desc)
    }

    fn create_texture_1d_view(&self, desc: &Texture1DViewDesc<'_, Vulkan>) -> Result<DescriptorVk> {
        self.create_texture_1d_view_impl(desc)
    }

    fn create_texture_2d_view(&self, desc: &Texture2DViewDesc<'_, Vulkan>) -> Result<DescriptorVk> {
        self.create_texture_2d_view_impl(desc)
    }

    fn create_texture_3d_view(&self, desc: &Texture3DViewDesc<'_, Vulkan>) -> Result<DescriptorVk> {
        self.create_texture_3d_view_impl(desc)
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<DescriptorVk> {
        self.create_sampler_impl(desc)
    }

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc<'_>) -> Result<PipelineLayoutVk> {
        self.create_pipeline_layout_impl(desc)
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc<'_, Vulkan>) -> Result<PipelineVk> {
        self.create_graphics_pipeline_impl(desc)
    }

    fn create_compute_pipeline(&self, desc: &ComputePipelineDesc<'_, Vulkan>) -> Result<PipelineVk> {
        self.create_compute_pipeline_impl(desc)
    }

    fn create_query_pool(&self, desc: &QueryPoolDesc) -> Result<QueryPoolVk> {
        self.create_query_pool_impl(desc)
    }

    fn create_fence(&self, initial_value: u64) -> Result<FenceVk> {
        self.create_fence_impl(initial_value)
    }

    unsafe fn destroy_command_allocator(&self, allocator: CommandAllocatorVk) {
        self.destroy_command_allocator_impl(allocator);
    }

    unsafe fn destroy_command_buffer(&self, command_buffer: CommandBufferVk) {
        self.destroy_command_buffer_impl(command_buffer);
    }

    unsafe fn destroy_descriptor_pool(&self, pool: DescriptorPoolVk) {
        self.destroy_descriptor_pool_impl(pool);
    }

    unsafe fn destroy_buffer(&self, buffer: BufferVk) {
        self.destroy_buffer_impl(buffer);
    }

    unsafe fn destroy_texture(&self, texture: TextureVk) {
        self.destroy_texture_impl(texture);
    }

    unsafe fn destroy_descriptor(&self, descriptor: DescriptorVk) {
        self.destroy_descriptor_impl(descriptor);
    }

    unsafe fn destroy_pipeline_layout(&self, layout: PipelineLayoutVk) {
        self.destroy_pipeline_layout_impl(layout);
    }

    unsafe fn destroy_pipeline(&self, pipeline: PipelineVk) {
        self.destroy_pipeline_impl(pipeline);
    }

    unsafe fn destroy_query_pool(&self, pool: QueryPoolVk) {
        self.destroy_query_pool_impl(pool);
    }

    unsafe fn destroy_fence(&self, fence: FenceVk) {
        self.shared.device.destroy_semaphore(fence.handle, None);
    }

    fn get_buffer_memory_desc(&self, buffer: &BufferVk, location: MemoryLocation) -> Result<MemoryDesc> {
        self.buffer_memory_desc(buffer, location)
    }

    fn get_texture_memory_desc(&self, texture: &TextureVk, location: MemoryLocation) -> Result<MemoryDesc> {
        self.texture_memory_desc(texture, location)
    }

    fn allocate_memory(&self, desc: &AllocateMemoryDesc) -> Result<MemoryVk> {
        self.allocate_memory_impl(desc)
    }

    fn bind_buffer_memory(&self, bindings: &[BufferMemoryBindingDesc<'_, Vulkan>]) -> Result<()> {
        self.bind_buffer_memory_impl(bindings)
    }

    fn bind_texture_memory(&self, bindings: &[TextureMemoryBindingDesc<'_, Vulkan>]) -> Result<()> {
        self.bind_texture_memory_impl(bindings)
    }

    fn is_buffer_memory_bound(&self, buffer: &BufferVk) -> bool {
        buffer.binding.get().is_some()
    }

    fn is_texture_memory_bound(&self, texture: &TextureVk) -> bool {
        texture.memory.get().is_some()
    }

    unsafe fn free_memory(&self, memory: MemoryVk) {
        self.free_memory_impl(memory);
    }

    fn allocate_descriptor_sets(
        &self,
        pool: &DescriptorPoolVk,
        layout: &PipelineLayoutVk,
        set_index: u32,
        num: u32,
        variable_descriptor_num: u32,
    ) -> Result<Vec<DescriptorSetVk>> {
        self.allocate_descriptor_sets_impl(pool, layout, set_index, num, variable_descriptor_num)
    }

    unsafe fn update_descriptor_ranges(
        &self,
        set: &DescriptorSetVk,
        base_range: u32,
        updates: &[DescriptorRangeUpdateDesc<'_, Vulkan>],
    ) -> Result<()> {
        self.update_descriptor_ranges_impl(set, base_range, updates)
    }

    unsafe fn copy_descriptor_set(
        &self,
        dst: &DescriptorSetVk,
        desc: &DescriptorSetCopyDesc<'_, Vulkan>,
    ) -> Result<()> {
        self.copy_descriptor_set_impl(dst, desc)
    }

    unsafe fn reset_descriptor_pool(&self, pool: &DescriptorPoolVk) -> Result<()> {
        self.reset_descriptor_pool_impl(pool)
    }

    unsafe fn map_buffer(&self, buffer: &BufferVk, offset: u64, size: u64) -> Result<NonNull<u8>> {
        self.map_buffer_impl(buffer, offset, size)
    }

    unsafe fn unmap_buffer(&self, buffer: &BufferVk) {
        self.unmap_buffer_impl(buffer);
    }

    fn get_buffer_device_address(&self, buffer: &BufferVk) -> u64 {
        buffer.device_address()
    }

    fn get_fence_value(&self, fence: &FenceVk) -> Result<u64> {
        self.fence_value(fence)
    }

    fn wait(&self, fence: &FenceVk, value: u64) -> Result<()> {
        self.wait_fence(fence, value)
    }

    fn get_query_size(&self, pool: &QueryPoolVk) -> u32 {
        pool.query_type.result_size()
    }

    unsafe fn reset_queries(&self, pool: &QueryPoolVk, offset: u32, num: u32) {
        self.reset_queries_impl(pool, offset, num);
    }
}
