//! Backend marker trait and the interface traits every backend implements.
//!
//! A backend is a zero-sized marker type naming its native object types.
//! The core interface is implemented by the device, queue work by the queue,
//! and recording by the command buffer. Extensions are separate traits that a
//! backend implements only where the hardware path exists.
//!
//! Creation calls are safe and return [`Result`]. Destruction and recording
//! are `unsafe`: the caller guarantees the GPU no longer uses (or will still
//! be able to use) the objects involved.

use std::fmt::Debug;
use std::ptr::NonNull;

use crate::barrier::BarrierGroupDesc;
use crate::command::{
    AttachmentsDesc, ClearDesc, Color, DispatchDesc, DrawDesc, DrawIndexedDesc, IndirectDesc,
    QueueSubmitDesc, Rect, TextureDataLayoutDesc, TextureRegionDesc, Viewport,
};
use crate::descriptor::{
    DescriptorPoolDesc, DescriptorRangeUpdateDesc, DescriptorSetCopyDesc, PipelineLayoutDesc,
};
use crate::device::{DeviceDesc, GraphicsApi, QueueType};
use crate::error::Result;
use crate::format::{Format, FormatSupportBits};
use crate::memory::{
    AccelerationStructureMemoryBindingDesc, AllocateBufferDesc, AllocateMemoryDesc,
    AllocateTextureDesc, BufferMemoryBindingDesc, MemoryDesc, MemoryLocation,
    TextureMemoryBindingDesc,
};
use crate::pipeline::{ComputePipelineDesc, GraphicsPipelineDesc, IndexType};
use crate::query::QueryPoolDesc;
use crate::ray_tracing::{
    AccelerationStructureBits, AccelerationStructureDesc, BottomLevelGeometryDesc, CopyMode,
    DispatchRaysDesc, RayTracingPipelineDesc,
};
use crate::resource::{
    BufferDesc, BufferViewDesc, SamplerDesc, Texture1DViewDesc, Texture2DViewDesc,
    Texture3DViewDesc, TextureDesc,
};
use crate::swap_chain::SwapChainDesc;

/// A graphics API backend.
pub trait Backend: Sized + Send + Sync + 'static {
    const API: GraphicsApi;

    type Device: CoreInterface<Self> + Send + Sync;
    type Queue: QueueInterface<Self> + Send + Sync;
    type CommandAllocator: Send + Sync + Debug;
    type CommandBuffer: CommandBufferInterface<Self> + Send;
    type Buffer: Send + Sync + Debug;
    type Texture: Send + Sync + Debug;
    type Memory: Send + Sync + Debug;
    /// Views, samplers and acceleration-structure descriptors.
    type Descriptor: Send + Sync + Debug;
    type DescriptorPool: Send + Sync + Debug;
    type DescriptorSet: Send + Sync + Debug;
    type PipelineLayout: Send + Sync + Debug;
    type Pipeline: Send + Sync + Debug;
    type QueryPool: Send + Sync + Debug;
    type Fence: Send + Sync + Debug;
    type SwapChain: Send + Sync + Debug;
    type AccelerationStructure: Send + Sync + Debug;
}

/// Any object a debug name can be attached to.
pub enum Object<'a, B: Backend> {
    Queue(&'a B::Queue),
    CommandAllocator(&'a B::CommandAllocator),
    CommandBuffer(&'a B::CommandBuffer),
    Buffer(&'a B::Buffer),
    Texture(&'a B::Texture),
    Memory(&'a B::Memory),
    Descriptor(&'a B::Descriptor),
    DescriptorPool(&'a B::DescriptorPool),
    DescriptorSet(&'a B::DescriptorSet),
    PipelineLayout(&'a B::PipelineLayout),
    Pipeline(&'a B::Pipeline),
    QueryPool(&'a B::QueryPool),
    Fence(&'a B::Fence),
    AccelerationStructure(&'a B::AccelerationStructure),
}

/// Devices, resources, descriptors, pipelines, fences and queries.
pub trait CoreInterface<B: Backend> {
    fn get_device_desc(&self) -> &DeviceDesc;

    fn get_format_support(&self, format: Format) -> FormatSupportBits;

    fn get_queue(&self, queue_type: QueueType, queue_index: u32) -> Result<&B::Queue>;

    fn get_buffer_desc<'a>(&self, buffer: &'a B::Buffer) -> &'a BufferDesc;

    fn get_texture_desc<'a>(&self, texture: &'a B::Texture) -> &'a TextureDesc;

    fn set_debug_name(&self, object: Object<'_, B>, name: &str);

    fn create_command_allocator(&self, queue: &B::Queue) -> Result<B::CommandAllocator>;

    fn create_command_buffer(&self, allocator: &B::CommandAllocator) -> Result<B::CommandBuffer>;

    /// # Safety
    ///
    /// No command buffer from `allocator` may be pending on the GPU.
    unsafe fn reset_command_allocator(&self, allocator: &B::CommandAllocator) -> Result<()>;

    fn create_descriptor_pool(&self, desc: &DescriptorPoolDesc) -> Result<B::DescriptorPool>;

    fn create_buffer(&self, desc: &BufferDesc) -> Result<B::Buffer>;

    fn create_texture(&self, desc: &TextureDesc) -> Result<B::Texture>;

    fn create_buffer_view(&self, desc: &BufferViewDesc<'_, B>) -> Result<B::Descriptor>;

    fn create_texture_1d_view(&self, desc: &Texture1DViewDesc<'_, B>) -> Result<B::Descriptor>;

    fn create_texture_2d_view(&self, desc: &Texture2DViewDesc<'_, B>) -> Result<B::Descriptor>;

    fn create_texture_3d_view(&self, desc: &Texture3DViewDesc<'_, B>) -> Result<B::Descriptor>;

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<B::Descriptor>;

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc<'_>) -> Result<B::PipelineLayout>;

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc<'_, B>)
        -> Result<B::Pipeline>;

    fn create_compute_pipeline(&self, desc: &ComputePipelineDesc<'_, B>) -> Result<B::Pipeline>;

    fn create_query_pool(&self, desc: &QueryPoolDesc) -> Result<B::QueryPool>;

    fn create_fence(&self, initial_value: u64) -> Result<B::Fence>;

    /// # Safety
    ///
    /// Each `destroy_*` call requires the object to be idle on the GPU and
    /// not referenced by any object still in use.
    unsafe fn destroy_command_allocator(&self, allocator: B::CommandAllocator);
    /// # Safety
    ///
    /// See [`CoreInterface::destroy_command_allocator`].
    unsafe fn destroy_command_buffer(&self, command_buffer: B::CommandBuffer);
    /// # Safety
    ///
    /// See [`CoreInterface::destroy_command_allocator`].
    unsafe fn destroy_descriptor_pool(&self, pool: B::DescriptorPool);
    /// # Safety
    ///
    /// See [`CoreInterface::destroy_command_allocator`].
    unsafe fn destroy_buffer(&self, buffer: B::Buffer);
    /// # Safety
    ///
    /// See [`CoreInterface::destroy_command_allocator`].
    unsafe fn destroy_texture(&self, texture: B::Texture);
    /// # Safety
    ///
    /// See [`CoreInterface::destroy_command_allocator`].
    unsafe fn destroy_descriptor(&self, descriptor: B::Descriptor);
    /// # Safety
    ///
    /// See [`CoreInterface::destroy_command_allocator`].
    unsafe fn destroy_pipeline_layout(&self, layout: B::PipelineLayout);
    /// # Safety
    ///
    /// See [`CoreInterface::destroy_command_allocator`].
    unsafe fn destroy_pipeline(&self, pipeline: B::Pipeline);
    /// # Safety
    ///
    /// See [`CoreInterface::destroy_command_allocator`].
    unsafe fn destroy_query_pool(&self, pool: B::QueryPool);
    /// # Safety
    ///
    /// See [`CoreInterface::destroy_command_allocator`].
    unsafe fn destroy_fence(&self, fence: B::Fence);

    fn get_buffer_memory_desc(&self, buffer: &B::Buffer, location: MemoryLocation)
        -> Result<MemoryDesc>;

    fn get_texture_memory_desc(
        &self,
        texture: &B::Texture,
        location: MemoryLocation,
    ) -> Result<MemoryDesc>;

    fn allocate_memory(&self, desc: &AllocateMemoryDesc) -> Result<B::Memory>;

    /// Binds each buffer once; rebinding is `InvalidArgument`.
    fn bind_buffer_memory(&self, bindings: &[BufferMemoryBindingDesc<'_, B>]) -> Result<()>;

    fn bind_texture_memory(&self, bindings: &[TextureMemoryBindingDesc<'_, B>]) -> Result<()>;

    fn is_buffer_memory_bound(&self, buffer: &B::Buffer) -> bool;

    /// Swap chain textures count as bound.
    fn is_texture_memory_bound(&self, texture: &B::Texture) -> bool;

    /// # Safety
    ///
    /// Resources bound to `memory` must already be destroyed.
    unsafe fn free_memory(&self, memory: B::Memory);

    /// Allocates `num` sets of layout set `set_index`.
    ///
    /// `variable_descriptor_num` sizes a trailing `VARIABLE_SIZED_ARRAY` range.
    fn allocate_descriptor_sets(
        &self,
        pool: &B::DescriptorPool,
        layout: &B::PipelineLayout,
        set_index: u32,
        num: u32,
        variable_descriptor_num: u32,
    ) -> Result<Vec<B::DescriptorSet>>;

    /// # Safety
    ///
    /// `set` must not be in use by a pending command buffer unless its ranges
    /// allow update after set.
    unsafe fn update_descriptor_ranges(
        &self,
        set: &B::DescriptorSet,
        base_range: u32,
        updates: &[DescriptorRangeUpdateDesc<'_, B>],
    ) -> Result<()>;

    /// # Safety
    ///
    /// See [`CoreInterface::update_descriptor_ranges`].
    unsafe fn copy_descriptor_set(
        &self,
        dst: &B::DescriptorSet,
        desc: &DescriptorSetCopyDesc<'_, B>,
    ) -> Result<()>;

    /// # Safety
    ///
    /// Sets from `pool` become invalid and must not be used afterwards.
    unsafe fn reset_descriptor_pool(&self, pool: &B::DescriptorPool) -> Result<()>;

    /// Returns a pointer to `offset` within the buffer. `size` may be `WHOLE_SIZE`.
    ///
    /// # Safety
    ///
    /// The caller synchronises CPU access with GPU use of the range.
    unsafe fn map_buffer(&self, buffer: &B::Buffer, offset: u64, size: u64) -> Result<NonNull<u8>>;

    /// # Safety
    ///
    /// Pointers returned by `map_buffer` are invalid afterwards.
    unsafe fn unmap_buffer(&self, buffer: &B::Buffer);

    fn get_buffer_device_address(&self, buffer: &B::Buffer) -> u64;

    fn get_fence_value(&self, fence: &B::Fence) -> Result<u64>;

    /// Blocks until `fence` reaches `value`.
    fn wait(&self, fence: &B::Fence, value: u64) -> Result<()>;

    /// Bytes one query result occupies.
    fn get_query_size(&self, pool: &B::QueryPool) -> u32;

    /// # Safety
    ///
    /// Queries in the range must not be in flight.
    unsafe fn reset_queries(&self, pool: &B::QueryPool, offset: u32, num: u32);
}

pub trait QueueInterface<B: Backend> {
    /// # Safety
    ///
    /// Every resource referenced by the command buffers must stay alive until
    /// the signalled fences complete.
    unsafe fn submit(&self, desc: &QueueSubmitDesc<'_, B>) -> Result<()>;

    fn wait_idle(&self) -> Result<()>;

    fn queue_type(&self) -> QueueType;
}

/// Command recording.
///
/// # Safety
///
/// Every method is `unsafe`: command buffers record references to objects
/// that must outlive the GPU's execution of the commands.
pub trait CommandBufferInterface<B: Backend> {
    unsafe fn begin(&mut self, descriptor_pool: Option<&B::DescriptorPool>) -> Result<()>;
    unsafe fn end(&mut self) -> Result<()>;

    unsafe fn set_viewports(&mut self, viewports: &[Viewport]);
    unsafe fn set_scissors(&mut self, rects: &[Rect]);
    unsafe fn set_depth_bounds(&mut self, min: f32, max: f32);
    unsafe fn set_stencil_reference(&mut self, front: u8, back: u8);
    unsafe fn set_blend_constants(&mut self, color: [f32; 4]);

    unsafe fn begin_rendering(&mut self, attachments: &AttachmentsDesc<'_, B>) -> Result<()>;
    unsafe fn clear_attachments(&mut self, clears: &[ClearDesc], rects: &[Rect]);
    unsafe fn end_rendering(&mut self);

    unsafe fn set_vertex_buffers(&mut self, base_slot: u32, buffers: &[&B::Buffer], offsets: &[u64]);
    unsafe fn set_index_buffer(&mut self, buffer: &B::Buffer, offset: u64, index_type: IndexType);
    unsafe fn set_pipeline_layout(&mut self, layout: &B::PipelineLayout);
    unsafe fn set_pipeline(&mut self, pipeline: &B::Pipeline);
    unsafe fn set_descriptor_pool(&mut self, pool: &B::DescriptorPool);
    unsafe fn set_descriptor_set(
        &mut self,
        set_index: u32,
        set: &B::DescriptorSet,
        dynamic_offsets: &[u32],
    ) -> Result<()>;
    unsafe fn set_root_constants(&mut self, root_constant_index: u32, data: &[u8]) -> Result<()>;
    unsafe fn set_root_descriptor(
        &mut self,
        root_descriptor_index: u32,
        descriptor: &B::Descriptor,
    ) -> Result<()>;

    unsafe fn draw(&mut self, desc: &DrawDesc);
    unsafe fn draw_indexed(&mut self, desc: &DrawIndexedDesc);
    unsafe fn draw_indirect(&mut self, desc: &IndirectDesc<'_, B>);
    unsafe fn draw_indexed_indirect(&mut self, desc: &IndirectDesc<'_, B>);
    unsafe fn dispatch(&mut self, desc: &DispatchDesc);
    unsafe fn dispatch_indirect(&mut self, buffer: &B::Buffer, offset: u64);

    unsafe fn barrier(&mut self, group: &BarrierGroupDesc<'_, B>);

    /// `size` may be `WHOLE_SIZE`.
    unsafe fn copy_buffer(
        &mut self,
        dst: &B::Buffer,
        dst_offset: u64,
        src: &B::Buffer,
        src_offset: u64,
        size: u64,
    );
    /// `None` regions copy the whole texture.
    unsafe fn copy_texture(
        &mut self,
        dst: &B::Texture,
        dst_region: Option<&TextureRegionDesc>,
        src: &B::Texture,
        src_region: Option<&TextureRegionDesc>,
    );
    unsafe fn upload_buffer_to_texture(
        &mut self,
        dst: &B::Texture,
        dst_region: &TextureRegionDesc,
        src: &B::Buffer,
        src_layout: &TextureDataLayoutDesc,
    );
    unsafe fn readback_texture_to_buffer(
        &mut self,
        dst: &B::Buffer,
        dst_layout: &TextureDataLayoutDesc,
        src: &B::Texture,
        src_region: &TextureRegionDesc,
    );
    unsafe fn resolve_texture(
        &mut self,
        dst: &B::Texture,
        dst_region: Option<&TextureRegionDesc>,
        src: &B::Texture,
        src_region: Option<&TextureRegionDesc>,
    );
    /// Fills the buffer behind a storage buffer view with `value`.
    unsafe fn clear_storage_buffer(&mut self, storage_buffer: &B::Descriptor, value: u32);
    unsafe fn clear_storage_texture(&mut self, storage_texture: &B::Descriptor, value: Color);

    unsafe fn reset_queries(&mut self, pool: &B::QueryPool, offset: u32, num: u32);
    /// Timestamp pools ignore `begin_query`; `end_query` writes the timestamp.
    unsafe fn begin_query(&mut self, pool: &B::QueryPool, offset: u32);
    unsafe fn end_query(&mut self, pool: &B::QueryPool, offset: u32);
    unsafe fn copy_queries(
        &mut self,
        pool: &B::QueryPool,
        offset: u32,
        num: u32,
        dst: &B::Buffer,
        dst_offset: u64,
    );

    unsafe fn begin_annotation(&mut self, name: &str);
    unsafe fn end_annotation(&mut self);
}

pub trait SwapChainInterface<B: Backend> {
    fn create_swap_chain(&self, desc: &SwapChainDesc<'_, B>) -> Result<B::SwapChain>;

    /// # Safety
    ///
    /// No frame may be in flight on the swap chain's textures.
    unsafe fn destroy_swap_chain(&self, swap_chain: B::SwapChain);

    fn get_swap_chain_textures<'a>(&self, swap_chain: &'a B::SwapChain) -> &'a [B::Texture];

    /// Returns the index of the texture to render into.
    ///
    /// A submission referencing the swap chain waits for the acquire and
    /// signals presentation.
    fn acquire_next_swap_chain_texture(&self, swap_chain: &mut B::SwapChain) -> Result<u32>;

    fn queue_present(&self, swap_chain: &mut B::SwapChain) -> Result<()>;
}

pub trait RayTracingInterface<B: Backend> {
    fn create_acceleration_structure(
        &self,
        desc: &AccelerationStructureDesc<'_, B>,
    ) -> Result<B::AccelerationStructure>;

    fn get_acceleration_structure_memory_desc(
        &self,
        acceleration_structure: &B::AccelerationStructure,
        location: MemoryLocation,
    ) -> Result<MemoryDesc>;

    fn bind_acceleration_structure_memory(
        &self,
        bindings: &[AccelerationStructureMemoryBindingDesc<'_, B>],
    ) -> Result<()>;

    fn create_acceleration_structure_descriptor(
        &self,
        acceleration_structure: &B::AccelerationStructure,
    ) -> Result<B::Descriptor>;

    /// Device address used in top-level instance records.
    fn get_acceleration_structure_handle(&self, acceleration_structure: &B::AccelerationStructure)
        -> u64;

    fn get_acceleration_structure_build_scratch_size(
        &self,
        acceleration_structure: &B::AccelerationStructure,
    ) -> u64;

    /// Scratch needed to refit a structure created with `ALLOW_UPDATE`.
    fn get_acceleration_structure_update_scratch_size(
        &self,
        acceleration_structure: &B::AccelerationStructure,
    ) -> u64;

    fn create_ray_tracing_pipeline(&self, desc: &RayTracingPipelineDesc<'_, B>)
        -> Result<B::Pipeline>;

    /// Writes `group_num` shader group identifiers starting at `base_group` into `dst`.
    fn write_shader_group_identifiers(
        &self,
        pipeline: &B::Pipeline,
        base_group: u32,
        group_num: u32,
        dst: &mut [u8],
    ) -> Result<()>;

    /// # Safety
    ///
    /// The structure must be idle on the GPU.
    unsafe fn destroy_acceleration_structure(&self, acceleration_structure: B::AccelerationStructure);
}

/// Ray tracing commands.
///
/// # Safety
///
/// Same contract as [`CommandBufferInterface`].
pub trait RayTracingCommands<B: Backend> {
    #[allow(clippy::too_many_arguments)]
    unsafe fn build_top_level_acceleration_structure(
        &mut self,
        instance_num: u32,
        instance_buffer: &B::Buffer,
        instance_offset: u64,
        flags: AccelerationStructureBits,
        dst: &B::AccelerationStructure,
        scratch: &B::Buffer,
        scratch_offset: u64,
    );
    unsafe fn build_bottom_level_acceleration_structure(
        &mut self,
        geometries: &[BottomLevelGeometryDesc<'_, B>],
        flags: AccelerationStructureBits,
        dst: &B::AccelerationStructure,
        scratch: &B::Buffer,
        scratch_offset: u64,
    );
    unsafe fn copy_acceleration_structure(
        &mut self,
        dst: &B::AccelerationStructure,
        src: &B::AccelerationStructure,
        mode: CopyMode,
    );
    unsafe fn write_acceleration_structure_size(
        &mut self,
        acceleration_structures: &[&B::AccelerationStructure],
        query_pool: &B::QueryPool,
        query_offset: u32,
    );
    unsafe fn dispatch_rays(&mut self, desc: &DispatchRaysDesc<'_, B>);
}

/// Mesh shading commands.
///
/// # Safety
///
/// Same contract as [`CommandBufferInterface`].
pub trait MeshShaderInterface<B: Backend> {
    unsafe fn draw_mesh_tasks(&mut self, desc: &DispatchDesc);
    unsafe fn draw_mesh_tasks_indirect(&mut self, desc: &IndirectDesc<'_, B>);
}

/// Create, allocate and bind in one call. Free with the matching `destroy_*`.
pub trait ResourceAllocatorInterface<B: Backend> {
    fn allocate_buffer(&self, desc: &AllocateBufferDesc) -> Result<B::Buffer>;

    fn allocate_texture(&self, desc: &AllocateTextureDesc) -> Result<B::Texture>;
}
