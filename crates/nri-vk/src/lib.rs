//! Vulkan backend of the NRI rendering interface.
//!
//! This crate provides:
//! - Instance, adapter and device creation on Vulkan 1.3
//! - Memory through `vkAllocateMemory` and through gpu-allocator
//! - Descriptors, pipelines and command recording with dynamic rendering
//! - Swap chains over raw-window-handle surfaces
//! - Ray tracing and mesh shading where the device supports them

pub mod acceleration_structure;
mod adapter;
mod allocator;
mod barrier;
pub mod buffer;
pub mod command;
pub mod conversions;
pub mod descriptor;
pub mod descriptor_set;
pub mod device;
pub mod error;
pub mod fence;
mod instance;
mod interface;
mod limits;
pub mod memory;
pub mod pipeline;
pub mod pipeline_layout;
pub mod query_pool;
pub mod queue;
pub mod swap_chain;
pub mod texture;
mod transfer;

use nri_core::{AdapterDesc, Backend, DeviceCreationDesc, Error, GraphicsApi, Result};
use tracing::info;

pub use acceleration_structure::AccelerationStructureVk;
pub use buffer::BufferVk;
pub use command::{CommandAllocatorVk, CommandBufferVk};
pub use descriptor::DescriptorVk;
pub use descriptor_set::{DescriptorPoolVk, DescriptorSetVk};
pub use device::DeviceVk;
pub use error::translate_vk_result;
pub use fence::FenceVk;
pub use memory::MemoryVk;
pub use pipeline::PipelineVk;
pub use pipeline_layout::PipelineLayoutVk;
pub use query_pool::QueryPoolVk;
pub use queue::QueueVk;
pub use swap_chain::SwapChainVk;
pub use texture::TextureVk;

/// The Vulkan backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Vulkan;

impl Backend for Vulkan {
    const API: GraphicsApi = GraphicsApi::Vk;

    type Device = DeviceVk;
    type Queue = QueueVk;
    type CommandAllocator = CommandAllocatorVk;
    type CommandBuffer = CommandBufferVk;
    type Buffer = BufferVk;
    type Texture = TextureVk;
    type Memory = MemoryVk;
    type Descriptor = DescriptorVk;
    type DescriptorPool = DescriptorPoolVk;
    type DescriptorSet = DescriptorSetVk;
    type PipelineLayout = PipelineLayoutVk;
    type Pipeline = PipelineVk;
    type QueryPool = QueryPoolVk;
    type Fence = FenceVk;
    type SwapChain = SwapChainVk;
    type AccelerationStructure = AccelerationStructureVk;
}

/// Vulkan 1.3 adapters, discrete first, then by video memory.
pub fn enumerate_adapters() -> Result<Vec<AdapterDesc>> {
    let entry = instance::load_entry()?;
    let desc = DeviceCreationDesc::default().with_validation(false);
    let instance = instance::Instance::new(entry, &desc)?;
    let adapters = adapter::enumerate(&instance.raw)?;
    Ok(adapters.into_iter().map(|a| a.desc).collect())
}

/// Create a device on the adapter `desc` selects.
pub fn create_device(desc: &DeviceCreationDesc) -> Result<DeviceVk> {
    if desc.graphics_api != GraphicsApi::Vk {
        return Err(Error::unsupported(format!(
            "{:?} is not implemented by the Vulkan backend",
            desc.graphics_api
        )));
    }
    let entry = instance::load_entry()?;
    let instance = instance::Instance::new(entry, desc)?;
    let mut adapters = adapter::enumerate(&instance.raw)?;
    if adapters.is_empty() {
        return Err(Error::unsupported("no Vulkan 1.3 adapter found"));
    }
    let index = desc.adapter_index.unwrap_or(0);
    if index >= adapters.len() {
        return Err(Error::invalid(format!(
            "adapter index {index} out of range ({} adapters)",
            adapters.len()
        )));
    }
    let adapter = adapters.swap_remove(index);
    info!(
        "Using adapter {}: {} ({:?}, {} MiB VRAM)",
        index,
        adapter.desc.name,
        adapter.desc.vendor,
        adapter.desc.video_memory_size >> 20
    );
    DeviceVk::new(instance, adapter, desc)
}
