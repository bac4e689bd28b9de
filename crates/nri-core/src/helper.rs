//! Backend-independent helpers built on the core interface.
//!
//! Memory grouping, staging uploads and texture subresource layouts. Every
//! helper only uses [`CoreInterface`], so it works for any backend.

use tracing::debug;

use crate::barrier::{
    AccessBits, AccessLayoutStage, AccessStage, BarrierGroupDesc, BufferBarrierDesc, Layout,
    PlaneBits, StageBits, TextureBarrierDesc,
};
use crate::command::{FenceSubmitDesc, QueueSubmitDesc, TextureDataLayoutDesc, TextureRegionDesc};
use crate::error::{Error, Result};
use crate::interface::{Backend, CommandBufferInterface, CoreInterface, QueueInterface};
use crate::memory::{
    align_up, AllocateMemoryDesc, BufferMemoryBindingDesc, MemoryDesc, MemoryLocation, MemoryType,
    TextureMemoryBindingDesc,
};
use crate::resource::{BufferDesc, BufferUsageBits, TextureDesc, TextureType, WHOLE_SIZE};

/// Default cap of one grouped allocation.
pub const DEFAULT_PREFERRED_MEMORY_SIZE: u64 = 256 * 1024 * 1024;

/// Resources to place into shared memory objects.
pub struct ResourceGroupDesc<'a, B: Backend> {
    pub memory_location: MemoryLocation,
    pub buffers: &'a [&'a B::Buffer],
    pub textures: &'a [&'a B::Texture],
    /// 0 means [`DEFAULT_PREFERRED_MEMORY_SIZE`].
    pub preferred_memory_size: u64,
}

/// One mip/layer worth of texel data.
#[derive(Clone, Copy, Debug)]
pub struct TextureSubresourceUploadDesc<'a> {
    pub slices: &'a [u8],
    pub slice_num: u32,
    pub row_pitch: u32,
    pub slice_pitch: u32,
}

pub struct TextureUploadDesc<'a, B: Backend> {
    pub texture: &'a B::Texture,
    /// Layer-major: `subresources[layer * mip_num + mip]`. Empty only transitions.
    pub subresources: &'a [TextureSubresourceUploadDesc<'a>],
    pub after: AccessLayoutStage,
    pub planes: PlaneBits,
}

pub struct BufferUploadDesc<'a, B: Backend> {
    pub data: &'a [u8],
    pub buffer: &'a B::Buffer,
    pub buffer_offset: u64,
    pub after: AccessStage,
}

/// Placement of a subresource in a linear upload buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureSubresourceLayout {
    /// Bytes of texel data in one row of blocks.
    pub content_row_pitch: u32,
    /// Aligned row pitch.
    pub row_pitch: u32,
    /// Aligned slice pitch.
    pub slice_pitch: u32,
    /// Rows of blocks per slice.
    pub row_num: u32,
    pub slice_num: u32,
}

/// Row and slice pitch of mip `mip`, block-compressed aware.
pub fn texture_subresource_layout(
    desc: &TextureDesc,
    mip: u32,
    row_alignment: u32,
    slice_alignment: u32,
) -> Result<TextureSubresourceLayout> {
    if mip >= desc.mip_num {
        return Err(Error::invalid(format!(
            "mip {mip} of a texture with {} mips",
            desc.mip_num
        )));
    }
    let props = desc.format.props();
    let [width, height, depth] = desc.mip_extent(mip);
    let block_width = u32::from(props.block_width.max(1));
    let block_height = u32::from(props.block_height.max(1));

    let content_row_pitch = width.div_ceil(block_width) * u32::from(props.stride);
    let row_num = height.div_ceil(block_height);
    let row_pitch = align_up(u64::from(content_row_pitch), u64::from(row_alignment)) as u32;
    let slice_pitch = align_up(
        u64::from(row_pitch) * u64::from(row_num),
        u64::from(slice_alignment),
    ) as u32;
    let slice_num = if desc.texture_type == TextureType::Texture3D {
        depth
    } else {
        1
    };

    Ok(TextureSubresourceLayout {
        content_row_pitch,
        row_pitch,
        slice_pitch,
        row_num,
        slice_num,
    })
}

/// Resource placement inside a planned allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannedBinding {
    /// Index into the list of memory descriptions passed to the planner.
    pub resource: usize,
    pub offset: u64,
}

/// One memory object `allocate_and_bind_memory` will create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationPlan {
    pub memory_type: MemoryType,
    pub size: u64,
    pub dedicated: bool,
    pub bindings: Vec<PlannedBinding>,
}

/// Pack resources into allocations of at most `preferred_memory_size`.
///
/// Dedicated resources and resources larger than the cap get their own
/// allocation. Others go first-fit into an open allocation of the same type.
pub fn plan_allocations(descs: &[MemoryDesc], preferred_memory_size: u64) -> Vec<AllocationPlan> {
    let cap = if preferred_memory_size == 0 {
        DEFAULT_PREFERRED_MEMORY_SIZE
    } else {
        preferred_memory_size
    };
    let mut plans: Vec<AllocationPlan> = Vec::new();

    for (resource, desc) in descs.iter().enumerate() {
        if desc.must_be_dedicated || desc.size > cap {
            plans.push(AllocationPlan {
                memory_type: desc.memory_type,
                size: desc.size,
                dedicated: desc.must_be_dedicated,
                bindings: vec![PlannedBinding {
                    resource,
                    offset: 0,
                }],
            });
            continue;
        }

        let open = plans.iter_mut().find(|plan| {
            !plan.dedicated
                && plan.memory_type == desc.memory_type
                && align_up(plan.size, desc.alignment) + desc.size <= cap
        });

        match open {
            Some(plan) => {
                let offset = align_up(plan.size, desc.alignment);
                plan.size = offset + desc.size;
                plan.bindings.push(PlannedBinding { resource, offset });
            }
            None => plans.push(AllocationPlan {
                memory_type: desc.memory_type,
                size: desc.size,
                dedicated: false,
                bindings: vec![PlannedBinding {
                    resource,
                    offset: 0,
                }],
            }),
        }
    }

    plans
}

/// Helpers available on every device.
pub trait HelperInterface<B: Backend> {
    /// How many memory objects `allocate_and_bind_memory` would create.
    fn calculate_allocation_number(&self, group: &ResourceGroupDesc<'_, B>) -> Result<usize>;

    /// Allocate memory for the group and bind every resource.
    fn allocate_and_bind_memory(&self, group: &ResourceGroupDesc<'_, B>) -> Result<Vec<B::Memory>>;

    /// Upload through a staging buffer and wait for completion.
    fn upload_data(
        &self,
        queue: &B::Queue,
        textures: &[TextureUploadDesc<'_, B>],
        buffers: &[BufferUploadDesc<'_, B>],
    ) -> Result<()>;

    fn get_texture_subresource_layout(
        &self,
        desc: &TextureDesc,
        mip: u32,
    ) -> Result<TextureSubresourceLayout>;
}

impl<B: Backend, D: CoreInterface<B>> HelperInterface<B> for D {
    fn calculate_allocation_number(&self, group: &ResourceGroupDesc<'_, B>) -> Result<usize> {
        let descs = group_memory_descs(self, group)?;
        Ok(plan_allocations(&descs, group.preferred_memory_size).len())
    }

    fn allocate_and_bind_memory(&self, group: &ResourceGroupDesc<'_, B>) -> Result<Vec<B::Memory>> {
        check_unbound(self, group)?;
        let descs = group_memory_descs(self, group)?;
        let plans = plan_allocations(&descs, group.preferred_memory_size);
        debug!(
            "Grouping {} resources into {} allocations",
            descs.len(),
            plans.len()
        );

        let mut memories = Vec::with_capacity(plans.len());
        for plan in &plans {
            let allocated = self.allocate_memory(&AllocateMemoryDesc {
                size: plan.size,
                memory_type: plan.memory_type,
                priority: 0.0,
            });
            match allocated {
                Ok(memory) => memories.push(memory),
                Err(e) => {
                    for memory in memories {
                        unsafe { self.free_memory(memory) };
                    }
                    return Err(e);
                }
            }
        }

        let bound = {
            let buffer_num = group.buffers.len();
            let mut buffer_bindings = Vec::with_capacity(buffer_num);
            let mut texture_bindings = Vec::with_capacity(group.textures.len());
            for (plan, memory) in plans.iter().zip(&memories) {
                for binding in &plan.bindings {
                    if binding.resource < buffer_num {
                        buffer_bindings.push(BufferMemoryBindingDesc {
                            buffer: group.buffers[binding.resource],
                            memory,
                            offset: binding.offset,
                        });
                    } else {
                        texture_bindings.push(TextureMemoryBindingDesc {
                            texture: group.textures[binding.resource - buffer_num],
                            memory,
                            offset: binding.offset,
                        });
                    }
                }
            }

            self.bind_buffer_memory(&buffer_bindings)
                .and_then(|()| self.bind_texture_memory(&texture_bindings))
        };
        if let Err(e) = bound {
            for memory in memories {
                unsafe { self.free_memory(memory) };
            }
            return Err(e);
        }

        Ok(memories)
    }

    fn upload_data(
        &self,
        queue: &B::Queue,
        textures: &[TextureUploadDesc<'_, B>],
        buffers: &[BufferUploadDesc<'_, B>],
    ) -> Result<()> {
        let staging = plan_staging(self, textures, buffers)?;
        if staging.size == 0 {
            return Ok(());
        }

        let buffer = self.create_buffer(&BufferDesc::new(staging.size, BufferUsageBits::empty()))?;
        let mut memory = None;
        let mut allocator = None;
        let result = (|| {
            let memory_desc = self.get_buffer_memory_desc(&buffer, MemoryLocation::HostUpload)?;
            let mem = memory.insert(self.allocate_memory(&AllocateMemoryDesc {
                size: memory_desc.size,
                memory_type: memory_desc.memory_type,
                priority: 0.0,
            })?);
            self.bind_buffer_memory(&[BufferMemoryBindingDesc {
                buffer: &buffer,
                memory: mem,
                offset: 0,
            }])?;
            write_staging(self, &buffer, &staging, textures, buffers)?;

            let alloc = allocator.insert(self.create_command_allocator(queue)?);
            let mut command_buffer = self.create_command_buffer(alloc)?;
            let recorded = unsafe {
                record_uploads(self, &mut command_buffer, &buffer, &staging, textures, buffers)
            };
            let submitted =
                recorded.and_then(|()| submit_and_wait::<B, Self>(self, queue, &command_buffer));
            unsafe { self.destroy_command_buffer(command_buffer) };
            submitted
        })();

        unsafe {
            if let Some(alloc) = allocator {
                self.destroy_command_allocator(alloc);
            }
            self.destroy_buffer(buffer);
            if let Some(mem) = memory {
                self.free_memory(mem);
            }
        }
        result
    }

    fn get_texture_subresource_layout(
        &self,
        desc: &TextureDesc,
        mip: u32,
    ) -> Result<TextureSubresourceLayout> {
        let device_desc = self.get_device_desc();
        texture_subresource_layout(
            desc,
            mip,
            device_desc.upload_buffer_texture_row_alignment,
            device_desc.upload_buffer_texture_slice_alignment,
        )
    }
}

/// Every resource of the group must be unbound and listed once, so binding
/// can only fail natively once memory is allocated.
fn check_unbound<B: Backend, D: CoreInterface<B>>(
    device: &D,
    group: &ResourceGroupDesc<'_, B>,
) -> Result<()> {
    for (index, &buffer) in group.buffers.iter().enumerate() {
        if device.is_buffer_memory_bound(buffer)
            || group.buffers[..index].iter().any(|&b| std::ptr::eq(b, buffer))
        {
            return Err(Error::invalid(format!(
                "buffer {index} of the group is already bound"
            )));
        }
    }
    for (index, &texture) in group.textures.iter().enumerate() {
        if device.is_texture_memory_bound(texture)
            || group.textures[..index].iter().any(|&t| std::ptr::eq(t, texture))
        {
            return Err(Error::invalid(format!(
                "texture {index} of the group is already bound"
            )));
        }
    }
    Ok(())
}

fn group_memory_descs<B: Backend, D: CoreInterface<B>>(
    device: &D,
    group: &ResourceGroupDesc<'_, B>,
) -> Result<Vec<MemoryDesc>> {
    let mut descs = Vec::with_capacity(group.buffers.len() + group.textures.len());
    for buffer in group.buffers {
        descs.push(device.get_buffer_memory_desc(buffer, group.memory_location)?);
    }
    for texture in group.textures {
        descs.push(device.get_texture_memory_desc(texture, group.memory_location)?);
    }
    Ok(descs)
}

/// Staging buffer offsets for every upload.
struct StagingPlan {
    size: u64,
    /// Per texture, per subresource: offset and layout.
    textures: Vec<Vec<(u64, TextureSubresourceLayout)>>,
    buffers: Vec<u64>,
}

fn plan_staging<B: Backend, D: CoreInterface<B>>(
    device: &D,
    textures: &[TextureUploadDesc<'_, B>],
    buffers: &[BufferUploadDesc<'_, B>],
) -> Result<StagingPlan> {
    let device_desc = device.get_device_desc();
    let slice_alignment = u64::from(device_desc.upload_buffer_texture_slice_alignment);
    let mut size = 0u64;
    let mut texture_offsets = Vec::with_capacity(textures.len());

    for upload in textures {
        let desc = device.get_texture_desc(upload.texture);
        if upload.subresources.is_empty() {
            texture_offsets.push(Vec::new());
            continue;
        }
        let expected = (desc.mip_num * desc.layer_num) as usize;
        if upload.subresources.len() != expected {
            return Err(Error::invalid(format!(
                "texture upload has {} subresources, texture has {}",
                upload.subresources.len(),
                expected
            )));
        }
        let mut offsets = Vec::with_capacity(expected);
        for index in 0..expected {
            let mip = index as u32 % desc.mip_num;
            let layout = texture_subresource_layout(
                desc,
                mip,
                device_desc.upload_buffer_texture_row_alignment,
                device_desc.upload_buffer_texture_slice_alignment,
            )?;
            let subresource = &upload.subresources[index];
            if subresource.row_pitch < layout.content_row_pitch {
                return Err(Error::invalid("texture upload row pitch is too small"));
            }
            let needed = u64::from(subresource.slice_pitch) * u64::from(layout.slice_num.max(1) - 1)
                + u64::from(subresource.row_pitch) * u64::from(layout.row_num.max(1) - 1)
                + u64::from(layout.content_row_pitch);
            if (subresource.slices.len() as u64) < needed {
                return Err(Error::invalid("texture upload data is too small"));
            }
            size = align_up(size, slice_alignment);
            offsets.push((size, layout));
            size += u64::from(layout.slice_pitch) * u64::from(layout.slice_num);
        }
        texture_offsets.push(offsets);
    }

    let mut buffer_offsets = Vec::with_capacity(buffers.len());
    for upload in buffers {
        size = align_up(size, 16);
        buffer_offsets.push(size);
        size += upload.data.len() as u64;
    }

    Ok(StagingPlan {
        size,
        textures: texture_offsets,
        buffers: buffer_offsets,
    })
}

fn write_staging<B: Backend, D: CoreInterface<B>>(
    device: &D,
    buffer: &B::Buffer,
    staging: &StagingPlan,
    textures: &[TextureUploadDesc<'_, B>],
    buffers: &[BufferUploadDesc<'_, B>],
) -> Result<()> {
    let ptr = unsafe { device.map_buffer(buffer, 0, WHOLE_SIZE)? };
    // The staging buffer is ours alone and was sized by `plan_staging`.
    let dst = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), staging.size as usize) };

    for (upload, offsets) in textures.iter().zip(&staging.textures) {
        for (subresource, (base, layout)) in upload.subresources.iter().zip(offsets) {
            let row_bytes = layout.content_row_pitch as usize;
            for slice in 0..layout.slice_num as usize {
                for row in 0..layout.row_num as usize {
                    let src_start =
                        slice * subresource.slice_pitch as usize + row * subresource.row_pitch as usize;
                    let dst_start = *base as usize
                        + slice * layout.slice_pitch as usize
                        + row * layout.row_pitch as usize;
                    dst[dst_start..dst_start + row_bytes]
                        .copy_from_slice(&subresource.slices[src_start..src_start + row_bytes]);
                }
            }
        }
    }

    for (upload, &offset) in buffers.iter().zip(&staging.buffers) {
        let start = offset as usize;
        dst[start..start + upload.data.len()].copy_from_slice(upload.data);
    }

    unsafe { device.unmap_buffer(buffer) };
    Ok(())
}

const COPY_DESTINATION: AccessLayoutStage =
    AccessLayoutStage::new(AccessBits::COPY_DESTINATION, Layout::CopyDestination, StageBits::COPY);

unsafe fn record_uploads<B: Backend, D: CoreInterface<B>>(
    device: &D,
    command_buffer: &mut B::CommandBuffer,
    staging_buffer: &B::Buffer,
    staging: &StagingPlan,
    textures: &[TextureUploadDesc<'_, B>],
    buffers: &[BufferUploadDesc<'_, B>],
) -> Result<()> {
    let copy_destination = AccessStage::new(AccessBits::COPY_DESTINATION, StageBits::COPY);

    let before_textures: Vec<_> = textures
        .iter()
        .map(|upload| {
            let mut barrier =
                TextureBarrierDesc::new(upload.texture, AccessLayoutStage::UNDEFINED, COPY_DESTINATION);
            barrier.planes = upload.planes;
            barrier
        })
        .collect();
    let before_buffers: Vec<_> = buffers
        .iter()
        .map(|upload| BufferBarrierDesc {
            buffer: upload.buffer,
            before: AccessStage::default(),
            after: copy_destination,
        })
        .collect();

    unsafe {
        command_buffer.begin(None)?;
        command_buffer.barrier(&BarrierGroupDesc {
            globals: &[],
            buffers: &before_buffers,
            textures: &before_textures,
        });

        for (upload, offsets) in textures.iter().zip(&staging.textures) {
            let desc = device.get_texture_desc(upload.texture);
            for (index, (offset, layout)) in offsets.iter().enumerate() {
                let region = TextureRegionDesc {
                    mip_offset: index as u32 % desc.mip_num,
                    layer_offset: index as u32 / desc.mip_num,
                    planes: upload.planes,
                    ..Default::default()
                };
                let data_layout = TextureDataLayoutDesc {
                    offset: *offset,
                    row_pitch: layout.row_pitch,
                    slice_pitch: layout.slice_pitch,
                };
                command_buffer.upload_buffer_to_texture(
                    upload.texture,
                    &region,
                    staging_buffer,
                    &data_layout,
                );
            }
        }

        for (upload, &offset) in buffers.iter().zip(&staging.buffers) {
            command_buffer.copy_buffer(
                upload.buffer,
                upload.buffer_offset,
                staging_buffer,
                offset,
                upload.data.len() as u64,
            );
        }

        let after_textures: Vec<_> = textures
            .iter()
            .map(|upload| {
                let mut barrier =
                    TextureBarrierDesc::new(upload.texture, COPY_DESTINATION, upload.after);
                barrier.planes = upload.planes;
                barrier
            })
            .collect();
        let after_buffers: Vec<_> = buffers
            .iter()
            .map(|upload| BufferBarrierDesc {
                buffer: upload.buffer,
                before: copy_destination,
                after: upload.after,
            })
            .collect();
        command_buffer.barrier(&BarrierGroupDesc {
            globals: &[],
            buffers: &after_buffers,
            textures: &after_textures,
        });
        command_buffer.end()
    }
}

fn submit_and_wait<B: Backend, D: CoreInterface<B>>(
    device: &D,
    queue: &B::Queue,
    command_buffer: &B::CommandBuffer,
) -> Result<()> {
    let fence = device.create_fence(0)?;
    let signal = [FenceSubmitDesc {
        fence: &fence,
        value: 1,
        stages: StageBits::ALL,
    }];
    let result = unsafe {
        queue.submit(&QueueSubmitDesc {
            command_buffers: &[command_buffer],
            signal_fences: &signal,
            ..Default::default()
        })
    }
    .and_then(|()| device.wait(&fence, 1));
    unsafe { device.destroy_fence(fence) };
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;
    use crate::memory::MemoryTypeInfo;

    fn memory_type(index: u16) -> MemoryType {
        MemoryType::pack(MemoryTypeInfo {
            index,
            location: MemoryLocation::Device,
            must_be_dedicated: false,
        })
    }

    fn desc(size: u64, alignment: u64, index: u16) -> MemoryDesc {
        MemoryDesc {
            size,
            alignment,
            memory_type: memory_type(index),
            must_be_dedicated: false,
        }
    }

    #[test]
    fn groups_by_memory_type() {
        let descs = [desc(100, 256, 0), desc(100, 256, 1), desc(100, 256, 0)];
        let plans = plan_allocations(&descs, 0);
        assert_eq!(plans.len(), 2);
        assert_eq!(
            plans[0].bindings,
            vec![
                PlannedBinding {
                    resource: 0,
                    offset: 0
                },
                PlannedBinding {
                    resource: 2,
                    offset: 256
                },
            ]
        );
        assert_eq!(plans[0].size, 356);
        assert_eq!(plans[1].bindings.len(), 1);
    }

    #[test]
    fn respects_preferred_size_and_dedication() {
        let mut dedicated = desc(64, 64, 0);
        dedicated.must_be_dedicated = true;
        let descs = [desc(600, 1, 0), desc(600, 1, 0), dedicated, desc(2000, 1, 0)];
        let plans = plan_allocations(&descs, 1024);
        assert_eq!(plans.len(), 4);
        assert!(plans[2].dedicated);
        assert!(!plans[3].dedicated);
        assert_eq!(plans[3].size, 2000);
    }

    #[test]
    fn uncompressed_layout() {
        let desc = TextureDesc::texture_2d(Format::Rgba8Unorm, 100, 10, 1, 1);
        let layout = texture_subresource_layout(&desc, 0, 256, 512).unwrap();
        assert_eq!(layout.content_row_pitch, 400);
        assert_eq!(layout.row_pitch, 512);
        assert_eq!(layout.row_num, 10);
        assert_eq!(layout.slice_pitch, 5120);
        assert_eq!(layout.slice_num, 1);
    }

    #[test]
    fn compressed_layout_counts_blocks() {
        let desc = TextureDesc::texture_2d(Format::Bc1RgbaUnorm, 30, 30, 2, 1);
        let layout = texture_subresource_layout(&desc, 0, 1, 1).unwrap();
        // 8 blocks of 8 bytes per row, 8 rows of blocks.
        assert_eq!(layout.content_row_pitch, 64);
        assert_eq!(layout.row_num, 8);

        let mip1 = texture_subresource_layout(&desc, 1, 1, 1).unwrap();
        assert_eq!(mip1.content_row_pitch, 32);
        assert_eq!(mip1.row_num, 4);
    }

    #[test]
    fn mips_past_the_chain_are_invalid() {
        let desc = TextureDesc::texture_2d(Format::Rgba8Unorm, 64, 64, 7, 1);
        assert!(texture_subresource_layout(&desc, 6, 1, 1).is_ok());
        for mip in [7, 32, u32::MAX] {
            let err = texture_subresource_layout(&desc, mip, 1, 1).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "mip {mip}");
        }
    }

    #[test]
    fn volume_layout_has_slices() {
        let desc = TextureDesc::texture_3d(Format::R16Sfloat, 8, 8, 4, 1);
        let layout = texture_subresource_layout(&desc, 0, 1, 1).unwrap();
        assert_eq!(layout.slice_num, 4);
        assert_eq!(layout.slice_pitch, 128);
    }
}
