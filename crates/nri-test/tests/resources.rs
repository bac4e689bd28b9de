use nri_core::{
    AccessBits, AccessStage, BarrierGroupDesc, BufferBarrierDesc, BufferDesc,
    BufferMemoryBindingDesc, BufferUploadDesc, BufferUsageBits, BufferViewDesc, BufferViewType,
    CommandBufferInterface, CoreInterface, Format, HelperInterface, MemoryLocation,
    ResourceGroupDesc, ResultCode, StageBits, TextureDesc, TextureUsageBits, WHOLE_SIZE,
};
use nri_test::device_or_skip;

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

#[test]
#[ignore = "Requires GPU hardware"]
fn zero_sized_buffers_are_invalid() {
    let harness = device_or_skip!();
    let err = harness
        .device()
        .create_buffer(&BufferDesc::new(0, BufferUsageBits::empty()))
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidArgument);
}

#[test]
#[ignore = "Requires GPU hardware"]
fn buffers_without_memory_cannot_be_mapped() {
    let harness = device_or_skip!();
    let device = harness.device();
    let buffer = device
        .create_buffer(&BufferDesc::new(256, BufferUsageBits::empty()))
        .unwrap();

    let err = unsafe { device.map_buffer(&buffer, 0, WHOLE_SIZE) }.unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidArgument);
    unsafe { device.destroy_buffer(buffer) };
}

#[test]
#[ignore = "Requires GPU hardware"]
fn mapping_past_the_end_is_invalid() {
    let harness = device_or_skip!();
    let device = harness.device();
    let buffer = harness.upload_buffer(&pattern(64), BufferUsageBits::empty()).unwrap();

    let err = unsafe { device.map_buffer(&buffer, 32, 64) }.unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidArgument);
    unsafe { device.destroy_buffer(buffer) };
}

#[test]
#[ignore = "Requires GPU hardware"]
fn copy_buffer_round_trips_through_the_gpu() {
    let harness = device_or_skip!();
    let device = harness.device();
    let data = pattern(1024);
    let src = harness.upload_buffer(&data, BufferUsageBits::empty()).unwrap();
    let dst = harness
        .buffer(1024, BufferUsageBits::empty(), MemoryLocation::HostReadback)
        .unwrap();

    harness
        .submit(|cb| {
            unsafe {
                cb.copy_buffer(&dst, 0, &src, 0, 512);
                cb.copy_buffer(&dst, 512, &src, 768, 256);
                cb.copy_buffer(&dst, 768, &src, 512, 256);
            }
            Ok(())
        })
        .unwrap();

    let out = harness.read_buffer(&dst, 1024).unwrap();
    assert_eq!(&out[..512], &data[..512]);
    assert_eq!(&out[512..768], &data[768..]);
    assert_eq!(&out[768..], &data[512..768]);
    unsafe {
        device.destroy_buffer(src);
        device.destroy_buffer(dst);
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn grouped_memory_binds_every_buffer_once() {
    let harness = device_or_skip!();
    let device = harness.device();
    let first = device
        .create_buffer(&BufferDesc::new(4096, BufferUsageBits::empty()))
        .unwrap();
    let second = device
        .create_buffer(&BufferDesc::new(4096, BufferUsageBits::empty()))
        .unwrap();
    let group = ResourceGroupDesc {
        memory_location: MemoryLocation::Device,
        buffers: &[&first, &second],
        textures: &[],
        preferred_memory_size: 0,
    };

    assert_eq!(device.calculate_allocation_number(&group).unwrap(), 1);
    let memories = device.allocate_and_bind_memory(&group).unwrap();
    assert_eq!(memories.len(), 1);

    let err = device
        .bind_buffer_memory(&[BufferMemoryBindingDesc {
            buffer: &first,
            memory: &memories[0],
            offset: 0,
        }])
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidArgument);

    unsafe {
        device.destroy_buffer(first);
        device.destroy_buffer(second);
        for memory in memories {
            device.free_memory(memory);
        }
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn failed_groups_leave_resources_unbound() {
    let harness = device_or_skip!();
    let device = harness.device();
    let buffer = device
        .create_buffer(&BufferDesc::new(4096, BufferUsageBits::empty()))
        .unwrap();
    let texture = device
        .create_texture(
            &TextureDesc::texture_2d(Format::Rgba8Unorm, 64, 64, 1, 1)
                .with_usage(TextureUsageBits::SHADER_RESOURCE),
        )
        .unwrap();
    let texture_memories = device
        .allocate_and_bind_memory(&ResourceGroupDesc {
            memory_location: MemoryLocation::Device,
            buffers: &[],
            textures: &[&texture],
            preferred_memory_size: 0,
        })
        .unwrap();
    assert!(device.is_texture_memory_bound(&texture));

    // The texture is bound already, so the buffer must stay untouched.
    let err = device
        .allocate_and_bind_memory(&ResourceGroupDesc {
            memory_location: MemoryLocation::Device,
            buffers: &[&buffer],
            textures: &[&texture],
            preferred_memory_size: 0,
        })
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidArgument);
    assert!(!device.is_buffer_memory_bound(&buffer));

    let err = device
        .allocate_and_bind_memory(&ResourceGroupDesc {
            memory_location: MemoryLocation::Device,
            buffers: &[&buffer, &buffer],
            textures: &[],
            preferred_memory_size: 0,
        })
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidArgument);
    assert!(!device.is_buffer_memory_bound(&buffer));

    let buffer_memories = device
        .allocate_and_bind_memory(&ResourceGroupDesc {
            memory_location: MemoryLocation::Device,
            buffers: &[&buffer],
            textures: &[],
            preferred_memory_size: 0,
        })
        .unwrap();
    assert!(device.is_buffer_memory_bound(&buffer));

    unsafe {
        device.destroy_buffer(buffer);
        device.destroy_texture(texture);
        for memory in buffer_memories.into_iter().chain(texture_memories) {
            device.free_memory(memory);
        }
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn bind_batches_are_validated_before_binding() {
    let harness = device_or_skip!();
    let device = harness.device();
    let first = device
        .create_buffer(&BufferDesc::new(256, BufferUsageBits::empty()))
        .unwrap();
    let second = device
        .create_buffer(&BufferDesc::new(256, BufferUsageBits::empty()))
        .unwrap();
    let memories = device
        .allocate_and_bind_memory(&ResourceGroupDesc {
            memory_location: MemoryLocation::Device,
            buffers: &[&first],
            textures: &[],
            preferred_memory_size: 0,
        })
        .unwrap();

    let err = device
        .bind_buffer_memory(&[
            BufferMemoryBindingDesc {
                buffer: &second,
                memory: &memories[0],
                offset: 0,
            },
            BufferMemoryBindingDesc {
                buffer: &second,
                memory: &memories[0],
                offset: 0,
            },
        ])
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidArgument);
    assert!(!device.is_buffer_memory_bound(&second));

    unsafe {
        device.destroy_buffer(first);
        device.destroy_buffer(second);
        for memory in memories {
            device.free_memory(memory);
        }
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn upload_data_fills_device_local_buffers() {
    let harness = device_or_skip!();
    let device = harness.device();
    let data = pattern(3000);
    let target = harness
        .buffer(4096, BufferUsageBits::empty(), MemoryLocation::Device)
        .unwrap();
    let readback = harness
        .buffer(3000, BufferUsageBits::empty(), MemoryLocation::HostReadback)
        .unwrap();

    device
        .upload_data(
            harness.graphics_queue().unwrap(),
            &[],
            &[BufferUploadDesc {
                data: &data,
                buffer: &target,
                buffer_offset: 1000,
                after: AccessStage::new(AccessBits::COPY_SOURCE, StageBits::COPY),
            }],
        )
        .unwrap();
    harness
        .submit(|cb| {
            unsafe { cb.copy_buffer(&readback, 0, &target, 1000, 3000) };
            Ok(())
        })
        .unwrap();

    assert_eq!(harness.read_buffer(&readback, 3000).unwrap(), data);
    unsafe {
        device.destroy_buffer(target);
        device.destroy_buffer(readback);
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn clear_storage_buffer_fills_the_view() {
    let harness = device_or_skip!();
    let device = harness.device();
    let storage = harness
        .buffer(256, BufferUsageBits::SHADER_RESOURCE_STORAGE, MemoryLocation::Device)
        .unwrap();
    let readback = harness
        .buffer(256, BufferUsageBits::empty(), MemoryLocation::HostReadback)
        .unwrap();
    let view = device
        .create_buffer_view(&BufferViewDesc {
            buffer: &storage,
            view_type: BufferViewType::ShaderResourceStorage,
            format: Format::Unknown,
            offset: 0,
            size: WHOLE_SIZE,
        })
        .unwrap();

    harness
        .submit(|cb| {
            unsafe {
                cb.clear_storage_buffer(&view, 0xA5A5_A5A5);
                cb.barrier(&BarrierGroupDesc {
                    buffers: &[BufferBarrierDesc {
                        buffer: &storage,
                        before: AccessStage::new(AccessBits::COPY_DESTINATION, StageBits::CLEAR_STORAGE),
                        after: AccessStage::new(AccessBits::COPY_SOURCE, StageBits::COPY),
                    }],
                    ..Default::default()
                });
                cb.copy_buffer(&readback, 0, &storage, 0, WHOLE_SIZE);
            }
            Ok(())
        })
        .unwrap();

    let out = harness.read_buffer(&readback, 256).unwrap();
    assert!(out.iter().all(|&b| b == 0xA5));
    unsafe {
        device.destroy_descriptor(view);
        device.destroy_buffer(storage);
        device.destroy_buffer(readback);
    }
}
