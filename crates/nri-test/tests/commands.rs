use nri_core::{
    AccessBits, AccessLayoutStage, AllocateTextureDesc, BarrierGroupDesc, BufferUsageBits, Color,
    CommandBufferInterface, CoreInterface, FenceSubmitDesc, Format, HelperInterface, Layout,
    MemoryLocation, Object, QueryPoolDesc, QueryType, QueueInterface, QueueSubmitDesc,
    ResourceAllocatorInterface, StageBits, Texture2DViewDesc, Texture2DViewType,
    TextureBarrierDesc, TextureDataLayoutDesc, TextureDesc, TextureRegionDesc,
    TextureSubresourceUploadDesc, TextureUploadDesc, TextureUsageBits, PlaneBits,
};
use nri_test::device_or_skip;

const SIZE: u32 = 16;

fn copy_source() -> AccessLayoutStage {
    AccessLayoutStage::new(AccessBits::COPY_SOURCE, Layout::CopySource, StageBits::COPY)
}

#[test]
#[ignore = "Requires GPU hardware"]
fn fences_advance_on_signal() {
    let harness = device_or_skip!();
    let device = harness.device();
    let queue = harness.graphics_queue().unwrap();
    let fence = device.create_fence(3).unwrap();
    assert_eq!(device.get_fence_value(&fence).unwrap(), 3);

    unsafe {
        queue
            .submit(&QueueSubmitDesc {
                signal_fences: &[FenceSubmitDesc {
                    fence: &fence,
                    value: 7,
                    stages: StageBits::ALL,
                }],
                ..Default::default()
            })
            .unwrap();
    }
    device.wait(&fence, 7).unwrap();
    assert!(device.get_fence_value(&fence).unwrap() >= 7);

    device.set_debug_name(Object::Fence(&fence), "test fence");
    unsafe { device.destroy_fence(fence) };
}

#[test]
#[ignore = "Requires GPU hardware"]
fn cleared_storage_texture_reads_back() {
    let harness = device_or_skip!();
    let device = harness.device();
    let texture = device
        .allocate_texture(&AllocateTextureDesc {
            desc: TextureDesc::texture_2d(Format::Rgba8Unorm, SIZE, SIZE, 1, 1)
                .with_usage(TextureUsageBits::SHADER_RESOURCE_STORAGE),
            memory_location: MemoryLocation::Device,
            dedicated: false,
        })
        .unwrap();
    let view = device
        .create_texture_2d_view(&Texture2DViewDesc::new(
            &texture,
            Texture2DViewType::ShaderResourceStorage2D,
            Format::Rgba8Unorm,
        ))
        .unwrap();
    let layout = device
        .get_texture_subresource_layout(device.get_texture_desc(&texture), 0)
        .unwrap();
    let readback_size = u64::from(layout.slice_pitch);
    let readback = harness
        .buffer(readback_size, BufferUsageBits::empty(), MemoryLocation::HostReadback)
        .unwrap();

    let storage = AccessLayoutStage::new(
        AccessBits::COPY_DESTINATION,
        Layout::ShaderResourceStorage,
        StageBits::CLEAR_STORAGE,
    );
    harness
        .submit(|cb| {
            unsafe {
                cb.barrier(&BarrierGroupDesc {
                    textures: &[TextureBarrierDesc::new(&texture, AccessLayoutStage::UNDEFINED, storage)],
                    ..Default::default()
                });
                cb.clear_storage_texture(&view, Color::Float([1.0, 0.0, 0.0, 1.0]));
                cb.barrier(&BarrierGroupDesc {
                    textures: &[TextureBarrierDesc::new(&texture, storage, copy_source())],
                    ..Default::default()
                });
                cb.readback_texture_to_buffer(
                    &readback,
                    &TextureDataLayoutDesc {
                        offset: 0,
                        row_pitch: layout.row_pitch,
                        slice_pitch: layout.slice_pitch,
                    },
                    &texture,
                    &TextureRegionDesc::default(),
                );
            }
            Ok(())
        })
        .unwrap();

    let out = harness.read_buffer(&readback, readback_size as usize).unwrap();
    for row in 0..SIZE as usize {
        let start = row * layout.row_pitch as usize;
        let texels = &out[start..start + layout.content_row_pitch as usize];
        for texel in texels.chunks_exact(4) {
            assert_eq!(texel, [255, 0, 0, 255], "row {row}");
        }
    }

    unsafe {
        device.destroy_descriptor(view);
        device.destroy_texture(texture);
        device.destroy_buffer(readback);
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn uploaded_texture_reads_back_unchanged() {
    let harness = device_or_skip!();
    let device = harness.device();
    let desc = TextureDesc::texture_2d(Format::Rgba8Unorm, SIZE, SIZE, 1, 1)
        .with_usage(TextureUsageBits::SHADER_RESOURCE);
    let texture = device
        .allocate_texture(&AllocateTextureDesc {
            desc,
            memory_location: MemoryLocation::Device,
            dedicated: true,
        })
        .unwrap();
    assert!(device.is_texture_memory_bound(&texture));

    let row_pitch = SIZE * 4;
    let texels: Vec<u8> = (0..row_pitch * SIZE).map(|i| (i % 256) as u8).collect();
    device
        .upload_data(
            harness.graphics_queue().unwrap(),
            &[TextureUploadDesc {
                texture: &texture,
                subresources: &[TextureSubresourceUploadDesc {
                    slices: &texels,
                    slice_num: 1,
                    row_pitch,
                    slice_pitch: row_pitch * SIZE,
                }],
                after: copy_source(),
                planes: PlaneBits::empty(),
            }],
            &[],
        )
        .unwrap();

    let layout = device.get_texture_subresource_layout(&desc, 0).unwrap();
    let readback = harness
        .buffer(
            u64::from(layout.slice_pitch),
            BufferUsageBits::empty(),
            MemoryLocation::HostReadback,
        )
        .unwrap();
    harness
        .submit(|cb| {
            unsafe {
                cb.readback_texture_to_buffer(
                    &readback,
                    &TextureDataLayoutDesc {
                        offset: 0,
                        row_pitch: layout.row_pitch,
                        slice_pitch: layout.slice_pitch,
                    },
                    &texture,
                    &TextureRegionDesc::default(),
                );
            }
            Ok(())
        })
        .unwrap();

    let out = harness.read_buffer(&readback, layout.slice_pitch as usize).unwrap();
    for row in 0..SIZE as usize {
        let got = &out[row * layout.row_pitch as usize..][..row_pitch as usize];
        let expected = &texels[row * row_pitch as usize..][..row_pitch as usize];
        assert_eq!(got, expected, "row {row}");
    }

    unsafe {
        device.destroy_texture(texture);
        device.destroy_buffer(readback);
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn timestamps_increase_within_a_command_buffer() {
    let harness = device_or_skip!();
    let device = harness.device();
    let pool = device
        .create_query_pool(&QueryPoolDesc {
            query_type: QueryType::Timestamp,
            capacity: 2,
        })
        .unwrap();
    let query_size = device.get_query_size(&pool);
    assert_eq!(query_size, 8);
    let results = harness
        .buffer(
            u64::from(query_size) * 2,
            BufferUsageBits::empty(),
            MemoryLocation::HostReadback,
        )
        .unwrap();

    harness
        .submit(|cb| {
            unsafe {
                cb.reset_queries(&pool, 0, 2);
                cb.end_query(&pool, 0);
                cb.end_query(&pool, 1);
                cb.copy_queries(&pool, 0, 2, &results, 0);
            }
            Ok(())
        })
        .unwrap();

    let bytes = harness.read_buffer(&results, 16).unwrap();
    let first = u64::from_le_bytes(bytes[..8].try_into().unwrap());
    let second = u64::from_le_bytes(bytes[8..].try_into().unwrap());
    assert!(second >= first, "{first} then {second}");

    unsafe {
        device.destroy_query_pool(pool);
        device.destroy_buffer(results);
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn empty_command_buffers_submit() {
    let harness = device_or_skip!();
    harness.submit(|_| Ok(())).unwrap();
    harness
        .submit(|cb| {
            unsafe {
                cb.begin_annotation("empty");
                cb.end_annotation();
            }
            Ok(())
        })
        .unwrap();
    harness.graphics_queue().unwrap().wait_idle().unwrap();
}
