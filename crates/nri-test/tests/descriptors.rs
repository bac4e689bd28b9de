use nri_core::{
    BufferUsageBits, BufferViewDesc, BufferViewType, CommandBufferInterface, CoreInterface,
    DescriptorPoolDesc, DescriptorRangeDesc, DescriptorRangeUpdateDesc, DescriptorSetCopyDesc,
    DescriptorSetDesc, DescriptorType, Format, MemoryLocation, PipelineLayoutDesc, QueueType,
    ResultCode, RootConstantDesc, StageBits, WHOLE_SIZE,
};
use nri_test::device_or_skip;

const RANGES: [DescriptorRangeDesc; 2] = [
    DescriptorRangeDesc::new(
        0,
        2,
        DescriptorType::StorageStructuredBuffer,
        StageBits::COMPUTE_SHADER,
    ),
    DescriptorRangeDesc::new(2, 1, DescriptorType::Buffer, StageBits::COMPUTE_SHADER),
];

fn set_desc() -> DescriptorSetDesc<'static> {
    DescriptorSetDesc {
        register_space: 0,
        ranges: &RANGES,
        ..Default::default()
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn descriptor_sets_follow_the_layout() {
    let harness = device_or_skip!();
    let device = harness.device();
    let sets = [set_desc()];
    let layout = device
        .create_pipeline_layout(&PipelineLayoutDesc {
            root_constants: &[RootConstantDesc {
                register_index: 0,
                size: 16,
                shader_stages: StageBits::COMPUTE_SHADER,
            }],
            descriptor_sets: &sets,
            shader_stages: StageBits::COMPUTE_SHADER,
            ..Default::default()
        })
        .unwrap();
    let mut pool_desc = DescriptorPoolDesc::default();
    pool_desc.reserve_for(&sets[0], 2);
    let pool = device.create_descriptor_pool(&pool_desc).unwrap();

    let err = device
        .allocate_descriptor_sets(&pool, &layout, 1, 1, 0)
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidArgument);
    assert!(device
        .allocate_descriptor_sets(&pool, &layout, 0, 0, 0)
        .unwrap()
        .is_empty());
    let allocated = device.allocate_descriptor_sets(&pool, &layout, 0, 2, 0).unwrap();
    assert_eq!(allocated.len(), 2);

    let buffer = harness
        .buffer(
            1024,
            BufferUsageBits::SHADER_RESOURCE | BufferUsageBits::SHADER_RESOURCE_STORAGE,
            MemoryLocation::Device,
        )
        .unwrap();
    let storage = device
        .create_buffer_view(&BufferViewDesc {
            buffer: &buffer,
            view_type: BufferViewType::ShaderResourceStorage,
            format: Format::Unknown,
            offset: 0,
            size: 512,
        })
        .unwrap();
    let typed = device
        .create_buffer_view(&BufferViewDesc {
            buffer: &buffer,
            view_type: BufferViewType::ShaderResource,
            format: Format::R32Uint,
            offset: 0,
            size: WHOLE_SIZE,
        })
        .unwrap();

    unsafe {
        device
            .update_descriptor_ranges(
                &allocated[0],
                0,
                &[
                    DescriptorRangeUpdateDesc {
                        descriptors: &[&storage, &storage],
                        base_descriptor: 0,
                    },
                    DescriptorRangeUpdateDesc {
                        descriptors: &[&typed],
                        base_descriptor: 0,
                    },
                ],
            )
            .unwrap();

        let overflow = device
            .update_descriptor_ranges(
                &allocated[0],
                1,
                &[DescriptorRangeUpdateDesc {
                    descriptors: &[&typed],
                    base_descriptor: 1,
                }],
            )
            .unwrap_err();
        assert_eq!(overflow.code(), ResultCode::InvalidArgument);

        let missing = device
            .update_descriptor_ranges(
                &allocated[0],
                2,
                &[DescriptorRangeUpdateDesc {
                    descriptors: &[&typed],
                    base_descriptor: 0,
                }],
            )
            .unwrap_err();
        assert_eq!(missing.code(), ResultCode::InvalidArgument);

        device
            .copy_descriptor_set(
                &allocated[1],
                &DescriptorSetCopyDesc {
                    src_descriptor_set: &allocated[0],
                    src_base_range: 0,
                    dst_base_range: 0,
                    range_num: 2,
                },
            )
            .unwrap();

        device.reset_descriptor_pool(&pool).unwrap();
        device.destroy_descriptor(storage);
        device.destroy_descriptor(typed);
        device.destroy_buffer(buffer);
        device.destroy_descriptor_pool(pool);
        device.destroy_pipeline_layout(layout);
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn raw_views_cannot_fill_typed_ranges() {
    let harness = device_or_skip!();
    let device = harness.device();
    let sets = [set_desc()];
    let layout = device
        .create_pipeline_layout(&PipelineLayoutDesc {
            descriptor_sets: &sets,
            shader_stages: StageBits::COMPUTE_SHADER,
            ..Default::default()
        })
        .unwrap();
    let mut pool_desc = DescriptorPoolDesc::default();
    pool_desc.reserve_for(&sets[0], 1);
    let pool = device.create_descriptor_pool(&pool_desc).unwrap();
    let mut allocated = device.allocate_descriptor_sets(&pool, &layout, 0, 1, 0).unwrap();
    let set = allocated.pop().unwrap();

    let buffer = harness
        .buffer(256, BufferUsageBits::SHADER_RESOURCE, MemoryLocation::Device)
        .unwrap();
    let raw = device
        .create_buffer_view(&BufferViewDesc {
            buffer: &buffer,
            view_type: BufferViewType::ShaderResource,
            format: Format::Unknown,
            offset: 0,
            size: WHOLE_SIZE,
        })
        .unwrap();

    unsafe {
        let err = device
            .update_descriptor_ranges(
                &set,
                1,
                &[DescriptorRangeUpdateDesc {
                    descriptors: &[&raw],
                    base_descriptor: 0,
                }],
            )
            .unwrap_err();
        assert_eq!(err.code(), ResultCode::InvalidArgument);

        device.destroy_descriptor(raw);
        device.destroy_buffer(buffer);
        device.destroy_descriptor_pool(pool);
        device.destroy_pipeline_layout(layout);
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn undeclared_register_spaces_cannot_be_allocated() {
    let harness = device_or_skip!();
    let device = harness.device();
    let sets = [DescriptorSetDesc {
        register_space: 1,
        ..set_desc()
    }];
    let layout = device
        .create_pipeline_layout(&PipelineLayoutDesc {
            descriptor_sets: &sets,
            shader_stages: StageBits::COMPUTE_SHADER,
            ..Default::default()
        })
        .unwrap();
    let mut pool_desc = DescriptorPoolDesc::default();
    pool_desc.reserve_for(&sets[0], 1);
    let pool = device.create_descriptor_pool(&pool_desc).unwrap();

    let err = device
        .allocate_descriptor_sets(&pool, &layout, 0, 1, 0)
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidArgument);
    assert_eq!(
        device.allocate_descriptor_sets(&pool, &layout, 1, 1, 0).unwrap().len(),
        1
    );

    unsafe {
        device.destroy_descriptor_pool(pool);
        device.destroy_pipeline_layout(layout);
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn compute_queues_bind_compute_layouts_only() {
    let harness = device_or_skip!();
    let device = harness.device();
    let Ok(queue) = device.get_queue(QueueType::Compute, 0) else {
        eprintln!("Skipping: no compute queue");
        return;
    };
    let sets = [set_desc()];
    let every_stage = device
        .create_pipeline_layout(&PipelineLayoutDesc {
            descriptor_sets: &sets,
            ..Default::default()
        })
        .unwrap();
    let fragment_only = device
        .create_pipeline_layout(&PipelineLayoutDesc {
            descriptor_sets: &sets,
            shader_stages: StageBits::FRAGMENT_SHADER,
            ..Default::default()
        })
        .unwrap();
    let mut pool_desc = DescriptorPoolDesc::default();
    pool_desc.reserve_for(&sets[0], 1);
    let pool = device.create_descriptor_pool(&pool_desc).unwrap();
    let mut allocated = device
        .allocate_descriptor_sets(&pool, &every_stage, 0, 1, 0)
        .unwrap();
    let set = allocated.pop().unwrap();

    let allocator = device.create_command_allocator(queue).unwrap();
    let mut cb = device.create_command_buffer(&allocator).unwrap();
    unsafe {
        cb.begin(None).unwrap();
        cb.set_pipeline_layout(&every_stage);
        cb.set_descriptor_set(0, &set, &[]).unwrap();
        cb.set_pipeline_layout(&fragment_only);
        let err = cb.set_descriptor_set(0, &set, &[]).unwrap_err();
        assert_eq!(err.code(), ResultCode::InvalidArgument);
        cb.end().unwrap();

        device.destroy_command_buffer(cb);
        device.destroy_command_allocator(allocator);
        device.destroy_descriptor_pool(pool);
        device.destroy_pipeline_layout(every_stage);
        device.destroy_pipeline_layout(fragment_only);
    }
}
