use nri_core::{
    CoreInterface, DeviceCreationDesc, Format, FormatSupportBits, GraphicsApi, QueueInterface,
    QueueType, ResultCode,
};
use nri_test::device_or_skip;

#[test]
fn other_apis_are_rejected_before_loading_vulkan() {
    let desc = DeviceCreationDesc::new().with_graphics_api(GraphicsApi::D3D12);
    let err = nri_vk::create_device(&desc).unwrap_err();
    assert_eq!(err.code(), ResultCode::Unsupported);
}

#[test]
#[ignore = "Requires GPU hardware"]
fn device_desc_describes_a_vulkan_13_device() {
    let harness = device_or_skip!();
    let desc = harness.device().get_device_desc();

    assert_eq!(desc.graphics_api, GraphicsApi::Vk);
    assert!(desc.api_version >= (1, 3), "api version {:?}", desc.api_version);
    assert!(desc.queues(QueueType::Graphics) >= 1);
    assert!(!desc.adapter_desc.name.is_empty());
    assert!(desc.upload_buffer_texture_row_alignment.is_power_of_two());
    assert!(desc.timestamp_frequency_hz > 0);
}

#[test]
#[ignore = "Requires GPU hardware"]
fn adapters_are_listed() {
    let _harness = device_or_skip!();
    let adapters = nri_vk::enumerate_adapters().unwrap();
    assert!(!adapters.is_empty());
    for adapter in &adapters {
        assert!(!adapter.summary().is_empty());
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn adapter_index_past_the_end_is_invalid() {
    let _harness = device_or_skip!();
    let adapter_num = nri_vk::enumerate_adapters().unwrap().len();
    let desc = DeviceCreationDesc::new()
        .with_validation(false)
        .with_adapter_index(adapter_num);
    let err = nri_vk::create_device(&desc).unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidArgument);
}

#[test]
#[ignore = "Requires GPU hardware"]
fn queues_beyond_the_requested_number_are_invalid() {
    let harness = device_or_skip!();
    let device = harness.device();
    let queue = device.get_queue(QueueType::Graphics, 0).unwrap();
    assert_eq!(queue.queue_type(), QueueType::Graphics);

    let available = device.get_device_desc().queues(QueueType::Graphics);
    let err = device.get_queue(QueueType::Graphics, available).unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidArgument);
}

#[test]
#[ignore = "Requires GPU hardware"]
fn common_formats_are_supported() {
    let harness = device_or_skip!();
    let device = harness.device();

    let rgba8 = device.get_format_support(Format::Rgba8Unorm);
    assert!(rgba8.contains(FormatSupportBits::TEXTURE | FormatSupportBits::COLOR_ATTACHMENT));
    assert!(device
        .get_format_support(Format::D32Sfloat)
        .contains(FormatSupportBits::DEPTH_STENCIL_ATTACHMENT));
    assert!(device.get_format_support(Format::Unknown).is_empty());
}
