//! Lists adapters, then creates a device and prints what it reports.
//!
//! `NRI_ADAPTER` picks the adapter and `NRI_VALIDATION` toggles validation.
//! Pass `--verbose` to dump every limit.

use anyhow::Context;
use nri_core::{CoreInterface, DeviceCreationDesc, Format, QueueType};
use tracing::info;
use tracing_subscriber::EnvFilter;

const LISTED_FORMATS: [Format; 8] = [
    Format::Rgba8Unorm,
    Format::Bgra8Unorm,
    Format::Rgba16Sfloat,
    Format::R32Uint,
    Format::R10G10B10A2Unorm,
    Format::D24UnormS8Uint,
    Format::D32Sfloat,
    Format::Bc7RgbaUnorm,
];

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let verbose = std::env::args().skip(1).any(|arg| arg == "--verbose" || arg == "-v");

    let adapters = nri_vk::enumerate_adapters().context("failed to enumerate adapters")?;
    println!("Adapters:");
    for (index, adapter) in adapters.iter().enumerate() {
        println!("  [{index}] {}", adapter.summary());
    }

    let desc = DeviceCreationDesc::new().with_app_name("nri-info").apply_env();
    let device = nri_vk::create_device(&desc).context("failed to create a device")?;
    let device_desc = device.get_device_desc();
    info!("Device created on {}", device_desc.adapter_desc.name);

    println!();
    println!("Device: {}", device_desc.adapter_desc.summary());
    println!(
        "  API: {:?} {}.{}, NRI {}.{}",
        device_desc.graphics_api,
        device_desc.api_version.0,
        device_desc.api_version.1,
        device_desc.nri_version_major,
        device_desc.nri_version_minor
    );
    println!(
        "  Queues: graphics {}, compute {}, copy {}",
        device_desc.queues(QueueType::Graphics),
        device_desc.queues(QueueType::Compute),
        device_desc.queues(QueueType::Copy)
    );
    println!("  Features: {:?}", device_desc.features);
    println!(
        "  Texture 2D max: {}, buffer max: {} MiB",
        device_desc.texture_2d_max_dim,
        device_desc.buffer_max_size >> 20
    );
    println!(
        "  Timestamp frequency: {} Hz",
        device_desc.timestamp_frequency_hz
    );

    println!();
    println!("Format support:");
    for format in LISTED_FORMATS {
        println!("  {:<24} {:?}", format.name(), device.get_format_support(format));
    }

    if verbose {
        println!();
        println!("{device_desc:#?}");
    }

    Ok(())
}
