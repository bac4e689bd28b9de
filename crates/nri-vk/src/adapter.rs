//! Physical device enumeration and ranking.

use std::ffi::CStr;

use ash::vk;
use nri_core::{AdapterDesc, Architecture, Result, Vendor};

use crate::error::VkResultExt;

/// A Vulkan 1.3 capable physical device.
#[derive(Clone, Debug)]
pub(crate) struct PhysicalAdapter {
    pub handle: vk::PhysicalDevice,
    pub desc: AdapterDesc,
    pub api_version: u32,
    score: u64,
}

/// Discrete GPUs first, then integrated, virtual and the rest; VRAM breaks ties.
pub(crate) fn adapter_score(device_type: vk::PhysicalDeviceType, video_memory_size: u64) -> u64 {
    let class: u64 = match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 3,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 2,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 1,
        _ => 0,
    };
    (class << 48) | (video_memory_size >> 20).min((1 << 48) - 1)
}

fn architecture(device_type: vk::PhysicalDeviceType) -> Architecture {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => Architecture::Descrete,
        vk::PhysicalDeviceType::INTEGRATED_GPU | vk::PhysicalDeviceType::CPU => {
            Architecture::Integrated
        }
        _ => Architecture::Unknown,
    }
}

/// Heap sizes split into device-local and system memory.
fn heap_sizes(memory: &vk::PhysicalDeviceMemoryProperties) -> (u64, u64) {
    memory
        .memory_heaps
        .iter()
        .take(memory.memory_heap_count as usize)
        .fold((0, 0), |(video, system), heap| {
            if heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL) {
                (video + heap.size, system)
            } else {
                (video, system + heap.size)
            }
        })
}

/// # Safety
///
/// `instance` must be valid and `physical_device` one of its devices.
unsafe fn describe(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> PhysicalAdapter {
    let mut id_props = vk::PhysicalDeviceIDProperties::default();
    let mut props2 = vk::PhysicalDeviceProperties2::default().push_next(&mut id_props);
    instance.get_physical_device_properties2(physical_device, &mut props2);
    let props = props2.properties;

    let memory = instance.get_physical_device_memory_properties(physical_device);
    let (video_memory_size, system_memory_size) = heap_sizes(&memory);

    let name = CStr::from_ptr(props.device_name.as_ptr())
        .to_string_lossy()
        .into_owned();
    let luid = if id_props.device_luid_valid == vk::TRUE {
        u64::from_le_bytes(id_props.device_luid)
    } else {
        0
    };

    PhysicalAdapter {
        handle: physical_device,
        desc: AdapterDesc {
            name,
            luid,
            video_memory_size,
            system_memory_size,
            device_id: props.device_id,
            vendor: Vendor::from_vendor_id(props.vendor_id),
            architecture: architecture(props.device_type),
        },
        api_version: props.api_version,
        score: adapter_score(props.device_type, video_memory_size),
    }
}

/// Vulkan 1.3 adapters, best first.
pub(crate) fn enumerate(instance: &ash::Instance) -> Result<Vec<PhysicalAdapter>> {
    let devices =
        unsafe { instance.enumerate_physical_devices() }.or_nri("vkEnumeratePhysicalDevices")?;

    let mut adapters: Vec<_> = devices
        .into_iter()
        .map(|device| unsafe { describe(instance, device) })
        .filter(|adapter| {
            let ok = adapter.api_version >= vk::API_VERSION_1_3;
            if !ok {
                tracing::debug!("Skipping {}: Vulkan 1.3 not supported", adapter.desc.name);
            }
            ok
        })
        .collect();
    adapters.sort_by(|a, b| b.score.cmp(&a.score));
    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GB: u64 = 1 << 30;

    #[test]
    fn discrete_beats_integrated_regardless_of_memory() {
        let discrete = adapter_score(vk::PhysicalDeviceType::DISCRETE_GPU, 2 * GB);
        let integrated = adapter_score(vk::PhysicalDeviceType::INTEGRATED_GPU, 64 * GB);
        let virt = adapter_score(vk::PhysicalDeviceType::VIRTUAL_GPU, 64 * GB);
        let cpu = adapter_score(vk::PhysicalDeviceType::CPU, 64 * GB);
        assert!(discrete > integrated);
        assert!(integrated > virt);
        assert!(virt > cpu);
    }

    #[test]
    fn memory_breaks_ties() {
        assert!(
            adapter_score(vk::PhysicalDeviceType::DISCRETE_GPU, 16 * GB)
                > adapter_score(vk::PhysicalDeviceType::DISCRETE_GPU, 8 * GB)
        );
    }

    #[test]
    fn heaps_are_split() {
        let mut memory = vk::PhysicalDeviceMemoryProperties {
            memory_heap_count: 2,
            ..Default::default()
        };
        memory.memory_heaps[0] = vk::MemoryHeap {
            size: 8 * GB,
            flags: vk::MemoryHeapFlags::DEVICE_LOCAL,
        };
        memory.memory_heaps[1] = vk::MemoryHeap {
            size: 32 * GB,
            flags: vk::MemoryHeapFlags::empty(),
        };
        // Entries past the heap count are ignored.
        memory.memory_heaps[2] = vk::MemoryHeap {
            size: GB,
            flags: vk::MemoryHeapFlags::DEVICE_LOCAL,
        };
        assert_eq!(heap_sizes(&memory), (8 * GB, 32 * GB));
    }

    #[test]
    fn architectures() {
        assert_eq!(
            architecture(vk::PhysicalDeviceType::DISCRETE_GPU),
            Architecture::Descrete
        );
        assert_eq!(
            architecture(vk::PhysicalDeviceType::INTEGRATED_GPU),
            Architecture::Integrated
        );
        assert_eq!(architecture(vk::PhysicalDeviceType::OTHER), Architecture::Unknown);
    }
}
