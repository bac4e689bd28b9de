//! Logical device creation and the state every object shares.

use std::collections::{HashMap, HashSet};
use std::ffi::{CStr, CString};
use std::fmt;
use std::ptr;
use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use nri_core::{
    DeviceCreationDesc, DeviceDesc, Error, Features, QueueType, Result, SpirvBindingOffsets,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::adapter::PhysicalAdapter;
use crate::error::VkResultExt;
use crate::instance::{names_of, Instance};
use crate::limits::{core_features, fill_device_desc, DeviceProperties};
use crate::queue::{plan_queues, select_queue_families, QueueVk};

/// Optional device extensions, decided before the device exists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ExtensionPlan {
    pub swap_chain: bool,
    pub push_descriptor: bool,
    /// Acceleration structures, ray tracing pipelines and deferred host operations.
    pub ray_tracing: bool,
    pub mesh_shader: bool,
    pub memory_budget: bool,
    pub memory_priority: bool,
    pub portability_subset: bool,
    /// Requested through `DeviceCreationDesc`.
    pub user: Vec<String>,
}

impl ExtensionPlan {
    pub fn new(available: &HashSet<String>, surface: bool, desc: &DeviceCreationDesc) -> Result<Self> {
        let has = |name: &CStr| name.to_str().is_ok_and(|n| available.contains(n));

        for name in &desc.vk_device_extensions {
            if !available.contains(name) {
                return Err(Error::unsupported(format!("device extension {name} not available")));
            }
        }

        let swap_chain = surface && has(ash::khr::swapchain::NAME);
        if surface && !swap_chain {
            warn!("VK_KHR_swapchain not available");
        }
        let ray_tracing = !desc.disable_ray_tracing
            && has(ash::khr::acceleration_structure::NAME)
            && has(ash::khr::ray_tracing_pipeline::NAME)
            && has(ash::khr::deferred_host_operations::NAME);

        Ok(Self {
            swap_chain,
            push_descriptor: has(ash::khr::push_descriptor::NAME),
            ray_tracing,
            mesh_shader: !desc.disable_mesh_shader && has(ash::ext::mesh_shader::NAME),
            memory_budget: has(ash::ext::memory_budget::NAME),
            memory_priority: has(ash::ext::memory_priority::NAME),
            portability_subset: has(ash::khr::portability_subset::NAME),
            user: desc.vk_device_extensions.clone(),
        })
    }

    /// Extension names to enable, without duplicates.
    pub fn names(&self) -> Vec<CString> {
        let mut names: Vec<CString> = Vec::new();
        let mut push = |name: &CStr| {
            if !names.iter().any(|n| n.as_c_str() == name) {
                names.push(name.to_owned());
            }
        };
        if self.swap_chain {
            push(ash::khr::swapchain::NAME);
        }
        if self.push_descriptor {
            push(ash::khr::push_descriptor::NAME);
        }
        if self.ray_tracing {
            push(ash::khr::acceleration_structure::NAME);
            push(ash::khr::ray_tracing_pipeline::NAME);
            push(ash::khr::deferred_host_operations::NAME);
        }
        if self.mesh_shader {
            push(ash::ext::mesh_shader::NAME);
        }
        if self.memory_budget {
            push(ash::ext::memory_budget::NAME);
        }
        if self.memory_priority {
            push(ash::ext::memory_priority::NAME);
        }
        if self.portability_subset {
            push(ash::khr::portability_subset::NAME);
        }
        for name in &self.user {
            if let Ok(name) = CString::new(name.as_str()) {
                push(name.as_c_str());
            }
        }
        names
    }
}

/// Feature structs queried from the adapter and enabled as queried.
#[derive(Default)]
struct FeatureChain {
    core: vk::PhysicalDeviceFeatures,
    vulkan11: vk::PhysicalDeviceVulkan11Features<'static>,
    vulkan12: vk::PhysicalDeviceVulkan12Features<'static>,
    vulkan13: vk::PhysicalDeviceVulkan13Features<'static>,
    acceleration_structure: vk::PhysicalDeviceAccelerationStructureFeaturesKHR<'static>,
    ray_tracing: vk::PhysicalDeviceRayTracingPipelineFeaturesKHR<'static>,
    mesh_shader: vk::PhysicalDeviceMeshShaderFeaturesEXT<'static>,
    memory_priority: vk::PhysicalDeviceMemoryPriorityFeaturesEXT<'static>,
}

impl FeatureChain {
    fn unlink(&mut self) {
        self.vulkan11.p_next = ptr::null_mut();
        self.vulkan12.p_next = ptr::null_mut();
        self.vulkan13.p_next = ptr::null_mut();
        self.acceleration_structure.p_next = ptr::null_mut();
        self.ray_tracing.p_next = ptr::null_mut();
        self.mesh_shader.p_next = ptr::null_mut();
        self.memory_priority.p_next = ptr::null_mut();
    }

    /// Chain the structs the plan needs behind a fresh `PhysicalDeviceFeatures2`.
    fn features2(&mut self, plan: &ExtensionPlan) -> vk::PhysicalDeviceFeatures2<'_> {
        self.unlink();
        let mut features2 = vk::PhysicalDeviceFeatures2::default()
            .features(self.core)
            .push_next(&mut self.vulkan11)
            .push_next(&mut self.vulkan12)
            .push_next(&mut self.vulkan13);
        if plan.ray_tracing {
            features2 = features2
                .push_next(&mut self.acceleration_structure)
                .push_next(&mut self.ray_tracing);
        }
        if plan.mesh_shader {
            features2 = features2.push_next(&mut self.mesh_shader);
        }
        if plan.memory_priority {
            features2 = features2.push_next(&mut self.memory_priority);
        }
        features2
    }

    /// # Safety
    ///
    /// `physical_device` must belong to `instance`.
    unsafe fn query(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        plan: &ExtensionPlan,
    ) -> Self {
        let mut chain = Self::default();
        let core = {
            let mut features2 = chain.features2(plan);
            instance.get_physical_device_features2(physical_device, &mut features2);
            features2.features
        };
        chain.core = core;
        chain.unlink();
        chain
    }

    fn check_required(&self) -> Result<()> {
        let required = [
            (self.vulkan13.dynamic_rendering, "dynamicRendering"),
            (self.vulkan13.synchronization2, "synchronization2"),
            (self.vulkan12.timeline_semaphore, "timelineSemaphore"),
            (self.vulkan12.buffer_device_address, "bufferDeviceAddress"),
            (self.vulkan12.host_query_reset, "hostQueryReset"),
        ];
        match required.iter().find(|(supported, _)| *supported != vk::TRUE) {
            Some((_, name)) => Err(Error::unsupported(format!("required feature {name} missing"))),
            None => Ok(()),
        }
    }

    /// Drop extensions whose main feature bit is missing.
    fn downgrade(&self, plan: &mut ExtensionPlan) {
        if plan.ray_tracing
            && (self.acceleration_structure.acceleration_structure != vk::TRUE
                || self.ray_tracing.ray_tracing_pipeline != vk::TRUE)
        {
            warn!("Ray tracing extensions present but features missing, disabling");
            plan.ray_tracing = false;
        }
        if plan.mesh_shader
            && (self.mesh_shader.mesh_shader != vk::TRUE || self.mesh_shader.task_shader != vk::TRUE)
        {
            warn!("Mesh shader extension present but features missing, disabling");
            plan.mesh_shader = false;
        }
        if plan.memory_priority && self.memory_priority.memory_priority != vk::TRUE {
            plan.memory_priority = false;
        }
    }
}

/// # Safety
///
/// `physical_device` must belong to `instance`.
unsafe fn query_properties(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    plan: &ExtensionPlan,
) -> DeviceProperties {
    let mut vulkan11 = vk::PhysicalDeviceVulkan11Properties::default();
    let mut push_descriptor = vk::PhysicalDevicePushDescriptorPropertiesKHR::default();
    let mut acceleration_structure = vk::PhysicalDeviceAccelerationStructurePropertiesKHR::default();
    let mut ray_tracing = vk::PhysicalDeviceRayTracingPipelinePropertiesKHR::default();
    let mut mesh_shader = vk::PhysicalDeviceMeshShaderPropertiesEXT::default();

    let core = {
        let mut props2 = vk::PhysicalDeviceProperties2::default().push_next(&mut vulkan11);
        if plan.push_descriptor {
            props2 = props2.push_next(&mut push_descriptor);
        }
        if plan.ray_tracing {
            props2 = props2
                .push_next(&mut acceleration_structure)
                .push_next(&mut ray_tracing);
        }
        if plan.mesh_shader {
            props2 = props2.push_next(&mut mesh_shader);
        }
        instance.get_physical_device_properties2(physical_device, &mut props2);
        props2.properties
    };

    vulkan11.p_next = ptr::null_mut();
    push_descriptor.p_next = ptr::null_mut();
    acceleration_structure.p_next = ptr::null_mut();
    ray_tracing.p_next = ptr::null_mut();
    mesh_shader.p_next = ptr::null_mut();

    DeviceProperties {
        core,
        vulkan11,
        push_descriptor: plan.push_descriptor.then_some(push_descriptor),
        acceleration_structure: plan.ray_tracing.then_some(acceleration_structure),
        ray_tracing: plan.ray_tracing.then_some(ray_tracing),
        mesh_shader: plan.mesh_shader.then_some(mesh_shader),
    }
}

/// Size of the heaps backing device-local, host-visible memory types.
pub(crate) fn device_upload_heap_size(memory: &vk::PhysicalDeviceMemoryProperties) -> u64 {
    let upload = vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE;
    let heaps: HashSet<u32> = memory
        .memory_types
        .iter()
        .take(memory.memory_type_count as usize)
        .filter(|t| t.property_flags.contains(upload))
        .map(|t| t.heap_index)
        .collect();
    heaps
        .into_iter()
        .filter_map(|i| memory.memory_heaps.get(i as usize))
        .map(|heap| heap.size)
        .sum()
}

/// Extension loaders of a device.
pub(crate) struct Extensions {
    pub surface: Option<ash::khr::surface::Instance>,
    pub swap_chain: Option<ash::khr::swapchain::Device>,
    pub push_descriptor: Option<ash::khr::push_descriptor::Device>,
    pub acceleration_structure: Option<ash::khr::acceleration_structure::Device>,
    pub ray_tracing_pipeline: Option<ash::khr::ray_tracing_pipeline::Device>,
    pub mesh_shader: Option<ash::ext::mesh_shader::Device>,
    pub debug_utils: Option<ash::ext::debug_utils::Device>,
    pub memory_priority: bool,
}

/// State shared by the device and the objects that record or submit work.
///
/// Dropped last: waits for the GPU, releases allocator memory, destroys the
/// device and finally the instance.
pub(crate) struct DeviceShared {
    pub device: ash::Device,
    pub physical_device: vk::PhysicalDevice,
    pub extensions: Extensions,
    pub memory_type_flags: Vec<vk::MemoryPropertyFlags>,
    pub spirv_binding_offsets: SpirvBindingOffsets,
    pub desc: DeviceDesc,
    /// Family index per `QueueType`.
    pub queue_families: [Option<u32>; QueueType::COUNT],
    pub allocator: Mutex<Option<Allocator>>,
    pub instance: Instance,
}

impl fmt::Debug for DeviceShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceShared")
            .field("device", &self.device.handle())
            .field("physical_device", &self.physical_device)
            .finish_non_exhaustive()
    }
}

impl DeviceShared {
    pub fn allocator_error(e: gpu_allocator::AllocationError) -> Error {
        match &e {
            gpu_allocator::AllocationError::OutOfMemory => Error::OutOfMemory(e.to_string()),
            gpu_allocator::AllocationError::NoCompatibleMemoryTypeFound => {
                Error::unsupported(e.to_string())
            }
            gpu_allocator::AllocationError::InvalidAllocationCreateDesc
            | gpu_allocator::AllocationError::InvalidAllocatorCreateDesc(_) => {
                Error::invalid(e.to_string())
            }
            _ => Error::failure(e.to_string()),
        }
    }

    pub fn set_object_name<H: vk::Handle>(&self, handle: H, name: &str) {
        let Some(debug_utils) = &self.extensions.debug_utils else {
            return;
        };
        let Ok(name) = CString::new(name) else {
            return;
        };
        let info = vk::DebugUtilsObjectNameInfoEXT::default()
            .object_handle(handle)
            .object_name(&name);
        if let Err(e) = unsafe { debug_utils.set_debug_utils_object_name(&info) } {
            debug!("vkSetDebugUtilsObjectNameEXT failed: {}", e);
        }
    }
}

impl Drop for DeviceShared {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            // Frees every block still owned by the allocator.
            drop(self.allocator.lock().take());
            self.device.destroy_device(None);
        }
        debug!("Destroyed Vulkan device");
    }
}

/// A Vulkan device and its queues.
pub struct DeviceVk {
    pub(crate) shared: Arc<DeviceShared>,
    pub(crate) queues: [Vec<QueueVk>; QueueType::COUNT],
}

impl fmt::Debug for DeviceVk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceVk")
            .field("adapter", &self.shared.desc.adapter_desc.name)
            .field("queues", &self.shared.desc.queue_num)
            .finish()
    }
}

impl DeviceVk {
    pub(crate) fn new(
        instance: Instance,
        adapter: PhysicalAdapter,
        desc: &DeviceCreationDesc,
    ) -> Result<Self> {
        let physical_device = adapter.handle;
        let raw = &instance.raw;

        let available = names_of(
            unsafe { raw.enumerate_device_extension_properties(physical_device) }
                .or_nri("vkEnumerateDeviceExtensionProperties")?
                .into_iter()
                .map(|ext| ext.extension_name),
        );
        let mut plan = ExtensionPlan::new(&available, instance.surface, desc)?;

        let mut chain = unsafe { FeatureChain::query(raw, physical_device, &plan) };
        chain.check_required()?;
        chain.downgrade(&mut plan);
        chain.core.robust_buffer_access = vk::FALSE;
        chain.mesh_shader.primitive_fragment_shading_rate_mesh_shader = vk::FALSE;

        let properties = unsafe { query_properties(raw, physical_device, &plan) };

        let family_props = unsafe { raw.get_physical_device_queue_family_properties(physical_device) };
        let families: Vec<_> = family_props
            .iter()
            .map(|f| (f.queue_flags, f.queue_count))
            .collect();
        let requested = QueueType::ALL.map(|t| desc.queue_num(t));
        let queue_plan = plan_queues(&families, requested);
        let queue_num = queue_plan.queue_num();
        if queue_num.iter().all(|&n| n == 0) {
            return Err(Error::unsupported("no usable queue family"));
        }
        for queue_type in QueueType::ALL {
            let t = queue_type as usize;
            if queue_num[t] < requested[t] {
                warn!(
                    "Requested {} {:?} queue(s), created {}",
                    requested[t], queue_type, queue_num[t]
                );
            }
        }
        let queue_families = select_queue_families(
            &families.iter().map(|(flags, _)| *flags).collect::<Vec<_>>(),
        );

        let memory = unsafe { raw.get_physical_device_memory_properties(physical_device) };
        let memory_type_flags: Vec<_> = memory
            .memory_types
            .iter()
            .take(memory.memory_type_count as usize)
            .map(|t| t.property_flags)
            .collect();

        let mut features = core_features(&chain.core, &chain.vulkan12);
        let mut set = |flag: Features, enabled: bool| features.set(flag, enabled);
        set(Features::SWAP_CHAIN, plan.swap_chain);
        set(Features::PUSH_DESCRIPTORS, plan.push_descriptor);
        set(Features::RAY_TRACING, plan.ray_tracing);
        set(Features::MESH_SHADER, plan.mesh_shader);
        set(Features::MEMORY_BUDGET, plan.memory_budget);
        set(
            Features::COPY_QUEUE_TIMESTAMP,
            queue_families[QueueType::Copy as usize]
                .and_then(|f| family_props.get(f as usize))
                .is_some_and(|f| f.timestamp_valid_bits > 0),
        );

        let device_desc = fill_device_desc(
            &properties,
            adapter.desc.clone(),
            features,
            queue_num,
            device_upload_heap_size(&memory),
        );

        let max_queues = queue_plan.family_counts.iter().copied().max().unwrap_or(0) as usize;
        let priorities = vec![1.0f32; max_queues];
        let queue_infos: Vec<_> = queue_plan
            .family_counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(family, &count)| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family as u32)
                    .queue_priorities(&priorities[..count as usize])
            })
            .collect();

        let extension_names = plan.names();
        let extension_ptrs: Vec<_> = extension_names.iter().map(|n| n.as_ptr()).collect();

        let device = {
            let mut features2 = chain.features2(&plan);
            let create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_infos)
                .enabled_extension_names(&extension_ptrs)
                .push_next(&mut features2);
            unsafe { raw.create_device(physical_device, &create_info, None) }
                .or_nri("vkCreateDevice")?
        };
        info!(
            "Created Vulkan device on {} ({} extensions)",
            adapter.desc.name,
            extension_names.len()
        );

        let extensions = Extensions {
            surface: instance
                .surface
                .then(|| ash::khr::surface::Instance::new(&instance.entry, raw)),
            swap_chain: plan
                .swap_chain
                .then(|| ash::khr::swapchain::Device::new(raw, &device)),
            push_descriptor: plan
                .push_descriptor
                .then(|| ash::khr::push_descriptor::Device::new(raw, &device)),
            acceleration_structure: plan
                .ray_tracing
                .then(|| ash::khr::acceleration_structure::Device::new(raw, &device)),
            ray_tracing_pipeline: plan
                .ray_tracing
                .then(|| ash::khr::ray_tracing_pipeline::Device::new(raw, &device)),
            mesh_shader: plan
                .mesh_shader
                .then(|| ash::ext::mesh_shader::Device::new(raw, &device)),
            debug_utils: instance
                .debug_utils
                .then(|| ash::ext::debug_utils::Device::new(raw, &device)),
            memory_priority: plan.memory_priority,
        };

        let allocator_desc = AllocatorCreateDesc {
            instance: raw.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: gpu_allocator::AllocatorDebugSettings {
                log_memory_information: cfg!(debug_assertions),
                log_leaks_on_shutdown: true,
                ..Default::default()
            },
            buffer_device_address: true,
            allocation_sizes: Default::default(),
        };

        // From here on, dropping `shared` releases the device.
        let mut shared = DeviceShared {
            device,
            physical_device,
            extensions,
            memory_type_flags,
            spirv_binding_offsets: desc.spirv_binding_offsets,
            desc: device_desc,
            queue_families,
            allocator: Mutex::new(None),
            instance,
        };
        let allocator = Allocator::new(&allocator_desc).map_err(DeviceShared::allocator_error)?;
        *shared.allocator.get_mut() = Some(allocator);
        let shared = Arc::new(shared);

        let mut locks: HashMap<(u32, u32), Arc<Mutex<()>>> = HashMap::new();
        let queues = std::array::from_fn(|t| {
            queue_plan.queues[t]
                .iter()
                .map(|&(family, index)| QueueVk {
                    shared: Arc::clone(&shared),
                    handle: unsafe { shared.device.get_device_queue(family, index) },
                    family_index: family,
                    queue_type: QueueType::ALL[t],
                    lock: Arc::clone(locks.entry((family, index)).or_default()),
                })
                .collect::<Vec<_>>()
        });
        debug!("Queues: {:?}", queue_num);

        Ok(Self { shared, queues })
    }

    /// The native device.
    pub fn raw_device(&self) -> &ash::Device {
        &self.shared.device
    }

    pub fn raw_instance(&self) -> &ash::Instance {
        &self.shared.instance.raw
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.shared.physical_device
    }

    /// Family index used for a queue type.
    pub fn queue_family(&self, queue_type: QueueType) -> Option<u32> {
        self.shared.queue_families[queue_type as usize]
    }

    /// Wait until the device is idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.shared.device.device_wait_idle() }.or_nri("vkDeviceWaitIdle")
    }

    pub(crate) fn require(&self, feature: Features, what: &str) -> Result<()> {
        if self.shared.desc.features.contains(feature) {
            Ok(())
        } else {
            Err(Error::unsupported(format!("{what} requires {feature:?}")))
        }
    }
}
