//! Device creation configuration.

use tracing::{debug, warn};

use crate::descriptor::SpirvBindingOffsets;
use crate::device::{GraphicsApi, QueueType};

/// Overrides validation when set to `0` or `1`.
pub const ENV_VALIDATION: &str = "NRI_VALIDATION";
/// Selects an adapter by index.
pub const ENV_ADAPTER: &str = "NRI_ADAPTER";

/// How many queues of a type to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueueFamilyDesc {
    pub queue_type: QueueType,
    pub queue_num: u32,
}

/// Parameters of `create_device`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceCreationDesc {
    pub graphics_api: GraphicsApi,
    /// Index into the sorted adapter list; `None` picks the best adapter.
    pub adapter_index: Option<usize>,
    pub enable_validation: bool,
    /// Empty means one queue of every type.
    pub queue_families: Vec<QueueFamilyDesc>,
    pub spirv_binding_offsets: SpirvBindingOffsets,
    pub vk_instance_extensions: Vec<String>,
    pub vk_device_extensions: Vec<String>,
    pub disable_ray_tracing: bool,
    pub disable_mesh_shader: bool,
    pub app_name: String,
}

impl Default for DeviceCreationDesc {
    fn default() -> Self {
        Self {
            graphics_api: GraphicsApi::Vk,
            adapter_index: None,
            enable_validation: cfg!(debug_assertions),
            queue_families: Vec::new(),
            spirv_binding_offsets: SpirvBindingOffsets::default(),
            vk_instance_extensions: Vec::new(),
            vk_device_extensions: Vec::new(),
            disable_ray_tracing: false,
            disable_mesh_shader: false,
            app_name: "NRI".to_string(),
        }
    }
}

impl DeviceCreationDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graphics_api(mut self, api: GraphicsApi) -> Self {
        self.graphics_api = api;
        self
    }

    pub fn with_adapter_index(mut self, index: usize) -> Self {
        self.adapter_index = Some(index);
        self
    }

    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = enabled;
        self
    }

    pub fn with_queue_family(mut self, queue_type: QueueType, queue_num: u32) -> Self {
        self.queue_families
            .retain(|family| family.queue_type != queue_type);
        self.queue_families.push(QueueFamilyDesc {
            queue_type,
            queue_num,
        });
        self
    }

    pub fn with_spirv_binding_offsets(mut self, offsets: SpirvBindingOffsets) -> Self {
        self.spirv_binding_offsets = offsets;
        self
    }

    pub fn with_instance_extension(mut self, name: impl Into<String>) -> Self {
        self.vk_instance_extensions.push(name.into());
        self
    }

    pub fn with_device_extension(mut self, name: impl Into<String>) -> Self {
        self.vk_device_extensions.push(name.into());
        self
    }

    pub fn without_ray_tracing(mut self) -> Self {
        self.disable_ray_tracing = true;
        self
    }

    pub fn without_mesh_shader(mut self) -> Self {
        self.disable_mesh_shader = true;
        self
    }

    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Requested queue count for a type.
    pub fn queue_num(&self, queue_type: QueueType) -> u32 {
        if self.queue_families.is_empty() {
            return 1;
        }
        self.queue_families
            .iter()
            .find(|family| family.queue_type == queue_type)
            .map_or(0, |family| family.queue_num)
    }

    /// Apply `NRI_VALIDATION` and `NRI_ADAPTER` from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_overrides(
            std::env::var(ENV_VALIDATION).ok().as_deref(),
            std::env::var(ENV_ADAPTER).ok().as_deref(),
        )
    }

    fn apply_overrides(mut self, validation: Option<&str>, adapter: Option<&str>) -> Self {
        match validation {
            Some("0") => self.enable_validation = false,
            Some("1") => self.enable_validation = true,
            Some(other) => warn!("Ignoring {}={:?}, expected 0 or 1", ENV_VALIDATION, other),
            None => {}
        }
        if let Some(value) = adapter {
            match value.parse() {
                Ok(index) => {
                    debug!("Adapter {} selected through {}", index, ENV_ADAPTER);
                    self.adapter_index = Some(index);
                }
                Err(_) => warn!("Ignoring {}={:?}, expected an index", ENV_ADAPTER, value),
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_queue_requests() {
        let desc = DeviceCreationDesc::default();
        for queue_type in QueueType::ALL {
            assert_eq!(desc.queue_num(queue_type), 1);
        }

        let desc = desc.with_queue_family(QueueType::Graphics, 2);
        assert_eq!(desc.queue_num(QueueType::Graphics), 2);
        assert_eq!(desc.queue_num(QueueType::Copy), 0);
    }

    #[test]
    fn queue_family_replaces_previous_request() {
        let desc = DeviceCreationDesc::new()
            .with_queue_family(QueueType::Compute, 1)
            .with_queue_family(QueueType::Compute, 3);
        assert_eq!(desc.queue_families.len(), 1);
        assert_eq!(desc.queue_num(QueueType::Compute), 3);
    }

    #[test]
    fn env_overrides() {
        let desc = DeviceCreationDesc::new()
            .with_validation(false)
            .apply_overrides(Some("1"), Some("2"));
        assert!(desc.enable_validation);
        assert_eq!(desc.adapter_index, Some(2));

        let desc = desc.apply_overrides(Some("yes"), Some("first"));
        assert!(desc.enable_validation);
        assert_eq!(desc.adapter_index, Some(2));
    }
}
