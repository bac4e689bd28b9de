//! Vulkan instance creation and the validation message bridge.

use std::collections::HashSet;
use std::ffi::{c_void, CStr, CString};

use ash::vk;
use nri_core::{DeviceCreationDesc, Error, Result};
use tracing::{debug, error, info, trace, warn};

use crate::error::VkResultExt;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Surface extensions for the platforms this crate presents on.
pub fn surface_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::surface::NAME,
        #[cfg(target_os = "windows")]
        ash::khr::win32_surface::NAME,
        #[cfg(all(unix, not(target_os = "macos")))]
        ash::khr::xlib_surface::NAME,
        #[cfg(all(unix, not(target_os = "macos")))]
        ash::khr::xcb_surface::NAME,
        #[cfg(all(unix, not(target_os = "macos")))]
        ash::khr::wayland_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::ext::metal_surface::NAME,
    ]
}

/// Load the Vulkan loader.
pub fn load_entry() -> Result<ash::Entry> {
    // SAFETY: the loader is only used through `ash`, which keeps it alive
    // for the lifetime of the entry.
    unsafe { ash::Entry::load() }
        .map_err(|e| Error::unsupported(format!("Vulkan loader not available: {e}")))
}

pub(crate) fn names_of(
    properties: impl IntoIterator<Item = [std::ffi::c_char; vk::MAX_EXTENSION_NAME_SIZE]>,
) -> HashSet<String> {
    properties
        .into_iter()
        .filter_map(|raw| {
            // SAFETY: Vulkan guarantees NUL-terminated names.
            let name = unsafe { CStr::from_ptr(raw.as_ptr()) };
            name.to_str().ok().map(str::to_owned)
        })
        .collect()
}

/// Forwards debug-utils messages into `tracing`.
struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    handle: vk::DebugUtilsMessengerEXT,
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!(target: "nri_vk::validation", "{:?}: {}", message_type, message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!(target: "nri_vk::validation", "{:?}: {}", message_type, message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        debug!(target: "nri_vk::validation", "{:?}: {}", message_type, message);
    } else {
        trace!(target: "nri_vk::validation", "{:?}: {}", message_type, message);
    }
    vk::FALSE
}

/// Instance plus everything created from it before the device.
///
/// Dropping destroys the debug messenger, then the instance.
pub(crate) struct Instance {
    pub entry: ash::Entry,
    pub raw: ash::Instance,
    messenger: Option<DebugMessenger>,
    pub debug_utils: bool,
    pub surface: bool,
}

impl Instance {
    pub fn new(entry: ash::Entry, desc: &DeviceCreationDesc) -> Result<Self> {
        let api_version = match unsafe { entry.try_enumerate_instance_version() } {
            Ok(Some(version)) => version,
            Ok(None) => vk::API_VERSION_1_0,
            Err(e) => return Err(e).or_nri("vkEnumerateInstanceVersion"),
        };
        if api_version < vk::API_VERSION_1_3 {
            return Err(Error::unsupported(format!(
                "Vulkan 1.3 required, loader reports {}.{}",
                vk::api_version_major(api_version),
                vk::api_version_minor(api_version)
            )));
        }

        let available = names_of(
            unsafe { entry.enumerate_instance_extension_properties(None) }
                .or_nri("vkEnumerateInstanceExtensionProperties")?
                .into_iter()
                .map(|ext| ext.extension_name),
        );
        let has = |name: &CStr| name.to_str().is_ok_and(|n| available.contains(n));

        let mut extensions: Vec<CString> = Vec::new();
        let surface = has(ash::khr::surface::NAME);
        if surface {
            extensions.extend(
                surface_extensions()
                    .into_iter()
                    .filter(|name| has(name))
                    .map(CString::from),
            );
        } else {
            warn!("VK_KHR_surface not available, swap chains are disabled");
        }

        let debug_utils = desc.enable_validation && has(ash::ext::debug_utils::NAME);
        if debug_utils {
            extensions.push(ash::ext::debug_utils::NAME.into());
        }

        #[cfg(target_os = "macos")]
        if has(ash::khr::portability_enumeration::NAME) {
            extensions.push(ash::khr::portability_enumeration::NAME.into());
        }

        for name in &desc.vk_instance_extensions {
            if !available.contains(name) {
                return Err(Error::unsupported(format!(
                    "instance extension {name} not available"
                )));
            }
            let name = CString::new(name.as_str())
                .map_err(|_| Error::invalid("extension name contains NUL"))?;
            if !extensions.contains(&name) {
                extensions.push(name);
            }
        }

        let mut layers: Vec<&CStr> = Vec::new();
        if desc.enable_validation {
            let available_layers = names_of(
                unsafe { entry.enumerate_instance_layer_properties() }
                    .or_nri("vkEnumerateInstanceLayerProperties")?
                    .into_iter()
                    .map(|layer| layer.layer_name),
            );
            if VALIDATION_LAYER
                .to_str()
                .is_ok_and(|n| available_layers.contains(n))
            {
                layers.push(VALIDATION_LAYER);
            } else {
                warn!("Validation layer {:?} not available", VALIDATION_LAYER);
            }
        }

        let app_name = CString::new(desc.app_name.as_str())
            .map_err(|_| Error::invalid("application name contains NUL"))?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"NRI")
            .engine_version(vk::make_api_version(
                0,
                u32::from(nri_core::NRI_VERSION_MAJOR),
                u32::from(nri_core::NRI_VERSION_MINOR),
                0,
            ))
            .api_version(vk::API_VERSION_1_3);

        let extension_ptrs: Vec<_> = extensions.iter().map(|e| e.as_ptr()).collect();
        let layer_ptrs: Vec<_> = layers.iter().map(|l| l.as_ptr()).collect();

        #[cfg(target_os = "macos")]
        let flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        #[cfg(not(target_os = "macos"))]
        let flags = vk::InstanceCreateFlags::empty();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs)
            .flags(flags);

        let raw = unsafe { entry.create_instance(&create_info, None) }.or_nri("vkCreateInstance")?;
        info!(
            "Created Vulkan instance ({} extensions, validation {})",
            extensions.len(),
            if layers.is_empty() { "off" } else { "on" }
        );

        let mut instance = Self {
            entry,
            raw,
            messenger: None,
            debug_utils,
            surface,
        };
        if debug_utils {
            instance.messenger = Some(instance.create_messenger()?);
        }
        Ok(instance)
    }

    fn create_messenger(&self) -> Result<DebugMessenger> {
        let loader = ash::ext::debug_utils::Instance::new(&self.entry, &self.raw);
        let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));
        let handle = unsafe { loader.create_debug_utils_messenger(&info, None) }
            .or_nri("vkCreateDebugUtilsMessengerEXT")?;
        Ok(DebugMessenger { loader, handle })
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            if let Some(messenger) = self.messenger.take() {
                messenger
                    .loader
                    .destroy_debug_utils_messenger(messenger.handle, None);
            }
            self.raw.destroy_instance(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_extension_list_starts_with_surface() {
        let names = surface_extensions();
        assert_eq!(names[0], ash::khr::surface::NAME);
        assert!(names.len() >= 2);
    }

    #[test]
    fn names_are_extracted() {
        let mut raw = [0 as std::ffi::c_char; 256];
        for (dst, src) in raw.iter_mut().zip(b"VK_KHR_swapchain") {
            *dst = *src as std::ffi::c_char;
        }
        let names = names_of([raw]);
        assert!(names.contains("VK_KHR_swapchain"));
        assert_eq!(names.len(), 1);
    }
}
