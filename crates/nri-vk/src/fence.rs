//! Fences backed by timeline semaphores.

use ash::vk;
use nri_core::Result;

use crate::device::DeviceVk;
use crate::error::VkResultExt;

/// A monotonically increasing GPU/CPU synchronisation counter.
#[derive(Debug)]
pub struct FenceVk {
    pub(crate) handle: vk::Semaphore,
}

impl FenceVk {
    pub fn handle(&self) -> vk::Semaphore {
        self.handle
    }
}

impl DeviceVk {
    pub(crate) fn create_fence_impl(&self, initial_value: u64) -> Result<FenceVk> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);
        let handle = unsafe { self.shared.device.create_semaphore(&info, None) }
            .or_nri("vkCreateSemaphore")?;
        Ok(FenceVk { handle })
    }

    pub(crate) fn fence_value(&self, fence: &FenceVk) -> Result<u64> {
        unsafe { self.shared.device.get_semaphore_counter_value(fence.handle) }
            .or_nri("vkGetSemaphoreCounterValue")
    }

    pub(crate) fn wait_fence(&self, fence: &FenceVk, value: u64) -> Result<()> {
        let semaphores = [fence.handle];
        let values = [value];
        let info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);
        unsafe { self.shared.device.wait_semaphores(&info, u64::MAX) }.or_nri("vkWaitSemaphores")
    }
}
