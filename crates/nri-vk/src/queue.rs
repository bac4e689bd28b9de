//! Queue family selection and submission.

use std::fmt;
use std::sync::Arc;

use ash::vk;
use nri_core::{FenceSubmitDesc, QueueInterface, QueueSubmitDesc, QueueType, Result, StageBits};
use parking_lot::Mutex;

use crate::conversions::stages_to_vk;
use crate::device::DeviceShared;
use crate::error::VkResultExt;
use crate::Vulkan;

/// Family index per `QueueType`.
///
/// Graphics takes the first graphics family. Compute prefers a family without
/// graphics, copy one without graphics or compute; both fall back to the next
/// capable family.
pub(crate) fn select_queue_families(flags: &[vk::QueueFlags]) -> [Option<u32>; QueueType::COUNT] {
    use vk::QueueFlags as F;

    fn first(flags: &[F], pred: impl Fn(F) -> bool) -> Option<u32> {
        flags.iter().position(|f| pred(*f)).map(|i| i as u32)
    }

    let graphics = first(flags, |f| f.contains(F::GRAPHICS));
    let compute = first(flags, |f| f.contains(F::COMPUTE) && !f.contains(F::GRAPHICS))
        .or_else(|| first(flags, |f| f.contains(F::COMPUTE)));
    let copy = first(flags, |f| {
        f.contains(F::TRANSFER) && !f.intersects(F::GRAPHICS | F::COMPUTE)
    })
    .or_else(|| first(flags, |f| f.contains(F::COMPUTE) && !f.contains(F::GRAPHICS)))
    .or(graphics);

    [graphics, compute, copy]
}

/// Native queues to create and where each NRI queue maps to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct QueuePlan {
    /// `(family, index)` per queue, indexed by `QueueType as usize`.
    pub queues: [Vec<(u32, u32)>; QueueType::COUNT],
    /// Native queue count per family.
    pub family_counts: Vec<u32>,
}

impl QueuePlan {
    pub fn queue_num(&self) -> [u32; QueueType::COUNT] {
        std::array::from_fn(|i| self.queues[i].len() as u32)
    }
}

/// Plan queue creation. Requests are clamped to the family's queue count;
/// once a family runs out, later queues share native queues round-robin.
pub(crate) fn plan_queues(
    families: &[(vk::QueueFlags, u32)],
    requested: [u32; QueueType::COUNT],
) -> QueuePlan {
    let flags: Vec<_> = families.iter().map(|(flags, _)| *flags).collect();
    let selection = select_queue_families(&flags);

    let mut next = vec![0u32; families.len()];
    let mut plan = QueuePlan {
        family_counts: vec![0; families.len()],
        ..Default::default()
    };

    for queue_type in QueueType::ALL {
        let t = queue_type as usize;
        let Some(family) = selection[t] else { continue };
        let f = family as usize;
        let available = families[f].1;
        if available == 0 {
            continue;
        }
        for _ in 0..requested[t].min(available) {
            plan.queues[t].push((family, next[f] % available));
            next[f] += 1;
            plan.family_counts[f] = next[f].min(available);
        }
    }
    plan
}

/// Wait stages for a fence; an empty mask waits for everything.
fn fence_stages(stages: StageBits) -> vk::PipelineStageFlags2 {
    if stages.is_empty() {
        vk::PipelineStageFlags2::ALL_COMMANDS
    } else {
        stages_to_vk(stages)
    }
}

fn semaphore_infos(fences: &[FenceSubmitDesc<'_, Vulkan>]) -> Vec<vk::SemaphoreSubmitInfo<'static>> {
    fences
        .iter()
        .map(|f| {
            vk::SemaphoreSubmitInfo::default()
                .semaphore(f.fence.handle)
                .value(f.value)
                .stage_mask(fence_stages(f.stages))
        })
        .collect()
}

/// A device queue.
///
/// NRI queues mapped to the same native queue share one lock.
pub struct QueueVk {
    pub(crate) shared: Arc<DeviceShared>,
    pub(crate) handle: vk::Queue,
    pub(crate) family_index: u32,
    pub(crate) queue_type: QueueType,
    pub(crate) lock: Arc<Mutex<()>>,
}

impl fmt::Debug for QueueVk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueVk")
            .field("handle", &self.handle)
            .field("family_index", &self.family_index)
            .field("queue_type", &self.queue_type)
            .finish()
    }
}

impl QueueVk {
    pub fn handle(&self) -> vk::Queue {
        self.handle
    }

    pub fn family_index(&self) -> u32 {
        self.family_index
    }
}

impl QueueInterface<Vulkan> for QueueVk {
    unsafe fn submit(&self, desc: &QueueSubmitDesc<'_, Vulkan>) -> Result<()> {
        let mut waits = semaphore_infos(desc.wait_fences);
        let mut signals = semaphore_infos(desc.signal_fences);

        if let Some(swap_chain) = desc.swap_chain {
            let (acquire, release) = swap_chain.submit_semaphores()?;
            waits.push(
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(acquire)
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS),
            );
            signals.push(
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(release)
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS),
            );
        }

        let command_buffers: Vec<_> = desc
            .command_buffers
            .iter()
            .map(|cb| vk::CommandBufferSubmitInfo::default().command_buffer(cb.handle))
            .collect();

        let submit = vk::SubmitInfo2::default()
            .wait_semaphore_infos(&waits)
            .command_buffer_infos(&command_buffers)
            .signal_semaphore_infos(&signals);

        let _guard = self.lock.lock();
        self.shared
            .device
            .queue_submit2(self.handle, std::slice::from_ref(&submit), vk::Fence::null())
            .or_nri("vkQueueSubmit2")
    }

    fn wait_idle(&self) -> Result<()> {
        let _guard = self.lock.lock();
        unsafe { self.shared.device.queue_wait_idle(self.handle) }.or_nri("vkQueueWaitIdle")
    }

    fn queue_type(&self) -> QueueType {
        self.queue_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vk::QueueFlags as F;

    fn discrete_layout() -> Vec<(F, u32)> {
        vec![
            (F::GRAPHICS | F::COMPUTE | F::TRANSFER, 16),
            (F::TRANSFER, 2),
            (F::COMPUTE | F::TRANSFER, 8),
        ]
    }

    #[test]
    fn dedicated_families_are_preferred() {
        let flags: Vec<_> = discrete_layout().into_iter().map(|(f, _)| f).collect();
        assert_eq!(select_queue_families(&flags), [Some(0), Some(2), Some(1)]);
    }

    #[test]
    fn copy_falls_back_to_async_compute() {
        let flags = [F::GRAPHICS | F::COMPUTE | F::TRANSFER, F::COMPUTE | F::TRANSFER];
        assert_eq!(select_queue_families(&flags), [Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn no_graphics_family() {
        assert_eq!(select_queue_families(&[F::TRANSFER]), [None, None, Some(0)]);
    }

    #[test]
    fn plan_one_queue_each() {
        let plan = plan_queues(&discrete_layout(), [1, 1, 1]);
        assert_eq!(plan.queues[0], vec![(0, 0)]);
        assert_eq!(plan.queues[1], vec![(2, 0)]);
        assert_eq!(plan.queues[2], vec![(1, 0)]);
        assert_eq!(plan.family_counts, vec![1, 1, 1]);
    }

    #[test]
    fn plan_clamps_to_family_size() {
        let plan = plan_queues(&discrete_layout(), [2, 0, 4]);
        assert_eq!(plan.queue_num(), [2, 0, 2]);
        assert_eq!(plan.queues[2], vec![(1, 0), (1, 1)]);
        assert_eq!(plan.family_counts, vec![2, 2, 0]);
    }

    #[test]
    fn single_family_queues_are_shared() {
        let plan = plan_queues(&[(F::GRAPHICS | F::COMPUTE | F::TRANSFER, 1)], [1, 1, 1]);
        assert_eq!(plan.queue_num(), [1, 1, 1]);
        for queues in &plan.queues {
            assert_eq!(queues, &vec![(0, 0)]);
        }
        assert_eq!(plan.family_counts, vec![1]);

        let plan = plan_queues(&[(F::GRAPHICS | F::COMPUTE | F::TRANSFER, 2)], [1, 1, 1]);
        assert_eq!(plan.queues[1], vec![(0, 1)]);
        assert_eq!(plan.queues[2], vec![(0, 0)]);
        assert_eq!(plan.family_counts, vec![2]);
    }
}
