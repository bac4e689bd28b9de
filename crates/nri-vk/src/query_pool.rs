//! Query pools.

use ash::vk;
use nri_core::{Error, Features, QueryPoolDesc, QueryType, Result};
use tracing::debug;

use crate::conversions::query_type_to_vk;
use crate::device::DeviceVk;
use crate::error::VkResultExt;

#[derive(Debug)]
pub struct QueryPoolVk {
    pub(crate) handle: vk::QueryPool,
    pub(crate) query_type: QueryType,
    pub(crate) capacity: u32,
}

impl QueryPoolVk {
    pub fn handle(&self) -> vk::QueryPool {
        self.handle
    }

    pub(crate) fn is_timestamp(&self) -> bool {
        matches!(
            self.query_type,
            QueryType::Timestamp | QueryType::TimestampCopyQueue
        )
    }

    pub(crate) fn is_acceleration_structure(&self) -> bool {
        matches!(
            self.query_type,
            QueryType::AccelerationStructureSize | QueryType::AccelerationStructureCompactedSize
        )
    }
}

/// Every statistic `PipelineStatisticsDesc` reports, in its field order.
pub(crate) fn pipeline_statistics() -> vk::QueryPipelineStatisticFlags {
    use vk::QueryPipelineStatisticFlags as S;
    S::INPUT_ASSEMBLY_VERTICES
        | S::INPUT_ASSEMBLY_PRIMITIVES
        | S::VERTEX_SHADER_INVOCATIONS
        | S::GEOMETRY_SHADER_INVOCATIONS
        | S::GEOMETRY_SHADER_PRIMITIVES
        | S::CLIPPING_INVOCATIONS
        | S::CLIPPING_PRIMITIVES
        | S::FRAGMENT_SHADER_INVOCATIONS
        | S::TESSELLATION_CONTROL_SHADER_PATCHES
        | S::TESSELLATION_EVALUATION_SHADER_INVOCATIONS
        | S::COMPUTE_SHADER_INVOCATIONS
}

impl DeviceVk {
    pub(crate) fn create_query_pool_impl(&self, desc: &QueryPoolDesc) -> Result<QueryPoolVk> {
        if desc.capacity == 0 {
            return Err(Error::invalid("query pools need a capacity"));
        }
        match desc.query_type {
            QueryType::TimestampCopyQueue => {
                self.require(Features::COPY_QUEUE_TIMESTAMP, "copy queue timestamps")?
            }
            QueryType::AccelerationStructureSize | QueryType::AccelerationStructureCompactedSize => {
                self.require(Features::RAY_TRACING, "acceleration structure queries")?
            }
            _ => {}
        }
        let mut info = vk::QueryPoolCreateInfo::default()
            .query_type(query_type_to_vk(desc.query_type))
            .query_count(desc.capacity);
        if desc.query_type == QueryType::PipelineStatistics {
            info = info.pipeline_statistics(pipeline_statistics());
        }
        let handle = unsafe { self.shared.device.create_query_pool(&info, None) }
            .or_nri("vkCreateQueryPool")?;
        // Host reset so the first use needs no command.
        unsafe { self.shared.device.reset_query_pool(handle, 0, desc.capacity) };
        debug!(
            "Created query pool {:?} ({:?} x{})",
            handle, desc.query_type, desc.capacity
        );
        Ok(QueryPoolVk {
            handle,
            query_type: desc.query_type,
            capacity: desc.capacity,
        })
    }

    pub(crate) unsafe fn reset_queries_impl(&self, pool: &QueryPoolVk, offset: u32, num: u32) {
        let num = num.min(pool.capacity.saturating_sub(offset));
        self.shared.device.reset_query_pool(pool.handle, offset, num);
    }

    pub(crate) unsafe fn destroy_query_pool_impl(&self, pool: QueryPoolVk) {
        self.shared.device.destroy_query_pool(pool.handle, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nri_core::PipelineStatisticsDesc;

    #[test]
    fn statistics_fill_the_result_struct() {
        let fields = std::mem::size_of::<PipelineStatisticsDesc>() / std::mem::size_of::<u64>();
        assert_eq!(pipeline_statistics().as_raw().count_ones() as usize, fields);
        assert_eq!(QueryType::PipelineStatistics.result_size() as usize, fields * 8);
    }

    #[test]
    fn query_classes() {
        let pool = |query_type| QueryPoolVk {
            handle: vk::QueryPool::null(),
            query_type,
            capacity: 4,
        };
        assert!(pool(QueryType::TimestampCopyQueue).is_timestamp());
        assert!(!pool(QueryType::Occlusion).is_timestamp());
        assert!(pool(QueryType::AccelerationStructureCompactedSize).is_acceleration_structure());
    }
}
