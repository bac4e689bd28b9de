//! Query pools.

use bytemuck::{Pod, Zeroable};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryType {
    Timestamp,
    /// Timestamps written from a copy queue.
    TimestampCopyQueue,
    Occlusion,
    PipelineStatistics,
    AccelerationStructureSize,
    AccelerationStructureCompactedSize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueryPoolDesc {
    pub query_type: QueryType,
    pub capacity: u32,
}

/// Result layout of a `PipelineStatistics` query.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PipelineStatisticsDesc {
    pub input_vertex_num: u64,
    pub input_primitive_num: u64,
    pub vertex_shader_invocation_num: u64,
    pub geometry_shader_invocation_num: u64,
    pub geometry_shader_primitive_num: u64,
    pub rasterizer_in_primitive_num: u64,
    pub rasterizer_out_primitive_num: u64,
    pub fragment_shader_invocation_num: u64,
    pub tess_control_shader_invocation_num: u64,
    pub tess_evaluation_shader_invocation_num: u64,
    pub compute_shader_invocation_num: u64,
}

impl QueryType {
    /// Bytes one query result occupies when copied to a buffer.
    pub const fn result_size(self) -> u32 {
        match self {
            Self::PipelineStatistics => std::mem::size_of::<PipelineStatisticsDesc>() as u32,
            _ => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_sizes() {
        assert_eq!(QueryType::Timestamp.result_size(), 8);
        assert_eq!(QueryType::Occlusion.result_size(), 8);
        assert_eq!(QueryType::PipelineStatistics.result_size(), 88);
    }
}
