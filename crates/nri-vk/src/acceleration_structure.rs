//! Acceleration structures and the ray tracing extension.
//!
//! A structure owns a storage buffer sized from the build sizes. Binding memory
//! binds that buffer and then creates the native structure inside it.

use std::sync::OnceLock;

use ash::vk;
use nri_core::{
    AccelerationStructureBits, AccelerationStructureDesc, AccelerationStructureMemoryBindingDesc,
    AccelerationStructureType, BottomLevelGeometry, BottomLevelGeometryDesc, BufferDesc,
    BufferUsageBits, CopyMode, DispatchRaysDesc, Error, Features, IndexType, MemoryDesc,
    MemoryLocation, RayTracingCommands, RayTracingInterface, RayTracingPipelineDesc, Result,
    StridedBufferRegion,
};
use tracing::debug;

use crate::buffer::BufferVk;
use crate::command::CommandBufferVk;
use crate::conversions::{acceleration_structure_flags_to_vk, format_to_vk, geometry_flags_to_vk};
use crate::descriptor::DescriptorVk;
use crate::device::DeviceVk;
use crate::error::VkResultExt;
use crate::pipeline::PipelineVk;
use crate::query_pool::QueryPoolVk;
use crate::Vulkan;

#[derive(Debug)]
pub struct AccelerationStructureVk {
    pub(crate) handle: OnceLock<vk::AccelerationStructureKHR>,
    pub(crate) buffer: BufferVk,
    pub(crate) as_type: vk::AccelerationStructureTypeKHR,
    pub(crate) size: u64,
    pub(crate) build_scratch_size: u64,
    pub(crate) update_scratch_size: u64,
}

impl AccelerationStructureVk {
    /// Native handle; null until memory is bound.
    pub fn handle(&self) -> vk::AccelerationStructureKHR {
        self.handle.get().copied().unwrap_or_default()
    }
}

fn address(buffer: &BufferVk, offset: u64) -> vk::DeviceOrHostAddressConstKHR {
    vk::DeviceOrHostAddressConstKHR {
        device_address: buffer.device_address() + offset,
    }
}

fn as_type_to_vk(as_type: AccelerationStructureType) -> vk::AccelerationStructureTypeKHR {
    match as_type {
        AccelerationStructureType::TopLevel => vk::AccelerationStructureTypeKHR::TOP_LEVEL,
        AccelerationStructureType::BottomLevel => vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL,
    }
}

/// Native geometry; buffers that are not bound yet contribute address 0,
/// which is enough for size queries.
pub(crate) fn geometry_to_vk(
    desc: &BottomLevelGeometryDesc<'_, Vulkan>,
) -> vk::AccelerationStructureGeometryKHR<'static> {
    let flags = geometry_flags_to_vk(desc.flags);
    match &desc.geometry {
        BottomLevelGeometry::Triangles(t) => {
            let mut triangles = vk::AccelerationStructureGeometryTrianglesDataKHR::default()
                .vertex_format(format_to_vk(t.vertex_format))
                .vertex_data(address(t.vertex_buffer, t.vertex_offset))
                .vertex_stride(u64::from(t.vertex_stride))
                .max_vertex(t.vertex_num.saturating_sub(1))
                .index_type(vk::IndexType::NONE_KHR);
            if let Some(index_buffer) = t.index_buffer {
                triangles = triangles
                    .index_type(match t.index_type {
                        IndexType::Uint16 => vk::IndexType::UINT16,
                        IndexType::Uint32 => vk::IndexType::UINT32,
                    })
                    .index_data(address(index_buffer, t.index_offset));
            }
            if let Some(transform) = t.transform_buffer {
                triangles = triangles.transform_data(address(transform, t.transform_offset));
            }
            vk::AccelerationStructureGeometryKHR::default()
                .geometry_type(vk::GeometryTypeKHR::TRIANGLES)
                .flags(flags)
                .geometry(vk::AccelerationStructureGeometryDataKHR { triangles })
        }
        BottomLevelGeometry::Aabbs(a) => {
            let aabbs = vk::AccelerationStructureGeometryAabbsDataKHR::default()
                .data(address(a.buffer, a.offset))
                .stride(u64::from(a.stride));
            vk::AccelerationStructureGeometryKHR::default()
                .geometry_type(vk::GeometryTypeKHR::AABBS)
                .flags(flags)
                .geometry(vk::AccelerationStructureGeometryDataKHR { aabbs })
        }
    }
}

fn instances_geometry(data: vk::DeviceOrHostAddressConstKHR) -> vk::AccelerationStructureGeometryKHR<'static> {
    let instances = vk::AccelerationStructureGeometryInstancesDataKHR::default()
        .array_of_pointers(false)
        .data(data);
    vk::AccelerationStructureGeometryKHR::default()
        .geometry_type(vk::GeometryTypeKHR::INSTANCES)
        .geometry(vk::AccelerationStructureGeometryDataKHR { instances })
}

fn range_info(primitive_count: u32) -> vk::AccelerationStructureBuildRangeInfoKHR {
    vk::AccelerationStructureBuildRangeInfoKHR::default().primitive_count(primitive_count)
}

/// Shader binding table region; absent regions are all zero.
pub(crate) fn strided_region(
    region: Option<&StridedBufferRegion<'_, Vulkan>>,
) -> vk::StridedDeviceAddressRegionKHR {
    region.map_or_else(Default::default, |r| vk::StridedDeviceAddressRegionKHR {
        device_address: r.buffer.device_address() + r.offset,
        stride: r.stride,
        size: r.size,
    })
}

impl DeviceVk {
    fn acceleration_structure_loader(&self) -> Result<&ash::khr::acceleration_structure::Device> {
        self.shared
            .extensions
            .acceleration_structure
            .as_ref()
            .ok_or_else(|| Error::unsupported("VK_KHR_acceleration_structure is not enabled"))
    }
}

impl RayTracingInterface<Vulkan> for DeviceVk {
    fn create_acceleration_structure(
        &self,
        desc: &AccelerationStructureDesc<'_, Vulkan>,
    ) -> Result<AccelerationStructureVk> {
        self.require(Features::RAY_TRACING, "acceleration structures")?;
        let loader = self.acceleration_structure_loader()?;
        let as_type = as_type_to_vk(desc.as_type);
        let flags = acceleration_structure_flags_to_vk(desc.flags);

        let (geometries, primitive_counts): (Vec<_>, Vec<_>) = match desc.as_type {
            AccelerationStructureType::TopLevel => (
                vec![instances_geometry(vk::DeviceOrHostAddressConstKHR { device_address: 0 })],
                vec![desc.instance_num],
            ),
            AccelerationStructureType::BottomLevel => desc
                .geometries
                .iter()
                .map(|g| (geometry_to_vk(g), g.primitive_num()))
                .unzip(),
        };
        let build_info = vk::AccelerationStructureBuildGeometryInfoKHR::default()
            .ty(as_type)
            .flags(flags)
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .geometries(&geometries);
        let mut sizes = vk::AccelerationStructureBuildSizesInfoKHR::default();
        unsafe {
            loader.get_acceleration_structure_build_sizes(
                vk::AccelerationStructureBuildTypeKHR::DEVICE,
                &build_info,
                &primitive_counts,
                &mut sizes,
            )
        };

        let buffer = self.create_buffer_impl(&BufferDesc::new(
            sizes.acceleration_structure_size,
            BufferUsageBits::ACCELERATION_STRUCTURE_STORAGE,
        ))?;
        debug!(
            "Sized {:?} acceleration structure: {} bytes, {} scratch",
            desc.as_type, sizes.acceleration_structure_size, sizes.build_scratch_size
        );
        Ok(AccelerationStructureVk {
            handle: OnceLock::new(),
            buffer,
            as_type,
            size: sizes.acceleration_structure_size,
            build_scratch_size: sizes.build_scratch_size,
            update_scratch_size: sizes.update_scratch_size,
        })
    }

    fn get_acceleration_structure_memory_desc(
        &self,
        acceleration_structure: &AccelerationStructureVk,
        location: MemoryLocation,
    ) -> Result<MemoryDesc> {
        self.buffer_memory_desc(&acceleration_structure.buffer, location)
    }

    fn bind_acceleration_structure_memory(
        &self,
        bindings: &[AccelerationStructureMemoryBindingDesc<'_, Vulkan>],
    ) -> Result<()> {
        let loader = self.acceleration_structure_loader()?;
        for binding in bindings {
            let structure = binding.acceleration_structure;
            if structure.handle.get().is_some() {
                return Err(Error::invalid("acceleration structure memory is already bound"));
            }
            self.bind_buffer_memory_impl(&[nri_core::BufferMemoryBindingDesc {
                buffer: &structure.buffer,
                memory: binding.memory,
                offset: binding.offset,
            }])?;
            let info = vk::AccelerationStructureCreateInfoKHR::default()
                .buffer(structure.buffer.handle)
                .size(structure.size)
                .ty(structure.as_type);
            let handle = unsafe { loader.create_acceleration_structure(&info, None) }
                .or_nri("vkCreateAccelerationStructureKHR")?;
            structure
                .handle
                .set(handle)
                .map_err(|_| Error::invalid("acceleration structure memory is already bound"))?;
        }
        Ok(())
    }

    fn create_acceleration_structure_descriptor(
        &self,
        acceleration_structure: &AccelerationStructureVk,
    ) -> Result<DescriptorVk> {
        match acceleration_structure.handle.get() {
            Some(handle) => Ok(DescriptorVk::AccelerationStructure(*handle)),
            None => Err(Error::invalid("acceleration structure has no memory bound")),
        }
    }

    fn get_acceleration_structure_handle(&self, acceleration_structure: &AccelerationStructureVk) -> u64 {
        let (Ok(loader), Some(handle)) = (
            self.acceleration_structure_loader(),
            acceleration_structure.handle.get(),
        ) else {
            return 0;
        };
        let info = vk::AccelerationStructureDeviceAddressInfoKHR::default()
            .acceleration_structure(*handle);
        unsafe { loader.get_acceleration_structure_device_address(&info) }
    }

    fn get_acceleration_structure_build_scratch_size(
        &self,
        acceleration_structure: &AccelerationStructureVk,
    ) -> u64 {
        acceleration_structure.build_scratch_size
    }

    fn get_acceleration_structure_update_scratch_size(
        &self,
        acceleration_structure: &AccelerationStructureVk,
    ) -> u64 {
        acceleration_structure.update_scratch_size
    }

    fn create_ray_tracing_pipeline(&self, desc: &RayTracingPipelineDesc<'_, Vulkan>) -> Result<PipelineVk> {
        self.create_ray_tracing_pipeline_impl(desc)
    }

    fn write_shader_group_identifiers(
        &self,
        pipeline: &PipelineVk,
        base_group: u32,
        group_num: u32,
        dst: &mut [u8],
    ) -> Result<()> {
        self.write_shader_group_identifiers_impl(pipeline, base_group, group_num, dst)
    }

    unsafe fn destroy_acceleration_structure(&self, acceleration_structure: AccelerationStructureVk) {
        if let (Ok(loader), Some(handle)) = (
            self.acceleration_structure_loader(),
            acceleration_structure.handle.get(),
        ) {
            loader.destroy_acceleration_structure(*handle, None);
        }
        self.destroy_buffer_impl(acceleration_structure.buffer);
    }
}

impl RayTracingCommands<Vulkan> for CommandBufferVk {
    unsafe fn build_top_level_acceleration_structure(
        &mut self,
        instance_num: u32,
        instance_buffer: &BufferVk,
        instance_offset: u64,
        flags: AccelerationStructureBits,
        dst: &AccelerationStructureVk,
        scratch: &BufferVk,
        scratch_offset: u64,
    ) {
        let Some(loader) = &self.shared.extensions.acceleration_structure else {
            return;
        };
        let geometries = [instances_geometry(address(instance_buffer, instance_offset))];
        let info = vk::AccelerationStructureBuildGeometryInfoKHR::default()
            .ty(vk::AccelerationStructureTypeKHR::TOP_LEVEL)
            .flags(acceleration_structure_flags_to_vk(flags))
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .dst_acceleration_structure(dst.handle())
            .geometries(&geometries)
            .scratch_data(vk::DeviceOrHostAddressKHR {
                device_address: scratch.device_address() + scratch_offset,
            });
        let ranges = [range_info(instance_num)];
        loader.cmd_build_acceleration_structures(self.handle, &[info], &[&ranges[..]]);
    }

    unsafe fn build_bottom_level_acceleration_structure(
        &mut self,
        geometries: &[BottomLevelGeometryDesc<'_, Vulkan>],
        flags: AccelerationStructureBits,
        dst: &AccelerationStructureVk,
        scratch: &BufferVk,
        scratch_offset: u64,
    ) {
        let Some(loader) = &self.shared.extensions.acceleration_structure else {
            return;
        };
        let native: Vec<_> = geometries.iter().map(geometry_to_vk).collect();
        let ranges: Vec<_> = geometries.iter().map(|g| range_info(g.primitive_num())).collect();
        let info = vk::AccelerationStructureBuildGeometryInfoKHR::default()
            .ty(vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL)
            .flags(acceleration_structure_flags_to_vk(flags))
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .dst_acceleration_structure(dst.handle())
            .geometries(&native)
            .scratch_data(vk::DeviceOrHostAddressKHR {
                device_address: scratch.device_address() + scratch_offset,
            });
        loader.cmd_build_acceleration_structures(self.handle, &[info], &[&ranges[..]]);
    }

    unsafe fn copy_acceleration_structure(
        &mut self,
        dst: &AccelerationStructureVk,
        src: &AccelerationStructureVk,
        mode: CopyMode,
    ) {
        let Some(loader) = &self.shared.extensions.acceleration_structure else {
            return;
        };
        let info = vk::CopyAccelerationStructureInfoKHR::default()
            .src(src.handle())
            .dst(dst.handle())
            .mode(match mode {
                CopyMode::Clone => vk::CopyAccelerationStructureModeKHR::CLONE,
                CopyMode::Compact => vk::CopyAccelerationStructureModeKHR::COMPACT,
            });
        loader.cmd_copy_acceleration_structure(self.handle, &info);
    }

    unsafe fn write_acceleration_structure_size(
        &mut self,
        acceleration_structures: &[&AccelerationStructureVk],
        query_pool: &QueryPoolVk,
        query_offset: u32,
    ) {
        let Some(loader) = &self.shared.extensions.acceleration_structure else {
            return;
        };
        let handles: Vec<_> = acceleration_structures.iter().map(|a| a.handle()).collect();
        loader.cmd_write_acceleration_structures_properties(
            self.handle,
            &handles,
            crate::conversions::query_type_to_vk(query_pool.query_type),
            query_pool.handle,
            query_offset,
        );
    }

    unsafe fn dispatch_rays(&mut self, desc: &DispatchRaysDesc<'_, Vulkan>) {
        let Some(loader) = &self.shared.extensions.ray_tracing_pipeline else {
            return;
        };
        // The raygen region holds exactly one record.
        let mut raygen = strided_region(Some(&desc.raygen_shader));
        raygen.stride = raygen.size;
        loader.cmd_trace_rays(
            self.handle,
            &raygen,
            &strided_region(desc.miss_shaders.as_ref()),
            &strided_region(desc.hit_shader_groups.as_ref()),
            &strided_region(desc.callable_shaders.as_ref()),
            desc.x,
            desc.y,
            desc.z,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nri_core::{BottomLevelAabbsDesc, BottomLevelGeometryBits, BottomLevelTrianglesDesc, Format};
    use parking_lot::Mutex;

    fn unbound_buffer(size: u64) -> BufferVk {
        BufferVk {
            handle: vk::Buffer::null(),
            desc: BufferDesc::new(size, BufferUsageBits::ACCELERATION_STRUCTURE_BUILD_INPUT),
            binding: OnceLock::new(),
            allocation: Mutex::new(None),
        }
    }

    fn triangles<'a>(
        vertices: &'a BufferVk,
        index_buffer: Option<&'a BufferVk>,
    ) -> BottomLevelTrianglesDesc<'a, Vulkan> {
        BottomLevelTrianglesDesc {
            vertex_buffer: vertices,
            vertex_offset: 0,
            vertex_num: 24,
            vertex_stride: 12,
            vertex_format: Format::Rgb32Sfloat,
            index_buffer,
            index_offset: 0,
            index_num: 36,
            index_type: IndexType::Uint16,
            transform_buffer: None,
            transform_offset: 0,
        }
    }

    #[test]
    fn triangles_translate_with_and_without_indices() {
        let vertices = unbound_buffer(1024);
        let indices = unbound_buffer(256);
        let geometry = BottomLevelGeometryDesc {
            geometry: BottomLevelGeometry::Triangles(triangles(&vertices, None)),
            flags: BottomLevelGeometryBits::OPAQUE_GEOMETRY,
        };
        let native = geometry_to_vk(&geometry);
        assert_eq!(native.geometry_type, vk::GeometryTypeKHR::TRIANGLES);
        assert_eq!(native.flags, vk::GeometryFlagsKHR::OPAQUE);
        let data = unsafe { native.geometry.triangles };
        assert_eq!(data.index_type, vk::IndexType::NONE_KHR);
        assert_eq!(data.max_vertex, 23);
        assert_eq!(data.vertex_format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(geometry.primitive_num(), 8);

        let geometry = BottomLevelGeometryDesc {
            geometry: BottomLevelGeometry::Triangles(triangles(&vertices, Some(&indices))),
            flags: BottomLevelGeometryBits::empty(),
        };
        let data = unsafe { geometry_to_vk(&geometry).geometry.triangles };
        assert_eq!(data.index_type, vk::IndexType::UINT16);
        assert_eq!(geometry.primitive_num(), 12);
    }

    #[test]
    fn aabbs_keep_their_stride() {
        let boxes = unbound_buffer(24 * 10);
        let geometry = BottomLevelGeometryDesc::<Vulkan> {
            geometry: BottomLevelGeometry::Aabbs(BottomLevelAabbsDesc {
                buffer: &boxes,
                offset: 0,
                num: 10,
                stride: 24,
            }),
            flags: BottomLevelGeometryBits::empty(),
        };
        let native = geometry_to_vk(&geometry);
        assert_eq!(native.geometry_type, vk::GeometryTypeKHR::AABBS);
        assert_eq!(unsafe { native.geometry.aabbs }.stride, 24);
    }

    #[test]
    fn missing_regions_are_empty() {
        let region = strided_region(None);
        assert_eq!((region.device_address, region.stride, region.size), (0, 0, 0));
    }
}
