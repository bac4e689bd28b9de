//! Headless device and submission helpers.
//!
//! Every helper blocks until the GPU is done, so tests read results right
//! after the call returns.

use nri_core::{
    AllocateBufferDesc, BufferDesc, BufferUsageBits, CommandBufferInterface, CoreInterface,
    DeviceCreationDesc, FenceSubmitDesc, MemoryLocation, QueueInterface, QueueSubmitDesc,
    QueueType, StageBits, WHOLE_SIZE,
};
use nri_core::ResourceAllocatorInterface;
use nri_vk::{BufferVk, CommandBufferVk, DeviceVk, QueueVk};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{Result, TestError};

/// Install a test-friendly subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// A device created without a window.
pub struct HeadlessDevice {
    device: DeviceVk,
}

impl HeadlessDevice {
    /// Create a device on the default adapter.
    ///
    /// `NRI_VALIDATION` and `NRI_ADAPTER` apply.
    pub fn new() -> Result<Self> {
        Self::with_desc(
            &DeviceCreationDesc::new()
                .with_app_name("nri-test")
                .with_validation(true)
                .apply_env(),
        )
    }

    pub fn with_desc(desc: &DeviceCreationDesc) -> Result<Self> {
        init_tracing();
        let device = nri_vk::create_device(desc)?;
        info!(
            "Test device: {}",
            device.get_device_desc().adapter_desc.name
        );
        Ok(Self { device })
    }

    /// `None` when the machine has no usable adapter.
    pub fn try_new() -> Option<Self> {
        match Self::new() {
            Ok(device) => Some(device),
            Err(e) => {
                warn!("No test device: {e}");
                None
            }
        }
    }

    pub fn device(&self) -> &DeviceVk {
        &self.device
    }

    pub fn graphics_queue(&self) -> Result<&QueueVk> {
        Ok(self.device.get_queue(QueueType::Graphics, 0)?)
    }

    /// Buffer from the resource allocator.
    pub fn buffer(&self, size: u64, usage: BufferUsageBits, location: MemoryLocation) -> Result<BufferVk> {
        Ok(self.device.allocate_buffer(&AllocateBufferDesc {
            desc: BufferDesc::new(size, usage),
            memory_location: location,
            dedicated: false,
        })?)
    }

    /// Host-visible buffer holding `data`.
    pub fn upload_buffer(&self, data: &[u8], usage: BufferUsageBits) -> Result<BufferVk> {
        let buffer = self.buffer(data.len() as u64, usage, MemoryLocation::HostUpload)?;
        unsafe {
            let ptr = self.device.map_buffer(&buffer, 0, WHOLE_SIZE)?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr(), data.len());
            self.device.unmap_buffer(&buffer);
        }
        Ok(buffer)
    }

    /// Copy of the first `len` bytes of a host-visible buffer.
    pub fn read_buffer(&self, buffer: &BufferVk, len: usize) -> Result<Vec<u8>> {
        if len as u64 > self.device.get_buffer_desc(buffer).size {
            return Err(TestError::Mismatch(format!("read of {len} bytes past the buffer")));
        }
        let mut out = vec![0u8; len];
        unsafe {
            let ptr = self.device.map_buffer(buffer, 0, len as u64)?;
            std::ptr::copy_nonoverlapping(ptr.as_ptr(), out.as_mut_ptr(), len);
            self.device.unmap_buffer(buffer);
        }
        Ok(out)
    }

    /// Record with `record`, submit to the graphics queue and wait.
    pub fn submit<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&mut CommandBufferVk) -> nri_core::Result<()>,
    {
        let device = &self.device;
        let queue = self.graphics_queue()?;
        let allocator = device.create_command_allocator(queue)?;
        let result = (|| -> Result<()> {
            let mut command_buffer = device.create_command_buffer(&allocator)?;
            let fence = device.create_fence(0)?;
            let submitted = unsafe {
                command_buffer
                    .begin(None)
                    .and_then(|()| record(&mut command_buffer))
                    .and_then(|()| command_buffer.end())
                    .and_then(|()| {
                        queue.submit(&QueueSubmitDesc {
                            command_buffers: &[&command_buffer],
                            signal_fences: &[FenceSubmitDesc {
                                fence: &fence,
                                value: 1,
                                stages: StageBits::ALL,
                            }],
                            ..Default::default()
                        })
                    })
                    .and_then(|()| device.wait(&fence, 1))
            };
            if submitted.is_err() {
                let _ = queue.wait_idle();
            }
            unsafe {
                device.destroy_fence(fence);
                device.destroy_command_buffer(command_buffer);
            }
            Ok(submitted?)
        })();
        unsafe { device.destroy_command_allocator(allocator) };
        result
    }
}

impl Drop for HeadlessDevice {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            warn!("wait_idle on test device failed: {e}");
        }
    }
}
