//! Clears a window to a slowly cycling color through an NRI swap chain.
//!
//! Usage: `nri-clear [--vsync] [--validation]`

use std::mem::ManuallyDrop;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use nri_core::{
    AccessBits, AccessLayoutStage, AttachmentsDesc, BarrierGroupDesc, ClearDesc, ClearValue,
    Color, CommandBufferInterface, CoreInterface, DeviceCreationDesc, Error, Features,
    FenceSubmitDesc, Layout, PlaneBits, QueueInterface, QueueSubmitDesc, QueueType, StageBits,
    SwapChainDesc, SwapChainFormat, SwapChainInterface, Texture2DViewDesc, Texture2DViewType,
    TextureBarrierDesc,
};
use nri_vk::{CommandAllocatorVk, CommandBufferVk, DescriptorVk, DeviceVk, FenceVk, SwapChainVk};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

const FRAMES_IN_FLIGHT: u64 = 2;
const SWAP_CHAIN_TEXTURES: u8 = 3;

#[derive(Clone)]
struct ClearConfig {
    title: String,
    width: u32,
    height: u32,
    vsync: bool,
    validation: bool,
}

impl Default for ClearConfig {
    fn default() -> Self {
        Self {
            title: "NRI clear".to_string(),
            width: 1280,
            height: 720,
            vsync: false,
            validation: cfg!(debug_assertions),
        }
    }
}

impl ClearConfig {
    fn from_args() -> Self {
        let mut config = Self::default();
        for arg in std::env::args().skip(1) {
            match arg.as_str() {
                "--vsync" => config.vsync = true,
                "--validation" => config.validation = true,
                other => tracing::warn!("Ignoring unknown argument {other:?}"),
            }
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ClearConfig::from_args();
    info!("{} starting...", config.title);

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = Runner {
        config,
        state: None,
    };
    event_loop.run_app(&mut runner)?;
    Ok(())
}

struct Runner {
    config: ClearConfig,
    state: Option<State>,
}

impl ApplicationHandler for Runner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match State::new(event_loop, &self.config) {
            Ok(state) => self.state = Some(state),
            Err(e) => {
                error!("Failed to initialize: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                self.state = None;
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                if let Some(state) = &mut self.state {
                    let result = state.render_frame().and_then(|presented| {
                        if presented {
                            Ok(())
                        } else {
                            state.recreate_surface()
                        }
                    });
                    if let Err(e) = result {
                        error!("Render error: {e:#}");
                        self.state = None;
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    if let Err(e) = state.recreate_surface() {
                        error!("Resize to {}x{} failed: {e:#}", size.width, size.height);
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

/// Swap chain plus one color attachment view per texture.
struct Surface {
    swap_chain: SwapChainVk,
    views: Vec<DescriptorVk>,
}

struct Frame {
    allocator: CommandAllocatorVk,
    command_buffer: CommandBufferVk,
}

struct State {
    window: Arc<Window>,
    device: DeviceVk,
    vsync: bool,
    surface: Option<Surface>,
    frames: Vec<Frame>,
    fence: ManuallyDrop<FenceVk>,
    /// Frames submitted so far; frame `n` signals `fence` to `n + 1`.
    frame_index: u64,
    start: Instant,
}

impl State {
    fn new(event_loop: &ActiveEventLoop, config: &ClearConfig) -> anyhow::Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(&config.title)
            .with_inner_size(PhysicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let device = nri_vk::create_device(
            &DeviceCreationDesc::new()
                .with_app_name(&config.title)
                .with_validation(config.validation)
                .without_ray_tracing()
                .without_mesh_shader()
                .apply_env(),
        )?;
        if !device.get_device_desc().supports(Features::SWAP_CHAIN) {
            bail!("{} cannot present", device.get_device_desc().adapter_desc.name);
        }

        let queue = device.get_queue(QueueType::Graphics, 0)?;
        let mut frames = Vec::new();
        for _ in 0..FRAMES_IN_FLIGHT {
            let allocator = device.create_command_allocator(queue)?;
            let command_buffer = device.create_command_buffer(&allocator)?;
            frames.push(Frame {
                allocator,
                command_buffer,
            });
        }
        let fence = ManuallyDrop::new(device.create_fence(0)?);

        let mut state = Self {
            window,
            device,
            vsync: config.vsync,
            surface: None,
            frames,
            fence,
            frame_index: 0,
            start: Instant::now(),
        };
        state.recreate_surface()?;
        Ok(state)
    }

    fn clear_color(&self) -> [f32; 4] {
        let t = self.start.elapsed().as_secs_f32();
        let channel = |phase: f32| 0.5 + 0.5 * (t + phase).sin();
        [channel(0.0), channel(2.094), channel(4.189), 1.0]
    }

    /// Returns `false` when the swap chain must be recreated.
    fn render_frame(&mut self) -> anyhow::Result<bool> {
        let color = self.clear_color();
        let Some(surface) = self.surface.as_mut() else {
            return Ok(true);
        };

        if self.frame_index >= FRAMES_IN_FLIGHT {
            self.device
                .wait(&self.fence, self.frame_index - FRAMES_IN_FLIGHT + 1)?;
        }
        let image = match self
            .device
            .acquire_next_swap_chain_texture(&mut surface.swap_chain)
        {
            Ok(image) => image as usize,
            Err(Error::OutOfDate) => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let attachment = AccessLayoutStage::new(
            AccessBits::COLOR_ATTACHMENT,
            Layout::ColorAttachment,
            StageBits::COLOR_ATTACHMENT,
        );
        let frame = &mut self.frames[(self.frame_index % FRAMES_IN_FLIGHT) as usize];
        let texture = &self.device.get_swap_chain_textures(&surface.swap_chain)[image];
        unsafe {
            self.device.reset_command_allocator(&frame.allocator)?;
            let cb = &mut frame.command_buffer;
            cb.begin(None)?;
            cb.barrier(&BarrierGroupDesc {
                textures: &[TextureBarrierDesc::new(texture, AccessLayoutStage::UNDEFINED, attachment)],
                ..Default::default()
            });
            cb.begin_rendering(&AttachmentsDesc {
                colors: &[&surface.views[image]],
                ..Default::default()
            })?;
            cb.clear_attachments(
                &[ClearDesc {
                    value: ClearValue::Color(Color::Float(color)),
                    planes: PlaneBits::COLOR,
                    color_attachment_index: 0,
                }],
                &[],
            );
            cb.end_rendering();
            cb.barrier(&BarrierGroupDesc {
                textures: &[TextureBarrierDesc::new(texture, attachment, AccessLayoutStage::PRESENT)],
                ..Default::default()
            });
            cb.end()?;

            self.device.get_queue(QueueType::Graphics, 0)?.submit(&QueueSubmitDesc {
                command_buffers: &[&frame.command_buffer],
                signal_fences: &[FenceSubmitDesc {
                    fence: &self.fence,
                    value: self.frame_index + 1,
                    stages: StageBits::ALL,
                }],
                swap_chain: Some(&surface.swap_chain),
                ..Default::default()
            })?;
        }
        self.frame_index += 1;

        match self.device.queue_present(&mut surface.swap_chain) {
            Ok(()) => Ok(true),
            Err(Error::OutOfDate) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn destroy_surface(&mut self) {
        if let Some(surface) = self.surface.take() {
            unsafe {
                for view in surface.views {
                    self.device.destroy_descriptor(view);
                }
                self.device.destroy_swap_chain(surface.swap_chain);
            }
        }
    }

    /// Replace the swap chain with one matching the window; none while minimized.
    fn recreate_surface(&mut self) -> anyhow::Result<()> {
        self.device.wait_idle()?;
        self.destroy_surface();

        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        let queue = self.device.get_queue(QueueType::Graphics, 0)?;
        let swap_chain = self.device.create_swap_chain(&SwapChainDesc {
            window: nri_core::Window {
                display: self.window.display_handle()?.as_raw(),
                window: self.window.window_handle()?.as_raw(),
            },
            queue,
            width: size.width,
            height: size.height,
            texture_num: SWAP_CHAIN_TEXTURES,
            format: SwapChainFormat::Bt709G22_8bit,
            vertical_sync_interval: u8::from(self.vsync),
            waitable: false,
            allow_low_latency: false,
        })?;

        let views = match create_views(&self.device, &swap_chain) {
            Ok(views) => views,
            Err(e) => {
                unsafe { self.device.destroy_swap_chain(swap_chain) };
                return Err(e.into());
            }
        };
        info!(
            "Swap chain: {}x{}, {} textures",
            size.width,
            size.height,
            views.len()
        );
        self.surface = Some(Surface { swap_chain, views });
        Ok(())
    }
}

fn create_views(device: &DeviceVk, swap_chain: &SwapChainVk) -> nri_core::Result<Vec<DescriptorVk>> {
    let mut views = Vec::new();
    for texture in device.get_swap_chain_textures(swap_chain) {
        let format = device.get_texture_desc(texture).format;
        let view = device.create_texture_2d_view(&Texture2DViewDesc::new(
            texture,
            Texture2DViewType::ColorAttachment,
            format,
        ));
        match view {
            Ok(view) => views.push(view),
            Err(e) => {
                for view in views {
                    unsafe { device.destroy_descriptor(view) };
                }
                return Err(e);
            }
        }
    }
    Ok(views)
}

impl Drop for State {
    fn drop(&mut self) {
        let seconds = self.start.elapsed().as_secs_f64();
        if self.frame_index > 0 && seconds > 0.0 {
            info!(
                "{} frames, {:.1} FPS average",
                self.frame_index,
                self.frame_index as f64 / seconds
            );
        }
        if let Err(e) = self.device.wait_idle() {
            error!("Failed to wait idle: {e}");
        }
        self.destroy_surface();
        unsafe {
            for frame in self.frames.drain(..) {
                self.device.destroy_command_buffer(frame.command_buffer);
                self.device.destroy_command_allocator(frame.allocator);
            }
            self.device.destroy_fence(ManuallyDrop::take(&mut self.fence));
        }
    }
}
