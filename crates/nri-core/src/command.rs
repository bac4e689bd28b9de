//! Command recording and submission parameters.

use bytemuck::{Pod, Zeroable};

use crate::barrier::{PlaneBits, StageBits};
use crate::interface::Backend;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub depth_min: f32,
    pub depth_max: f32,
    /// Flip Y so that +Y points up.
    pub origin_bottom_left: bool,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            depth_max: 1.0,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: i16, y: i16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Color {
    Float([f32; 4]),
    Uint([u32; 4]),
    Int([i32; 4]),
}

impl Default for Color {
    fn default() -> Self {
        Self::Float([0.0; 4])
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DepthStencil {
    pub depth: f32,
    pub stencil: u8,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClearValue {
    Color(Color),
    DepthStencil(DepthStencil),
}

impl Default for ClearValue {
    fn default() -> Self {
        Self::Color(Color::default())
    }
}

/// Clear of one attachment inside a rendering scope.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClearDesc {
    pub value: ClearValue,
    /// `COLOR`, `DEPTH` and/or `STENCIL`.
    pub planes: PlaneBits,
    pub color_attachment_index: u32,
}

/// Attachments of a rendering scope.
pub struct AttachmentsDesc<'a, B: Backend> {
    pub colors: &'a [&'a B::Descriptor],
    pub depth_stencil: Option<&'a B::Descriptor>,
    pub shading_rate: Option<&'a B::Descriptor>,
    /// Multiview mask; 0 disables multiview.
    pub view_mask: u32,
}

impl<B: Backend> Default for AttachmentsDesc<'_, B> {
    fn default() -> Self {
        Self {
            colors: &[],
            depth_stencil: None,
            shading_rate: None,
            view_mask: 0,
        }
    }
}

/// Indirect draw arguments; memory layout matches the native command.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawDesc {
    pub vertex_num: u32,
    pub instance_num: u32,
    pub base_vertex: u32,
    pub base_instance: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedDesc {
    pub index_num: u32,
    pub instance_num: u32,
    pub base_index: u32,
    pub base_vertex: i32,
    pub base_instance: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DispatchDesc {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

/// Indirect command buffer parameters.
pub struct IndirectDesc<'a, B: Backend> {
    pub buffer: &'a B::Buffer,
    pub offset: u64,
    pub draw_num: u32,
    pub stride: u32,
    /// Optional GPU-side draw count.
    pub count_buffer: Option<(&'a B::Buffer, u64)>,
}

/// Region of a texture subresource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureRegionDesc {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    /// 0 means "whole mip".
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_offset: u32,
    pub layer_offset: u32,
    pub planes: PlaneBits,
}

/// Layout of texel data in a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureDataLayoutDesc {
    pub offset: u64,
    pub row_pitch: u32,
    pub slice_pitch: u32,
}

/// Fence signal or wait at submission.
pub struct FenceSubmitDesc<'a, B: Backend> {
    pub fence: &'a B::Fence,
    pub value: u64,
    pub stages: StageBits,
}

pub struct QueueSubmitDesc<'a, B: Backend> {
    pub wait_fences: &'a [FenceSubmitDesc<'a, B>],
    pub command_buffers: &'a [&'a B::CommandBuffer],
    pub signal_fences: &'a [FenceSubmitDesc<'a, B>],
    pub swap_chain: Option<&'a B::SwapChain>,
}

impl<B: Backend> Default for QueueSubmitDesc<'_, B> {
    fn default() -> Self {
        Self {
            wait_fences: &[],
            command_buffers: &[],
            signal_fences: &[],
            swap_chain: None,
        }
    }
}
