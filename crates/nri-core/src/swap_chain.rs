//! Swap chain descriptions.

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::interface::Backend;

/// Presentation color space and encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SwapChainFormat {
    /// BT.709 primaries, linear, FP16.
    Bt709G10_16bit,
    /// BT.709 primaries, sRGB curve, 8 bits per channel.
    #[default]
    Bt709G22_8bit,
    /// BT.709 primaries, sRGB curve, 10 bits per channel.
    Bt709G22_10bit,
    /// BT.2020 primaries, PQ curve, 10 bits per channel (HDR10).
    Bt2020G2084_10bit,
}

/// Native window to present into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
}

pub struct SwapChainDesc<'a, B: Backend> {
    pub window: Window,
    /// Queue that presents; must support presentation to the window's surface.
    pub queue: &'a B::Queue,
    pub width: u32,
    pub height: u32,
    pub texture_num: u8,
    pub format: SwapChainFormat,
    /// 0 disables vsync.
    pub vertical_sync_interval: u8,
    pub waitable: bool,
    pub allow_low_latency: bool,
}
