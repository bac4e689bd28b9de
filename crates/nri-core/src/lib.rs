//! Backend-agnostic core of the NRI rendering interface.
//!
//! This crate provides:
//! - Plain descriptions of devices, resources, descriptors, pipelines and barriers
//! - The format table
//! - The [`Backend`] trait and the interface traits backends implement
//! - Helpers built on top of the core interface

pub mod barrier;
pub mod command;
pub mod config;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod format;
pub mod helper;
pub mod interface;
pub mod memory;
pub mod pipeline;
pub mod query;
pub mod ray_tracing;
pub mod resource;
pub mod swap_chain;

pub use barrier::*;
pub use command::*;
pub use config::{DeviceCreationDesc, QueueFamilyDesc};
pub use descriptor::*;
pub use device::*;
pub use error::{result_code, Error, Result, ResultCode};
pub use format::{get_format_props, Format, FormatFlags, FormatProps, FormatSupportBits};
pub use helper::{
    BufferUploadDesc, HelperInterface, ResourceGroupDesc, TextureSubresourceLayout,
    TextureSubresourceUploadDesc, TextureUploadDesc,
};
pub use interface::*;
pub use memory::*;
pub use pipeline::*;
pub use query::*;
pub use ray_tracing::*;
pub use resource::*;
pub use swap_chain::*;

/// Interface version implemented by this crate.
pub const NRI_VERSION_MAJOR: u16 = 1;
pub const NRI_VERSION_MINOR: u16 = 149;
