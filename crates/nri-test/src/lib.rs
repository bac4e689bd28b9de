//! Test harness for the NRI rendering interface.
//!
//! Provides a headless device plus helpers for recording, submitting and
//! reading results back. GPU tests skip when no Vulkan 1.3 adapter exists.

pub mod harness;

pub use harness::{init_tracing, HeadlessDevice};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("NRI error: {0}")]
    Nri(#[from] nri_core::Error),
    #[error("Readback mismatch: {0}")]
    Mismatch(String),
}

pub type Result<T> = std::result::Result<T, TestError>;

/// Acquire a headless device or return early from the test.
#[macro_export]
macro_rules! device_or_skip {
    () => {
        match $crate::HeadlessDevice::try_new() {
            Some(device) => device,
            None => {
                eprintln!("skipping: no Vulkan 1.3 device available");
                return;
            }
        }
    };
}
