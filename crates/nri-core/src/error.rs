//! Error types shared by every backend.

use thiserror::Error;

/// Plain result code, for reporting to callers that only understand
/// C-style status values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ResultCode {
    Success,
    Failure,
    InvalidArgument,
    OutOfMemory,
    Unsupported,
    DeviceLost,
    OutOfDate,
}

/// Errors returned by NRI calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Generic failure reported by the native API.
    #[error("failure: {0}")]
    Failure(String),

    /// An argument violated the interface contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Host or device memory exhausted.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Feature, format or extension not supported by the device.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The device has been lost.
    #[error("device lost")]
    DeviceLost,

    /// The swap chain no longer matches the surface.
    #[error("swap chain out of date")]
    OutOfDate,
}

impl Error {
    /// Shorthand for [`Error::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Shorthand for [`Error::Unsupported`].
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Shorthand for [`Error::Failure`].
    pub fn failure(msg: impl Into<String>) -> Self {
        Self::Failure(msg.into())
    }

    /// The result code for this error.
    pub const fn code(&self) -> ResultCode {
        match self {
            Self::Failure(_) => ResultCode::Failure,
            Self::InvalidArgument(_) => ResultCode::InvalidArgument,
            Self::OutOfMemory(_) => ResultCode::OutOfMemory,
            Self::Unsupported(_) => ResultCode::Unsupported,
            Self::DeviceLost => ResultCode::DeviceLost,
            Self::OutOfDate => ResultCode::OutOfDate,
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Collapse a result into its code.
pub fn result_code<T>(result: &Result<T>) -> ResultCode {
    match result {
        Ok(_) => ResultCode::Success,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_variants() {
        assert_eq!(Error::invalid("x").code(), ResultCode::InvalidArgument);
        assert_eq!(Error::DeviceLost.code(), ResultCode::DeviceLost);
        assert_eq!(result_code(&Ok::<_, Error>(())), ResultCode::Success);
        assert_eq!(
            result_code::<()>(&Err(Error::OutOfDate)),
            ResultCode::OutOfDate
        );
    }

    #[test]
    fn display_carries_context() {
        let e = Error::unsupported("mesh shaders");
        assert_eq!(e.to_string(), "unsupported: mesh shaders");
    }
}
