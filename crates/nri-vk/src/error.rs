//! `vk::Result` translation.

use ash::vk;
use nri_core::Error;

/// Map a native result onto the NRI error categories.
pub fn translate_vk_result(result: vk::Result, context: &str) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY
        | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY
        | vk::Result::ERROR_OUT_OF_POOL_MEMORY
        | vk::Result::ERROR_FRAGMENTED_POOL
        | vk::Result::ERROR_TOO_MANY_OBJECTS => Error::OutOfMemory(format!("{context}: {result}")),
        vk::Result::ERROR_DEVICE_LOST => Error::DeviceLost,
        vk::Result::ERROR_OUT_OF_DATE_KHR | vk::Result::ERROR_SURFACE_LOST_KHR => Error::OutOfDate,
        vk::Result::ERROR_FEATURE_NOT_PRESENT
        | vk::Result::ERROR_EXTENSION_NOT_PRESENT
        | vk::Result::ERROR_LAYER_NOT_PRESENT
        | vk::Result::ERROR_FORMAT_NOT_SUPPORTED
        | vk::Result::ERROR_INCOMPATIBLE_DRIVER => {
            Error::Unsupported(format!("{context}: {result}"))
        }
        _ => Error::Failure(format!("{context}: {result}")),
    }
}

/// Converts native results into NRI errors, logging the failure.
pub trait VkResultExt<T> {
    fn or_nri(self, context: &str) -> nri_core::Result<T>;
}

impl<T> VkResultExt<T> for ash::prelude::VkResult<T> {
    fn or_nri(self, context: &str) -> nri_core::Result<T> {
        self.map_err(|result| {
            tracing::error!("{} failed: {}", context, result);
            translate_vk_result(result, context)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nri_core::ResultCode;

    #[test]
    fn result_categories() {
        let code = |r| translate_vk_result(r, "test").code();
        assert_eq!(code(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY), ResultCode::OutOfMemory);
        assert_eq!(code(vk::Result::ERROR_FRAGMENTED_POOL), ResultCode::OutOfMemory);
        assert_eq!(code(vk::Result::ERROR_DEVICE_LOST), ResultCode::DeviceLost);
        assert_eq!(code(vk::Result::ERROR_OUT_OF_DATE_KHR), ResultCode::OutOfDate);
        assert_eq!(code(vk::Result::ERROR_SURFACE_LOST_KHR), ResultCode::OutOfDate);
        assert_eq!(code(vk::Result::ERROR_LAYER_NOT_PRESENT), ResultCode::Unsupported);
        assert_eq!(code(vk::Result::ERROR_INCOMPATIBLE_DRIVER), ResultCode::Unsupported);
        assert_eq!(code(vk::Result::ERROR_INITIALIZATION_FAILED), ResultCode::Failure);
        assert_eq!(code(vk::Result::ERROR_UNKNOWN), ResultCode::Failure);
    }

    #[test]
    fn context_is_kept() {
        let err: nri_core::Result<()> =
            Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY).or_nri("vkCreateBuffer");
        match err {
            Err(Error::OutOfMemory(msg)) => assert!(msg.starts_with("vkCreateBuffer")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
