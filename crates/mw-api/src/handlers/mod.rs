//! Request handlers

pub mod settings;
pub mod widget;

pub use settings::*;
pub use widget::*;

use crate::error::{ApiError, ApiResult};

/// Widget instance ids are path segments; keep them to a safe alphabet
pub(crate) fn validate_instance(instance: &str) -> ApiResult<()> {
    let valid = !instance.is_empty()
        && instance.len() <= 64
        && instance
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Invalid widget instance id: {:?}",
            instance
        )))
    }
}
