//! Route handlers
//!
//! Handlers validate parameters locally, call the engine or the extension
//! host, and wrap the outcome in an [`Envelope`](super::result::Envelope).
//! Local validation failures never reach the engine.

pub mod extensions;
pub mod system;
pub mod tasks;

use super::error::ApiError;

/// Path ids must be non-empty; absence is an invalid parameter, never "not found"
pub(crate) fn require_id(id: String) -> Result<String, ApiError> {
    if id.is_empty() {
        return Err(ApiError::param("id"));
    }
    Ok(id)
}
