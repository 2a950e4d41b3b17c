//! API-side authorization guard.
//!
//! Services call this first, before any lookup, so a forbidden caller never
//! learns whether the target exists.

use stockyard_auth::{Permission, Principal, authorize};

use crate::app::errors::ApiError;

/// Check `required` for `principal`, logging denials.
pub fn require(principal: &Principal, required: &Permission) -> Result<(), ApiError> {
    authorize(principal, required).map_err(|e| {
        tracing::warn!(
            user = %principal.username,
            role = %principal.role,
            permission = %required,
            "authorization denied"
        );
        ApiError::from(e)
    })
}
