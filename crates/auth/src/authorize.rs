use serde::Serialize;
use thiserror::Error;

use stockyard_core::UserId;

use crate::permissions::permissions_for;
use crate::{Permission, Role};

/// A fully resolved principal for authorization decisions.
///
/// Resolved once per request from verified token claims and passed
/// explicitly to every service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn permissions(&self) -> Vec<Permission> {
        permissions_for(self.role)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Check that `principal` holds `required`.
///
/// - No IO
/// - No panics
/// - Independent of the target resource, so a denial never reveals
///   whether that resource exists
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions()
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
