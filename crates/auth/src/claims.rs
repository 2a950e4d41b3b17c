use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockyard_core::UserId;

use crate::{Principal, Role};

/// JWT claims model (transport-agnostic).
///
/// `iat` and `exp` are seconds since the Unix epoch, as registered JWT
/// claims require.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the user id, as a decimal string.
    pub sub: String,

    pub username: String,

    pub role: Role,

    /// Issuer.
    pub iss: String,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("invalid subject '{0}'")]
    InvalidSubject(String),
}

/// Deterministically validate JWT claims against `now` (Unix seconds).
///
/// Signature verification is done by [`crate::Hs256Jwt`]; this checks the
/// time window only.
pub fn validate_claims(claims: &JwtClaims, now: i64) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

impl JwtClaims {
    pub fn principal(&self) -> Result<Principal, TokenValidationError> {
        let user_id: UserId = self
            .sub
            .parse()
            .map_err(|_| TokenValidationError::InvalidSubject(self.sub.clone()))?;
        Ok(Principal {
            user_id,
            username: self.username.clone(),
            role: self.role,
        })
    }
}
