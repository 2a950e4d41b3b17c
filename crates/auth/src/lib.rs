//! `stockyard-auth`: authentication and role-based authorization.
//!
//! Decoupled from HTTP and storage: the API layer resolves a [`Principal`]
//! from a verified token once per request and passes it explicitly to every
//! service call.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, IssuedToken, JwtValidator, TokenError};
pub use password::{PasswordError, hash_password, verify_login, verify_password};
pub use permissions::Permission;
pub use roles::Role;
pub use user::User;
