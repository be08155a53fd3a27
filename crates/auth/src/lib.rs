//! `civicdesk-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: the gate is a
//! pure function of (role, operation), and the credential/assertion
//! primitives only transform values.

pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod operation;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{allowed_roles, authorize, is_allowed, AuthzError};
pub use claims::{validate_claims, AssertionClaims, TokenValidationError};
pub use credentials::{Argon2Hasher, CredentialError, CredentialHasher};
pub use operation::Operation;
pub use principal::Principal;
pub use roles::Role;
pub use token::{Hs256Jwt, JwtIssuer, JwtValidator, TokenIssueError};
