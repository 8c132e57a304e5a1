//! `market-auth`: identity boundary for the marketplace.
//!
//! Authentication itself (passwords, sessions, token issuance) is an external
//! concern. This crate models what the core needs from it: who is calling,
//! which roles they hold, and how a bearer token is turned into a principal.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod claims;
pub mod identity;
pub mod jwt;
pub mod roles;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use identity::{HasRole, Identity, IdentityCheck, Principal, UserRef};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use roles::Role;
