use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use market_core::UserId;

use crate::{Principal, Role};

/// Claims carried by a marketplace bearer token.
///
/// Signature checks happen in [`crate::JwtValidator`]; this type only holds
/// what was signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user the token was issued to.
    pub sub: UserId,

    pub username: String,

    /// Role names such as "artisan" or "admin"; absent means none.
    #[serde(default)]
    pub roles: Vec<Role>,

    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl JwtClaims {
    pub fn into_principal(self) -> Principal {
        Principal::new(self.sub, self.username, self.roles)
    }

    fn window_error(&self, now: DateTime<Utc>) -> Option<TokenValidationError> {
        if self.expires_at <= self.issued_at {
            Some(TokenValidationError::InvalidTimeWindow)
        } else if now < self.issued_at {
            Some(TokenValidationError::NotYetValid)
        } else if now >= self.expires_at {
            Some(TokenValidationError::Expired)
        } else {
            None
        }
    }
}

/// Why a bearer token was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token expired")]
    Expired,

    #[error("token issued in the future")]
    NotYetValid,

    #[error("token expires before it was issued")]
    InvalidTimeWindow,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Check that `now` falls inside the token's `[issued_at, expires_at)` window.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    claims.window_error(now).map_or(Ok(()), Err)
}
