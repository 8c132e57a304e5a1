use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for capability checks.
///
/// Roles are opaque strings issued by the identity provider. The marketplace
/// only interprets two of them: [`Role::ARTISAN`] and [`Role::ADMIN`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// May submit products (which then wait for admin approval).
    pub const ARTISAN: Role = Role(Cow::Borrowed("artisan"));
    /// May approve and delete any product; submissions are auto-approved.
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn artisan() -> Self {
        Self::ARTISAN
    }

    pub fn admin() -> Self {
        Self::ADMIN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
