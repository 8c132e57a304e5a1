use serde::{Deserialize, Serialize};

use market_core::{SessionToken, UserId};

use crate::Role;

/// Reference to a user as recorded on domain records (owner, approver).
///
/// The username is captured alongside the id so listings can show it without
/// a round-trip to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub username: String,
}

/// A fully resolved authenticated principal.
///
/// Construction is decoupled from storage and transport: the API derives it
/// from verified token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(user_id: UserId, username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            username: username.into(),
            roles,
        }
    }

    pub fn user_ref(&self) -> UserRef {
        UserRef {
            id: self.user_id,
            username: self.username.clone(),
        }
    }
}

/// Who is calling: an authenticated principal or an anonymous guest.
///
/// Guests are identified only by the session token they choose to present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated(Principal),
    Guest { session: Option<SessionToken> },
}

impl Identity {
    pub fn guest(session: Option<SessionToken>) -> Self {
        Identity::Guest { session }
    }

    pub fn anonymous() -> Self {
        Identity::Guest { session: None }
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Identity::Authenticated(p) => Some(p),
            Identity::Guest { .. } => None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.principal().map(|p| p.user_id)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }

    pub fn username(&self) -> Option<&str> {
        self.principal().map(|p| p.username.as_str())
    }
}

impl From<Principal> for Identity {
    fn from(value: Principal) -> Self {
        Identity::Authenticated(value)
    }
}

/// Capability lookup: does the caller hold a role right now?
///
/// Roles are read at call time from whatever the identity provider resolved
/// for the request; nothing is cached on domain records.
pub trait HasRole {
    fn has_role(&self, role: &Role) -> bool;

    fn is_admin(&self) -> bool {
        self.has_role(&Role::ADMIN)
    }

    fn is_artisan(&self) -> bool {
        self.has_role(&Role::ARTISAN)
    }
}

impl HasRole for Principal {
    fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl HasRole for Identity {
    fn has_role(&self, role: &Role) -> bool {
        match self {
            Identity::Authenticated(p) => p.has_role(role),
            Identity::Guest { .. } => false,
        }
    }
}

/// Answer to "who am I?" as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityCheck {
    pub authenticated: bool,
    pub username: Option<String>,
    pub is_artisan: bool,
    pub is_admin: bool,
}

impl Identity {
    pub fn check(&self) -> IdentityCheck {
        IdentityCheck {
            authenticated: self.is_authenticated(),
            username: self.username().map(str::to_string),
            is_artisan: self.is_artisan(),
            is_admin: self.is_admin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guests_hold_no_roles() {
        let guest = Identity::guest(Some(SessionToken::parse("abc").unwrap()));
        assert!(!guest.is_admin());
        assert!(!guest.is_artisan());
        assert!(!guest.is_authenticated());
        assert_eq!(guest.user_id(), None);
    }

    #[test]
    fn principal_roles_are_matched_by_name() {
        let p = Principal::new(UserId::new(), "meera", vec![Role::new("artisan")]);
        assert!(p.is_artisan());
        assert!(!p.is_admin());

        let id = Identity::from(p.clone());
        assert!(id.is_artisan());
        assert_eq!(id.username(), Some("meera"));
        assert_eq!(id.principal().unwrap().user_ref().id, p.user_id);
    }

    #[test]
    fn check_reports_flags() {
        let admin: Identity = Principal::new(UserId::new(), "root", vec![Role::admin()]).into();
        assert_eq!(
            admin.check(),
            IdentityCheck {
                authenticated: true,
                username: Some("root".to_string()),
                is_artisan: false,
                is_admin: true,
            }
        );

        let guest = Identity::anonymous().check();
        assert!(!guest.authenticated);
        assert_eq!(guest.username, None);
    }
}
