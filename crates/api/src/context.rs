use market_auth::Identity;
use market_core::{DomainError, SessionToken};

/// Caller identity for a request, resolved by the identity middleware.
///
/// Present on every route. A guest session token that failed to parse is kept
/// here and only reported by routes that need a cart scope, so catalog reads
/// still work for that caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    identity: Identity,
    session_error: Option<DomainError>,
}

impl IdentityContext {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            session_error: None,
        }
    }

    /// A guest whose session token was rejected with `err`.
    pub fn rejected_session(err: DomainError) -> Self {
        Self {
            identity: Identity::anonymous(),
            session_error: Some(err),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Identity for a read of the caller's cart or orders.
    pub fn scoped_identity(&self) -> Result<Identity, DomainError> {
        match &self.session_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.identity.clone()),
        }
    }

    /// Identity for a mutating call whose JSON body may carry `session_id`.
    ///
    /// The body only fills in a guest token that the header and query string
    /// did not provide.
    pub fn with_body_session(&self, session_id: Option<&str>) -> Result<Identity, DomainError> {
        let identity = self.scoped_identity()?;
        let body_token = session_id.map(str::trim).filter(|s| !s.is_empty());
        match (&identity, body_token) {
            (Identity::Guest { session: None }, Some(raw)) => {
                Ok(Identity::guest(Some(SessionToken::parse(raw)?)))
            }
            _ => Ok(identity),
        }
    }
}
