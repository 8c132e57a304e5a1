use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use market_auth::{Identity, JwtValidator};
use market_core::{DomainError, SessionToken};

use crate::app::errors;
use crate::context::IdentityContext;

/// Header carrying a guest's session token.
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionQuery {
    session_id: Option<String>,
}

/// Resolve the caller and attach an [`IdentityContext`] to the request.
///
/// A bearer token must be valid (401 otherwise). Without one the caller is a
/// guest, identified by the `X-Session-Id` header or the `session_id` query
/// parameter when present. A malformed guest token is recorded on the context
/// and reported by the cart and order routes.
pub async fn identity_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let ctx = match req.headers().get(axum::http::header::AUTHORIZATION) {
        Some(header) => IdentityContext::new(authenticate(&state, header)?),
        None => match guest_session(&req) {
            Ok(session) => IdentityContext::new(Identity::guest(session)),
            Err(e) => {
                debug!(error = %e, "guest session token rejected");
                IdentityContext::rejected_session(e)
            }
        },
    };

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

fn authenticate(state: &AuthState, header: &HeaderValue) -> Result<Identity, Response> {
    let token = extract_bearer(header).ok_or_else(|| {
        errors::json_error(
            StatusCode::UNAUTHORIZED,
            "authentication_required",
            "Malformed authorization header",
        )
    })?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        debug!(error = %e, "bearer token rejected");
        errors::json_error(
            StatusCode::UNAUTHORIZED,
            "authentication_required",
            "Invalid or expired token",
        )
    })?;

    Ok(Identity::Authenticated(claims.into_principal()))
}

fn extract_bearer(header: &HeaderValue) -> Option<&str> {
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

fn guest_session(req: &axum::http::Request<axum::body::Body>) -> Result<Option<SessionToken>, DomainError> {
    let raw = session_header(req.headers()).or_else(|| {
        Query::<SessionQuery>::try_from_uri(req.uri())
            .ok()
            .and_then(|Query(q)| q.session_id)
    });

    match raw.filter(|s| !s.trim().is_empty()) {
        Some(raw) => SessionToken::parse(&raw).map(Some),
        None => Ok(None),
    }
}

fn session_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
