use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use crate::context::IdentityContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Who the caller is, as seen by the marketplace.
pub async fn check_auth(Extension(ctx): Extension<IdentityContext>) -> impl IntoResponse {
    Json(ctx.identity().check())
}
