//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage selection and the marketplace service
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use market_auth::{Hs256JwtValidator, JwtValidator};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(jwt_secret: String, services: services::AppServices) -> Router {
    let jwt: Arc<dyn JwtValidator> = Arc::new(Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Every marketplace route sees an identity; guests are allowed through.
    let api = routes::router().layer(
        ServiceBuilder::new()
            .layer(Extension(Arc::new(services)))
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::identity_middleware,
            )),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(api)
}
