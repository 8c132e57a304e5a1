use axum::{Router, routing::get};

pub mod cart;
pub mod orders;
pub mod products;
pub mod system;

/// Router for all marketplace endpoints (guests and users).
pub fn router() -> Router {
    Router::new()
        .route("/auth/check", get(system::check_auth))
        .nest("/products", products::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
}
