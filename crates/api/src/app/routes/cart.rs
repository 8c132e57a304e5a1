use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use market_core::{CartItemId, ProductId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::IdentityContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_cart))
        .route("/items", post(add_to_cart))
        .route("/items/:id", delete(remove_from_cart))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
) -> axum::response::Response {
    let viewer = match ctx.scoped_identity() {
        Ok(identity) => identity,
        Err(e) => return errors::market_error_to_response(e.into()),
    };

    match services.cart(&viewer).await {
        Ok(cart) => Json(dto::cart_to_json(&cart)).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}

pub async fn add_to_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    body: Result<Json<dto::AddToCartRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match errors::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let Some(raw_id) = body.product_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "Product ID is required");
    };
    let product_id: ProductId = match errors::parse_id(raw_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let buyer = match ctx.with_body_session(body.session_id.as_deref()) {
        Ok(identity) => identity,
        Err(e) => return errors::market_error_to_response(e.into()),
    };

    match services.add_to_cart(&buyer, product_id).await {
        Ok(item) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "success": true,
                "message": "Product added to cart",
                "cart_item_id": item.id.to_string(),
            })),
        )
            .into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}

/// The request body is optional; guests may pass `session_id` in it.
pub async fn remove_from_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::RemoveFromCartRequest>>,
) -> axum::response::Response {
    let id: CartItemId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let actor = match ctx.with_body_session(body.session_id.as_deref()) {
        Ok(identity) => identity,
        Err(e) => return errors::market_error_to_response(e.into()),
    };

    match services.remove_from_cart(&actor, id).await {
        Ok(()) => Json(serde_json::json!({
            "success": true,
            "message": "Item removed from cart",
        }))
        .into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}
