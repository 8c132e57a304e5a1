use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};

use market_core::OrderId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::IdentityContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(place_order))
        .route("/:id", delete(delete_order))
}

/// The request body is optional; guests may pass `session_id` in it.
pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    body: Option<Json<dto::PlaceOrderRequest>>,
) -> axum::response::Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let buyer = match ctx.with_body_session(body.session_id.as_deref()) {
        Ok(identity) => identity,
        Err(e) => return errors::market_error_to_response(e.into()),
    };

    match services.place_order(&buyer).await {
        Ok(order) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "success": true,
                "message": "Order placed successfully",
                "order_id": order.id.to_string(),
                "total": order.total.to_f64(),
            })),
        )
            .into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
) -> axum::response::Response {
    let viewer = match ctx.scoped_identity() {
        Ok(identity) => identity,
        Err(e) => return errors::market_error_to_response(e.into()),
    };

    match services.orders(&viewer).await {
        Ok(orders) => Json(orders.iter().map(dto::order_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_order(ctx.identity(), id).await {
        Ok(()) => Json(serde_json::json!({
            "success": true,
            "message": "Order deleted successfully",
        }))
        .into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}
