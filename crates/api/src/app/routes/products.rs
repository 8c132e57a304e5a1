use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use market_core::ProductId;
use market_infra::NewProduct;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::IdentityContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(submit_product))
        .route("/:id", delete(delete_product))
        .route("/:id/approve", post(approve_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
) -> axum::response::Response {
    match services.list_products(ctx.identity()).await {
        Ok(rows) => Json(rows.into_iter().map(dto::listing_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}

pub async fn submit_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    body: Result<Json<dto::SubmitProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match errors::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let input = NewProduct {
        name: body.name,
        price: body.price.map(dto::PriceInput::into_raw),
        image_url: body.img,
    };

    match services.submit_product(ctx.identity(), input).await {
        Ok(product) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "success": true,
                "message": product.submission_message(),
                "product_id": product.id.to_string(),
            })),
        )
            .into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}

pub async fn approve_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.approve_product(ctx.identity(), id).await {
        Ok(_) => Json(serde_json::json!({"success": true, "message": "Product approved."})).into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_product(ctx.identity(), id).await {
        Ok(()) => Json(serde_json::json!({
            "success": true,
            "message": "Product deleted successfully",
        }))
        .into_response(),
        Err(e) => errors::market_error_to_response(e),
    }
}
