use core::str::FromStr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use market_core::DomainError;
use market_infra::MarketError;

pub fn market_error_to_response(err: MarketError) -> axum::response::Response {
    let status = match &err {
        MarketError::Validation(_) => StatusCode::BAD_REQUEST,
        MarketError::Permission(_) => StatusCode::FORBIDDEN,
        MarketError::Authentication(_) => StatusCode::UNAUTHORIZED,
        MarketError::NotFound(_) => StatusCode::NOT_FOUND,
        MarketError::Store(e) => {
            error!(error = %e, "store failure");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                err.code(),
                "Internal server error",
            );
        }
    };
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path identifier; malformed ids are a 400 `invalid_id`.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>()
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, e.code(), e.to_string()))
}

/// Unwrap a JSON body, turning extractor rejections into JSON errors.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    body.map(|Json(value)| value)
        .map_err(|rejection| json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text()))
}
