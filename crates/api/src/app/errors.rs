use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use catalog_core::ValidationErrors;
use catalog_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Validation(errors) => validation_error(errors),
        ServiceError::NotFound(_) => json_error(StatusCode::NOT_FOUND, err.code(), err.to_string()),
        ServiceError::Gone(_) => json_error(StatusCode::GONE, err.code(), err.to_string()),
        ServiceError::Conflict(_) => json_error(StatusCode::CONFLICT, err.code(), err.to_string()),
        // Detail was logged by the service; callers only learn that it failed.
        ServiceError::DuplicateId(_) | ServiceError::Storage => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "an internal error occurred",
        ),
    }
}

pub fn validation_error(errors: ValidationErrors) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "message": errors.to_string(),
            "fields": errors.violations(),
        })),
    )
        .into_response()
}

/// Malformed or mistyped JSON bodies keep axum's status (400/415/422) but
/// use the common error body.
pub fn json_rejection(rejection: JsonRejection) -> axum::response::Response {
    json_error(rejection.status(), "invalid_body", rejection.body_text())
}

pub fn invalid_product_id(raw: &str) -> axum::response::Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "invalid_id",
        format!("'{raw}' is not a valid product id"),
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
