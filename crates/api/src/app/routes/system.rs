use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": services.settings.app_name,
        "version": services.settings.app_version,
    }))
}

pub async fn root(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": format!("Welcome to {}", services.settings.app_name),
        "version": services.settings.app_version,
        "api": services.settings.api_prefix,
    }))
}
