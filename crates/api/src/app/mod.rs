//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage backend selection and the product service
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use catalog_infra::Settings;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let cors = cors_layer(&services.settings);
    let prefix = services.settings.api_prefix.trim_end_matches('/').to_string();

    let api = if prefix.is_empty() {
        routes::router()
    } else {
        Router::new().nest(&prefix, routes::router())
    };

    Router::new()
        .route("/", get(routes::system::root))
        .route("/health", get(routes::system::health))
        .merge(api)
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins = settings.cors_origins_list();
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    fn app_with(settings: Settings) -> Router {
        build_app(Arc::new(AppServices::in_memory(settings)))
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_configured_identity() {
        let mut settings = Settings::default();
        settings.app_name = "Test Catalog".to_string();
        let (status, body) = call(app_with(settings), get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "Test Catalog");
        assert_eq!(body["version"], "1.0.0");
    }

    #[tokio::test]
    async fn root_points_at_api_prefix() {
        let (status, body) = call(app_with(Settings::default()), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["api"], "/api/v1");
        assert_eq!(body["message"], "Welcome to Products REST API");
    }

    #[tokio::test]
    async fn routes_follow_configured_prefix() {
        let mut settings = Settings::default();
        settings.api_prefix = "/catalog/".to_string();
        let app = app_with(settings);

        let (status, body) = call(app.clone(), get("/catalog/products")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);

        let (status, _) = call(app, get("/api/v1/products")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bad_id_is_rejected_before_lookup() {
        let (status, body) = call(app_with(Settings::default()), get("/api/v1/products/nope")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_id");
    }

    #[tokio::test]
    async fn malformed_json_uses_error_body() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/products")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(app_with(Settings::default()), req).await;

        assert!(status.is_client_error());
        assert_eq!(body["error"], "invalid_body");
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() {
        let mut settings = Settings::default();
        settings.cors_origins = "https://shop.example".to_string();
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/products")
            .header(header::ORIGIN, "https://shop.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let res = app_with(settings).oneshot(req).await.unwrap();
        assert_eq!(
            res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://shop.example"
        );
    }
}
