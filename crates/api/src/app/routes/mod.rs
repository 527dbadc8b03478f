use axum::Router;

pub mod products;
pub mod system;

/// Router for everything mounted under the API prefix.
pub fn router() -> Router {
    Router::new().nest("/products", products::router())
}
