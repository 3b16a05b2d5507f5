use axum::Router;

pub mod carts;
pub mod regions;
pub mod system;
pub mod variants;

/// Router for all resource endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/product-variants", variants::router())
        .nest("/regions", regions::router())
        .nest("/carts", carts::router())
}
