//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: repository selection and service construction
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: query-string parsing into filters and find configs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router over already-constructed services.
pub fn build_app(services: AppServices) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(Arc::new(services)))
}
