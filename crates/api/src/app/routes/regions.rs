use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use storefront_core::Filter;

use crate::app::dto::PageQuery;
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_regions))
        .route("/:id", get(get_region))
}

pub async fn list_regions(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<PageQuery>,
) -> Response {
    match services.regions.list(&Filter::new(), &query.find_config()).await {
        Ok(regions) => Json(json!({ "regions": regions })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_region(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    match services.regions.retrieve(&id).await {
        Ok(region) => Json(json!({ "region": region })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
