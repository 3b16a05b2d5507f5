use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use crate::app::dto::{ListVariantsQuery, ProjectionQuery};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_variants))
        .route("/:id", get(get_variant))
}

pub async fn list_variants(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListVariantsQuery>,
) -> Response {
    let filter = query.filter();
    let config = query.find_config();

    match services.variants.list_and_count(&filter, &config).await {
        Ok((variants, count)) => Json(json!({
            "variants": variants,
            "count": count,
        }))
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_variant(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<ProjectionQuery>,
) -> Response {
    match services.variants.retrieve(&id, &query.find_config()).await {
        Ok(variant) => Json(json!({ "variant": variant })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
