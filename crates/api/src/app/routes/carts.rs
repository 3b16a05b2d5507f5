use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::Value as JsonValue;

use storefront_workflows::cart::Aliases;
use storefront_workflows::{StepData, run_step};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/region", post(resolve_region))
}

/// Resolve the region a new cart would be created in.
///
/// Body: `{"region_id"?: string}`. Without a region id the first configured
/// region is used.
pub async fn resolve_region(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<JsonValue>,
) -> Response {
    let data = StepData::new().with(Aliases::Region.as_str(), body);
    match run_step(&services.attach_region, &data).await {
        Ok(dto) => Json(dto).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
