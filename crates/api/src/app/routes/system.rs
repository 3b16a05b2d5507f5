use axum::Json;
use serde_json::{Value as JsonValue, json};

pub async fn health() -> Json<JsonValue> {
    Json(json!({"status": "ok"}))
}
