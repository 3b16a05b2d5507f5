use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use storefront_core::{DomainError, RepositoryError, ServiceError};
use storefront_workflows::WorkflowError;

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Repository(e) => repository_error_to_response(e),
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    let status = match err {
        DomainError::InvalidData(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
    };
    json_error(status, err.code(), err.to_string())
}

pub fn repository_error_to_response(err: RepositoryError) -> Response {
    match &err {
        RepositoryError::UnknownField { .. } => {
            json_error(StatusCode::BAD_REQUEST, "unknown_field", err.to_string())
        }
        RepositoryError::UnknownRelation { .. } => {
            json_error(StatusCode::BAD_REQUEST, "unknown_relation", err.to_string())
        }
        RepositoryError::Constraint(_) => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
        RepositoryError::Connection(_) | RepositoryError::Query(_) | RepositoryError::Decode(_) => {
            error!(error = %err, "repository failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
        }
    }
}

pub fn workflow_error_to_response(err: WorkflowError) -> Response {
    match err {
        WorkflowError::Service(e) => service_error_to_response(e),
        WorkflowError::MissingInput { .. } | WorkflowError::MalformedInput { .. } => {
            json_error(StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
