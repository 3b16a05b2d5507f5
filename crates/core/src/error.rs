//! Error model shared by services, repositories and workflow steps.

use thiserror::Error;

/// Result type returned by services.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business failures. These are terminal:
/// retrying the same call with the same data yields the same error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input or stored data does not satisfy a business precondition.
    #[error("{0}")]
    InvalidData(String),

    /// A requested record does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl DomainError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidData(_) => "invalid_data",
            DomainError::NotFound(_) => "not_found",
        }
    }
}

/// Data-access failure raised by a repository backend.
///
/// Services never translate these; callers see exactly what the backend raised.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("unknown field `{field}` on {entity}")]
    UnknownField { entity: &'static str, field: String },

    #[error("unknown relation `{relation}` on {entity}")]
    UnknownRelation {
        entity: &'static str,
        relation: String,
    },

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("failed to decode row: {0}")]
    Decode(String),
}

/// Error returned by services and workflow steps.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// The domain error, if this failure is a business-rule violation.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            ServiceError::Repository(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_displays_message_verbatim() {
        let err = DomainError::invalid_data("A region is required to create a cart");
        assert_eq!(err.to_string(), "A region is required to create a cart");
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn service_error_is_transparent_over_repository_error() {
        let err: ServiceError = RepositoryError::Connection("refused".into()).into();
        assert_eq!(err.to_string(), "connection failed: refused");
        assert!(err.as_domain().is_none());
    }
}
