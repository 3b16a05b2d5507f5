//! `storefront-core`: shared building blocks for the storefront data layer.
//!
//! This crate holds **storage-agnostic** primitives: entity metadata, the
//! filter/find-config query model, projection parsing and the error types every
//! service and repository speaks.

pub mod entity;
pub mod error;
pub mod projection;
pub mod query;

pub use entity::{Entity, EntitySchema};
pub use error::{DomainError, RepositoryError, ServiceError, ServiceResult};
pub use projection::Projection;
pub use query::{Filter, FilterValue, FindConfig, OrderBy, SortDirection};
