//! Repository boundary for variant queries.

use std::sync::Arc;

use async_trait::async_trait;

use storefront_core::{Filter, FindConfig, RepositoryError};

use crate::view::VariantView;

/// Storage backend for product variants.
///
/// Implementations validate `filter` and `config` against
/// [`PRODUCT_VARIANT`](crate::model::PRODUCT_VARIANT), issue one query, and
/// return projected views.
#[async_trait]
pub trait ProductVariantRepository: Send + Sync {
    /// Find variants matching `filter`, shaped by `config`.
    async fn find(
        &self,
        filter: &Filter,
        config: &FindConfig,
    ) -> Result<Vec<VariantView>, RepositoryError>;

    /// Count variants matching `filter`, ignoring paging.
    async fn count(&self, filter: &Filter) -> Result<u64, RepositoryError>;
}

#[async_trait]
impl<R> ProductVariantRepository for Arc<R>
where
    R: ProductVariantRepository + ?Sized,
{
    async fn find(
        &self,
        filter: &Filter,
        config: &FindConfig,
    ) -> Result<Vec<VariantView>, RepositoryError> {
        (**self).find(filter, config).await
    }

    async fn count(&self, filter: &Filter) -> Result<u64, RepositoryError> {
        (**self).count(filter).await
    }
}
