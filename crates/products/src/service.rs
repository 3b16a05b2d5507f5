//! Variant query service.

use tracing::{debug, instrument};

use storefront_core::{DomainError, Filter, FindConfig, ServiceResult};

use crate::repository::ProductVariantRepository;
use crate::view::VariantView;

/// Read-side service over a [`ProductVariantRepository`].
///
/// Each call issues at most one repository query (two for `list_and_count`).
/// Repository failures are returned unchanged.
#[derive(Debug, Clone)]
pub struct ProductVariantService<R> {
    repository: R,
}

impl<R> ProductVariantService<R>
where
    R: ProductVariantRepository,
{
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    #[instrument(skip_all, fields(take = ?config.take, relations = ?config.relations))]
    pub async fn list(&self, filter: &Filter, config: &FindConfig) -> ServiceResult<Vec<VariantView>> {
        let variants = self.repository.find(filter, config).await?;
        debug!(count = variants.len(), "listed product variants");
        Ok(variants)
    }

    /// List a page and the total number of matches (ignoring `take`/`skip`).
    #[instrument(skip_all, fields(take = ?config.take, skip = ?config.skip))]
    pub async fn list_and_count(
        &self,
        filter: &Filter,
        config: &FindConfig,
    ) -> ServiceResult<(Vec<VariantView>, u64)> {
        let variants = self.repository.find(filter, config).await?;
        let count = self.repository.count(filter).await?;
        Ok((variants, count))
    }

    #[instrument(skip(self, config))]
    pub async fn retrieve(&self, id: &str, config: &FindConfig) -> ServiceResult<VariantView> {
        if id.is_empty() {
            return Err(DomainError::invalid_data("productVariant - id must be defined").into());
        }

        let config = FindConfig {
            take: Some(1),
            skip: None,
            ..config.clone()
        };
        self.repository
            .find(&Filter::by_id(id), &config)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                DomainError::not_found(format!("ProductVariant with id: {id} was not found")).into()
            })
    }
}
