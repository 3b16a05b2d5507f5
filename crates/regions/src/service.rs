use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use storefront_core::{DomainError, Filter, FindConfig, ServiceResult};

use crate::region::{Region, RegionRepository};

/// Collaborator that lists regions.
///
/// Workflow steps depend on this trait rather than on a concrete service, so
/// tests can substitute a fake.
#[async_trait]
pub trait RegionLister: Send + Sync {
    async fn list(&self, filter: &Filter, config: &FindConfig) -> ServiceResult<Vec<Region>>;
}

#[async_trait]
impl<L> RegionLister for Arc<L>
where
    L: RegionLister + ?Sized,
{
    async fn list(&self, filter: &Filter, config: &FindConfig) -> ServiceResult<Vec<Region>> {
        (**self).list(filter, config).await
    }
}

#[derive(Debug, Clone)]
pub struct RegionService<R> {
    repository: R,
}

impl<R> RegionService<R>
where
    R: RegionRepository,
{
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    #[instrument(skip_all, fields(take = ?config.take))]
    pub async fn list(&self, filter: &Filter, config: &FindConfig) -> ServiceResult<Vec<Region>> {
        Ok(self.repository.find(filter, config).await?)
    }

    #[instrument(skip(self))]
    pub async fn retrieve(&self, id: &str) -> ServiceResult<Region> {
        if id.is_empty() {
            return Err(DomainError::invalid_data("region - id must be defined").into());
        }
        self.repository
            .find(&Filter::by_id(id), &FindConfig::new().take(1))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found(format!("Region with id: {id} was not found")).into())
    }
}

#[async_trait]
impl<R> RegionLister for RegionService<R>
where
    R: RegionRepository,
{
    async fn list(&self, filter: &Filter, config: &FindConfig) -> ServiceResult<Vec<Region>> {
        RegionService::list(self, filter, config).await
    }
}
