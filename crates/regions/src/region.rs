use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Entity, EntitySchema, Filter, FindConfig, RepositoryError};

pub static REGION: EntitySchema = EntitySchema {
    name: "Region",
    table: "region",
    columns: &["id", "name", "currency_code", "created_at"],
    relations: &[],
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: String,
    /// ISO 4217 code, lowercase (e.g. "eur").
    pub currency_code: String,
    pub created_at: DateTime<Utc>,
}

impl Region {
    pub fn new(id: impl Into<String>, name: impl Into<String>, currency_code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            currency_code: currency_code.into(),
            created_at: Utc::now(),
        }
    }
}

impl Entity for Region {
    type Id = String;

    fn id(&self) -> &String {
        &self.id
    }

    fn schema() -> &'static EntitySchema {
        &REGION
    }
}

/// Storage backend for regions.
#[async_trait]
pub trait RegionRepository: Send + Sync {
    async fn find(&self, filter: &Filter, config: &FindConfig) -> Result<Vec<Region>, RepositoryError>;
}

#[async_trait]
impl<R> RegionRepository for Arc<R>
where
    R: RegionRepository + ?Sized,
{
    async fn find(&self, filter: &Filter, config: &FindConfig) -> Result<Vec<Region>, RepositoryError> {
        (**self).find(filter, config).await
    }
}
