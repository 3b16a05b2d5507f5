use std::sync::Arc;

use tracing::{info, warn};

use storefront_core::RepositoryError;
use storefront_infra::{
    Config, InMemoryCatalog, InMemoryRegionStore, PostgresCatalog, PostgresRegionStore,
};
use storefront_products::{ProductVariantRepository, ProductVariantService};
use storefront_regions::{RegionRepository, RegionService};
use storefront_workflows::cart::AttachRegion;

pub type VariantService = ProductVariantService<Arc<dyn ProductVariantRepository>>;
pub type Regions = Arc<RegionService<Arc<dyn RegionRepository>>>;

/// Services shared by every handler.
pub struct AppServices {
    pub variants: VariantService,
    pub regions: Regions,
    pub attach_region: AttachRegion<Regions>,
}

impl AppServices {
    pub fn new(
        variants: Arc<dyn ProductVariantRepository>,
        regions: Arc<dyn RegionRepository>,
    ) -> Self {
        let regions = Arc::new(RegionService::new(regions));
        Self {
            variants: ProductVariantService::new(variants),
            attach_region: AttachRegion::new(regions.clone()),
            regions,
        }
    }

    /// Dev/test wiring over in-memory stores. The stores stay shared with the
    /// caller so it can seed them.
    pub fn in_memory(catalog: Arc<InMemoryCatalog>, regions: Arc<InMemoryRegionStore>) -> Self {
        Self::new(catalog, regions)
    }
}

/// Build services from configuration: Postgres when `DATABASE_URL` is set,
/// in-memory stores otherwise.
pub async fn build_services(config: &Config) -> Result<AppServices, RepositoryError> {
    match &config.database {
        Some(database) => {
            let pool = storefront_infra::connect(database).await?;
            storefront_infra::migrate(&pool).await?;
            info!(max_connections = database.max_connections, "using postgres stores");
            Ok(AppServices::new(
                Arc::new(PostgresCatalog::new(pool.clone())),
                Arc::new(PostgresRegionStore::new(pool)),
            ))
        }
        None => {
            warn!(
                "DATABASE_URL not set; using empty in-memory stores. \
                 POST /carts/region fails with invalid_data until a region is seeded"
            );
            Ok(AppServices::in_memory(
                Arc::new(InMemoryCatalog::new()),
                Arc::new(InMemoryRegionStore::new()),
            ))
        }
    }
}
