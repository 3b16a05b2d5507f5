//! In-memory repositories for tests/dev.
//!
//! Filters are evaluated against the JSON form of each entity, so the same
//! predicate semantics apply as for any other backend. Columns the SQL backend
//! casts to `numeric` are turned into JSON numbers first, so they filter and
//! sort as numbers there too. Rows are returned in insertion order unless an
//! explicit order is requested.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::instrument;

use storefront_core::{Entity, Filter, FindConfig, Projection, RepositoryError};
use storefront_products::{
    Product, ProductGraph, ProductOption, ProductTag, ProductVariant, ProductVariantRepository,
    VariantView,
};
use storefront_regions::{Region, RegionRepository};

use crate::sql::column_cast;

#[derive(Debug, Default)]
struct CatalogTables {
    products: Vec<Product>,
    variants: Vec<ProductVariant>,
    tags: Vec<ProductTag>,
    /// (product_id, tag_id)
    product_tags: Vec<(String, String)>,
    options: Vec<ProductOption>,
}

impl CatalogTables {
    fn product_graph(&self, product_id: &str, projection: &Projection) -> Option<ProductGraph> {
        let product = self.products.iter().find(|p| p.id == product_id)?.clone();
        let mut graph = ProductGraph::new(product);

        if projection.relation("tags").is_some() {
            graph.tags = Some(
                self.product_tags
                    .iter()
                    .filter(|(pid, _)| pid == product_id)
                    .filter_map(|(_, tid)| self.tags.iter().find(|t| &t.id == tid).cloned())
                    .collect(),
            );
        }
        if projection.relation("options").is_some() {
            graph.options = Some(
                self.options
                    .iter()
                    .filter(|o| o.product_id == product_id)
                    .cloned()
                    .collect(),
            );
        }
        if projection.relation("variants").is_some() {
            graph.variants = Some(
                self.variants
                    .iter()
                    .filter(|v| v.product_id == product_id)
                    .cloned()
                    .collect(),
            );
        }
        Some(graph)
    }

    fn matching_variants(&self, filter: &Filter) -> Result<Vec<(&ProductVariant, JsonValue)>, RepositoryError> {
        let mut out = Vec::new();
        for variant in &self.variants {
            let json = to_json(variant)?;
            if filter.matches(&json) {
                out.push((variant, json));
            }
        }
        Ok(out)
    }
}

/// In-memory product catalog (products, variants, tags, options).
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<CatalogTables>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CatalogTables>, RepositoryError> {
        self.inner
            .read()
            .map_err(|_| RepositoryError::Connection("catalog lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CatalogTables>, RepositoryError> {
        self.inner
            .write()
            .map_err(|_| RepositoryError::Connection("catalog lock poisoned".to_string()))
    }

    /// Insert or replace a product.
    pub fn upsert_product(&self, product: Product) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        match tables.products.iter_mut().find(|p| p.id() == product.id()) {
            Some(existing) => *existing = product,
            None => tables.products.push(product),
        }
        Ok(())
    }

    /// Insert or replace a variant. The owning product must already exist.
    pub fn upsert_variant(&self, variant: ProductVariant) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        if !tables.products.iter().any(|p| p.id == variant.product_id) {
            return Err(RepositoryError::Constraint(format!(
                "product_variant.product_id references missing product {}",
                variant.product_id
            )));
        }
        match tables.variants.iter_mut().find(|v| v.id() == variant.id()) {
            Some(existing) => *existing = variant,
            None => tables.variants.push(variant),
        }
        Ok(())
    }

    /// Attach a tag to a product, creating the tag if needed.
    pub fn tag_product(&self, product_id: &str, tag: ProductTag) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        if !tables.products.iter().any(|p| p.id == product_id) {
            return Err(RepositoryError::Constraint(format!(
                "product_tags.product_id references missing product {product_id}"
            )));
        }
        let link = (product_id.to_string(), tag.id.clone());
        if !tables.tags.iter().any(|t| t.id == tag.id) {
            tables.tags.push(tag);
        }
        if !tables.product_tags.contains(&link) {
            tables.product_tags.push(link);
        }
        Ok(())
    }

    pub fn upsert_option(&self, option: ProductOption) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        if !tables.products.iter().any(|p| p.id == option.product_id) {
            return Err(RepositoryError::Constraint(format!(
                "product_option.product_id references missing product {}",
                option.product_id
            )));
        }
        match tables.options.iter_mut().find(|o| o.id == option.id) {
            Some(existing) => *existing = option,
            None => tables.options.push(option),
        }
        Ok(())
    }
}

#[async_trait]
impl ProductVariantRepository for InMemoryCatalog {
    #[instrument(skip_all, err)]
    async fn find(
        &self,
        filter: &Filter,
        config: &FindConfig,
    ) -> Result<Vec<VariantView>, RepositoryError> {
        filter.validate(ProductVariant::schema())?;
        let projection = config.validate(ProductVariant::schema())?;

        let tables = self.read()?;
        let rows = tables.matching_variants(filter)?;
        let page = config.paginate(rows, |(_, json)| json.clone());

        let product_projection = projection.relation("product");
        let views = page
            .into_iter()
            .map(|(variant, _)| {
                let graph = product_projection.and_then(|p| tables.product_graph(&variant.product_id, p));
                VariantView::project(variant, graph.as_ref(), &projection)
            })
            .collect();
        Ok(views)
    }

    #[instrument(skip_all, err)]
    async fn count(&self, filter: &Filter) -> Result<u64, RepositoryError> {
        filter.validate(ProductVariant::schema())?;
        let tables = self.read()?;
        Ok(tables.matching_variants(filter)?.len() as u64)
    }
}

/// In-memory region store.
#[derive(Debug, Default)]
pub struct InMemoryRegionStore {
    inner: RwLock<Vec<Region>>,
}

impl InMemoryRegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, region: Region) -> Result<(), RepositoryError> {
        let mut regions = self
            .inner
            .write()
            .map_err(|_| RepositoryError::Connection("region lock poisoned".to_string()))?;
        match regions.iter_mut().find(|r| r.id() == region.id()) {
            Some(existing) => *existing = region,
            None => regions.push(region),
        }
        Ok(())
    }
}

#[async_trait]
impl RegionRepository for InMemoryRegionStore {
    #[instrument(skip_all, err)]
    async fn find(&self, filter: &Filter, config: &FindConfig) -> Result<Vec<Region>, RepositoryError> {
        filter.validate(Region::schema())?;
        config.validate(Region::schema())?;

        let regions = self
            .inner
            .read()
            .map_err(|_| RepositoryError::Connection("region lock poisoned".to_string()))?;

        let mut rows = Vec::new();
        for region in regions.iter() {
            let json = to_json(region)?;
            if filter.matches(&json) {
                rows.push((region.clone(), json));
            }
        }
        Ok(config
            .paginate(rows, |(_, json)| json.clone())
            .into_iter()
            .map(|(region, _)| region)
            .collect())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<JsonValue, RepositoryError> {
    let mut json = serde_json::to_value(value).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    if let JsonValue::Object(fields) = &mut json {
        for (column, value) in fields.iter_mut() {
            if column_cast(column) != Some("numeric") {
                continue;
            }
            let number = value
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .and_then(serde_json::Number::from_f64);
            if let Some(number) = number {
                *value = JsonValue::Number(number);
            }
        }
    }
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;
    use storefront_core::{FilterValue, ServiceError, SortDirection};
    use storefront_products::{ProductStatus, ProductVariantService};

    fn seeded() -> InMemoryCatalog {
        let catalog = InMemoryCatalog::new();
        catalog
            .upsert_product(Product::new("product-1", "product 1", ProductStatus::Published))
            .unwrap();
        catalog
            .upsert_variant(ProductVariant::new("test-1", "variant 1", 10, "product-1"))
            .unwrap();
        catalog
            .upsert_variant(ProductVariant::new("test-2", "variant", 10, "product-1"))
            .unwrap();
        catalog
            .tag_product(
                "product-1",
                ProductTag {
                    id: "tag-1".into(),
                    value: "summer".into(),
                },
            )
            .unwrap();
        catalog
    }

    #[tokio::test]
    async fn selecting_by_properties_scopes_out_the_results() {
        let service = ProductVariantService::new(seeded());
        let results = service
            .list(&Filter::by_id("test-1"), &FindConfig::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "test-1");
        assert_eq!(results[0].title.as_deref(), Some("variant 1"));
        assert_eq!(results[0].inventory_quantity, Some(Decimal::from(10)));

        let json = serde_json::to_value(&results[0]).unwrap();
        assert_eq!(json["inventory_quantity"], json!("10"));
    }

    #[tokio::test]
    async fn passing_a_limit_scopes_the_result_to_the_limit() {
        let service = ProductVariantService::new(seeded());
        let results = service.list(&Filter::new(), &FindConfig::new().take(1)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "test-1");
    }

    #[tokio::test]
    async fn passing_populate_scopes_the_results_of_the_response() {
        let service = ProductVariantService::new(seeded());
        let results = service
            .list(
                &Filter::by_id("test-1"),
                &FindConfig::new()
                    .select(["id", "title", "product.title"])
                    .relations(["product"]),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        let product = results[0].product.as_ref().unwrap();
        assert_eq!(product.id, "product-1");
        assert_eq!(product.title.as_deref(), Some("product 1"));
        assert_eq!(product.tags.iter().count(), 0);
        assert_eq!(product.variants.iter().count(), 0);

        let round_tripped: JsonValue =
            serde_json::from_str(&serde_json::to_string(&results).unwrap()).unwrap();
        assert_eq!(
            round_tripped,
            json!([{
                "id": "test-1",
                "title": "variant 1",
                "product": {"id": "product-1", "title": "product 1"}
            }])
        );
    }

    #[tokio::test]
    async fn nested_relations_are_loaded_when_requested() {
        let results = seeded()
            .find(
                &Filter::by_id("test-2"),
                &FindConfig::new().relations(["product.tags", "product.variants"]),
            )
            .await
            .unwrap();

        let product = results[0].product.as_ref().unwrap();
        assert_eq!(product.tags.len(), 1);
        let sibling_ids: Vec<_> = product.variants.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(sibling_ids, ["test-1", "test-2"]);
        assert!(product.options.is_not_loaded());
    }

    #[tokio::test]
    async fn explicit_order_and_skip_apply() {
        let results = seeded()
            .find(
                &Filter::new(),
                &FindConfig::new().order_by("title", SortDirection::Asc).skip(1),
            )
            .await
            .unwrap();
        let ids: Vec<_> = results.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["test-1"]);
    }

    #[tokio::test]
    async fn ordering_by_title_handles_numeric_looking_titles() {
        let catalog = InMemoryCatalog::new();
        catalog
            .upsert_product(Product::new("product-1", "product 1", ProductStatus::Published))
            .unwrap();
        let titles = ["9", "10", "5x", "3XL", "2 pack", "XL", "nan", "1e3", "M", "08"];
        for (i, title) in titles.iter().enumerate() {
            catalog
                .upsert_variant(ProductVariant::new(format!("v-{i}"), *title, 1, "product-1"))
                .unwrap();
        }

        let service = ProductVariantService::new(catalog);
        let results = service
            .list(&Filter::new(), &FindConfig::new().order_by("title", SortDirection::Asc))
            .await
            .unwrap();
        let sorted: Vec<_> = results.iter().map(|v| v.title.as_deref().unwrap()).collect();
        assert_eq!(sorted, ["08", "10", "1e3", "2 pack", "3XL", "5x", "9", "M", "XL", "nan"]);
    }

    #[tokio::test]
    async fn inventory_quantity_orders_and_filters_numerically() {
        let catalog = InMemoryCatalog::new();
        catalog
            .upsert_product(Product::new("product-1", "product 1", ProductStatus::Published))
            .unwrap();
        for (id, quantity) in [("a", 9), ("b", 10), ("c", 100)] {
            catalog
                .upsert_variant(ProductVariant::new(id, id, quantity, "product-1"))
                .unwrap();
        }

        let results = catalog
            .find(
                &Filter::new(),
                &FindConfig::new().order_by("inventory_quantity", SortDirection::Desc),
            )
            .await
            .unwrap();
        let ids: Vec<_> = results.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);

        let filter = Filter::new().with("inventory_quantity", FilterValue::Gt(json!("9")));
        assert_eq!(catalog.count(&filter).await.unwrap(), 2);
        let filter = Filter::new().eq("inventory_quantity", 10);
        assert_eq!(catalog.count(&filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn predicates_filter_rows() {
        let catalog = seeded();
        let filter = Filter::new().with("title", FilterValue::Like("variant %".into()));
        assert_eq!(catalog.count(&filter).await.unwrap(), 1);

        let filter = Filter::new().with("id", FilterValue::In(vec![json!("test-1"), json!("test-2")]));
        assert_eq!(catalog.count(&filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unknown_select_field_is_rejected() {
        let service = ProductVariantService::new(seeded());
        let err = service
            .list(&Filter::new(), &FindConfig::new().select(["colour"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Repository(RepositoryError::UnknownField { entity: "ProductVariant", .. })
        ));
    }

    #[test]
    fn variant_requires_existing_product() {
        let catalog = InMemoryCatalog::new();
        let err = catalog
            .upsert_variant(ProductVariant::new("v", "orphan", 1, "missing"))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Constraint(_)));
    }

    #[tokio::test]
    async fn regions_are_listed_in_insertion_order() {
        let store = InMemoryRegionStore::new();
        store.upsert(Region::new("r_2", "Europe", "eur")).unwrap();
        store.upsert(Region::new("r_3", "North America", "usd")).unwrap();

        let regions = store.find(&Filter::new(), &FindConfig::new()).await.unwrap();
        let ids: Vec<_> = regions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r_2", "r_3"]);

        let err = store
            .find(&Filter::new(), &FindConfig::new().relations(["countries"]))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UnknownRelation { .. }));
    }
}
