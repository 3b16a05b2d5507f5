//! Postgres-backed repositories.
//!
//! Rows are fetched whole (root columns plus the joined product, when asked for)
//! and projected in Rust with the same code the in-memory stores use, so both
//! backends shape results identically.
//!
//! ## Error Mapping
//!
//! | SQLx error | Postgres code | RepositoryError |
//! |------------|---------------|-----------------|
//! | Database (unique/fk/check violation) | `23505` / `23503` / `23514` | `Constraint` |
//! | Database (other) | any | `Query` |
//! | PoolClosed / PoolTimedOut / Io / Tls | n/a | `Connection` |
//! | ColumnDecode / ColumnNotFound / Decode | n/a | `Decode` |
//! | Other | n/a | `Query` |

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tracing::{Span, debug, instrument};

use storefront_core::{Filter, FilterValue, FindConfig, Projection, RepositoryError};
use storefront_products::{
    PRODUCT, PRODUCT_VARIANT, Product, ProductGraph, ProductOption, ProductStatus, ProductTag,
    ProductVariant, ProductVariantRepository, VariantView,
};
use storefront_regions::{REGION, Region, RegionRepository};

use crate::config::DatabaseConfig;
use crate::sql::SelectBuilder;

const VARIANT_ALIAS: &str = "v";
const PRODUCT_ALIAS: &str = "p";
const PRODUCT_PREFIX: &str = "product__";

/// Open a connection pool.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, RepositoryError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Apply the embedded schema migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| RepositoryError::Query(format!("migration failed: {e}")))
}

/// Catalog repository over the `product*` tables.
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: Arc<PgPool>,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn load_graphs(
        &self,
        products: Vec<Product>,
        projection: &Projection,
    ) -> Result<HashMap<String, ProductGraph>, RepositoryError> {
        let ids: Vec<String> = products.iter().map(|p| p.id.clone()).collect();
        let mut graphs: HashMap<String, ProductGraph> = products
            .into_iter()
            .map(|p| (p.id.clone(), ProductGraph::new(p)))
            .collect();
        if ids.is_empty() {
            return Ok(graphs);
        }

        if projection.relation("tags").is_some() {
            let rows = sqlx::query(
                r#"
                SELECT pt.product_id, t.id, t.value
                FROM product_tags pt
                JOIN product_tag t ON t.id = pt.product_tag_id
                WHERE pt.product_id = ANY($1)
                ORDER BY t.value ASC, t.id ASC
                "#,
            )
            .bind(ids.as_slice())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_product_tags", e))?;

            for graph in graphs.values_mut() {
                graph.tags = Some(Vec::new());
            }
            for row in rows {
                let product_id: String = get(&row, "product_id")?;
                let tag = ProductTag {
                    id: get(&row, "id")?,
                    value: get(&row, "value")?,
                };
                if let Some(tags) = graphs.get_mut(&product_id).and_then(|g| g.tags.as_mut()) {
                    tags.push(tag);
                }
            }
        }

        if projection.relation("options").is_some() {
            let rows = sqlx::query(
                r#"
                SELECT id, title, product_id
                FROM product_option
                WHERE product_id = ANY($1)
                ORDER BY id ASC
                "#,
            )
            .bind(ids.as_slice())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_product_options", e))?;

            for graph in graphs.values_mut() {
                graph.options = Some(Vec::new());
            }
            for row in rows {
                let option = ProductOption {
                    id: get(&row, "id")?,
                    title: get(&row, "title")?,
                    product_id: get(&row, "product_id")?,
                };
                if let Some(options) = graphs
                    .get_mut(&option.product_id)
                    .and_then(|g| g.options.as_mut())
                {
                    options.push(option);
                }
            }
        }

        if projection.relation("variants").is_some() {
            let owners = Filter::new().with(
                "product_id",
                FilterValue::In(ids.iter().map(|id| JsonValue::from(id.as_str())).collect()),
            );
            let (sql, params) = SelectBuilder::new(PRODUCT_VARIANT.table, VARIANT_ALIAS)
                .columns_of(VARIANT_ALIAS, &PRODUCT_VARIANT, "")
                .filter(&owners)?
                .page(&FindConfig::new(), &["created_at", "id"])
                .build_select();
            let rows = bind_all(sqlx::query(&sql), params)
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("load_product_variants", e))?;

            for graph in graphs.values_mut() {
                graph.variants = Some(Vec::new());
            }
            for row in rows {
                let variant = decode_variant(&row)?;
                if let Some(variants) = graphs
                    .get_mut(&variant.product_id)
                    .and_then(|g| g.variants.as_mut())
                {
                    variants.push(variant);
                }
            }
        }

        Ok(graphs)
    }
}

/// SELECT for a variant page. Joins `product` when the projection reaches it.
pub fn variant_select(
    filter: &Filter,
    config: &FindConfig,
    projection: &Projection,
) -> Result<SelectBuilder, RepositoryError> {
    let mut builder = SelectBuilder::new(PRODUCT_VARIANT.table, VARIANT_ALIAS)
        .columns_of(VARIANT_ALIAS, &PRODUCT_VARIANT, "");
    if projection.relation("product").is_some() {
        builder = builder
            .columns_of(PRODUCT_ALIAS, &PRODUCT, PRODUCT_PREFIX)
            .left_join(PRODUCT.table, PRODUCT_ALIAS, "product_id");
    }
    Ok(builder
        .filter(filter)?
        .page(config, &["created_at", "id"]))
}

#[async_trait]
impl ProductVariantRepository for PostgresCatalog {
    #[instrument(skip_all, fields(row_count = tracing::field::Empty), err)]
    async fn find(
        &self,
        filter: &Filter,
        config: &FindConfig,
    ) -> Result<Vec<VariantView>, RepositoryError> {
        filter.validate(&PRODUCT_VARIANT)?;
        let projection = config.validate(&PRODUCT_VARIANT)?;
        let product_projection = projection.relation("product");

        let (sql, params) = variant_select(filter, config, &projection)?.build_select();
        debug!(%sql, "selecting product variants");

        let rows = bind_all(sqlx::query(&sql), params)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_variants", e))?;

        let mut variants = Vec::with_capacity(rows.len());
        let mut products = Vec::new();
        for row in &rows {
            variants.push(decode_variant(row)?);
            if product_projection.is_some() {
                if let Some(product) = decode_joined_product(row)? {
                    if !products.iter().any(|p: &Product| p.id == product.id) {
                        products.push(product);
                    }
                }
            }
        }

        let graphs = match product_projection {
            Some(child) => self.load_graphs(products, child).await?,
            None => HashMap::new(),
        };

        Span::current().record("row_count", variants.len());
        Ok(variants
            .iter()
            .map(|v| VariantView::project(v, graphs.get(&v.product_id), &projection))
            .collect())
    }

    #[instrument(skip_all, err)]
    async fn count(&self, filter: &Filter) -> Result<u64, RepositoryError> {
        filter.validate(&PRODUCT_VARIANT)?;
        let (sql, params) = SelectBuilder::new(PRODUCT_VARIANT.table, VARIANT_ALIAS)
            .filter(filter)?
            .build_count();

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for param in params {
            query = query.bind(param);
        }
        let count = query
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_variants", e))?;
        Ok(count.max(0) as u64)
    }
}

/// Region repository over the `region` table.
#[derive(Debug, Clone)]
pub struct PostgresRegionStore {
    pool: Arc<PgPool>,
}

impl PostgresRegionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl RegionRepository for PostgresRegionStore {
    #[instrument(skip_all, err)]
    async fn find(&self, filter: &Filter, config: &FindConfig) -> Result<Vec<Region>, RepositoryError> {
        filter.validate(&REGION)?;
        config.validate(&REGION)?;

        let (sql, params) = SelectBuilder::new(REGION.table, "r")
            .columns_of("r", &REGION, "")
            .filter(filter)?
            .page(config, &["created_at", "id"])
            .build_select();

        let rows = bind_all(sqlx::query(&sql), params)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_regions", e))?;

        rows.iter()
            .map(|row| {
                Ok(Region {
                    id: get(row, "id")?,
                    name: get(row, "name")?,
                    currency_code: get(row, "currency_code")?,
                    created_at: get(row, "created_at")?,
                })
            })
            .collect()
    }
}

fn bind_all(
    mut query: Query<'_, Postgres, PgArguments>,
    params: Vec<String>,
) -> Query<'_, Postgres, PgArguments> {
    for param in params {
        query = query.bind(param);
    }
    query
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column).map_err(|e| map_sqlx_error("decode", e))
}

fn decode_variant(row: &PgRow) -> Result<ProductVariant, RepositoryError> {
    Ok(ProductVariant {
        id: get(row, "id")?,
        title: get(row, "title")?,
        sku: get(row, "sku")?,
        inventory_quantity: get::<Decimal>(row, "inventory_quantity")?,
        product_id: get(row, "product_id")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

/// The LEFT JOINed product, or `None` when the join found no row.
fn decode_joined_product(row: &PgRow) -> Result<Option<Product>, RepositoryError> {
    let column = |name: &str| format!("{PRODUCT_PREFIX}{name}");

    let Some(id) = get::<Option<String>>(row, &column("id"))? else {
        return Ok(None);
    };
    let status: String = get(row, &column("status"))?;
    let status = ProductStatus::parse(&status)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown product status: {status}")))?;

    Ok(Some(Product {
        id,
        title: get(row, &column("title"))?,
        handle: get(row, &column("handle"))?,
        status,
        created_at: get::<DateTime<Utc>>(row, &column("created_at"))?,
        updated_at: get::<DateTime<Utc>>(row, &column("updated_at"))?,
    }))
}

/// Map SQLx errors to [`RepositoryError`].
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") | Some("23514") => RepositoryError::Constraint(msg),
                _ => RepositoryError::Query(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            RepositoryError::Connection(format!("connection pool unavailable in {}", operation))
        }
        sqlx::Error::Io(e) => RepositoryError::Connection(format!("io error in {}: {}", operation, e)),
        sqlx::Error::Tls(e) => RepositoryError::Connection(format!("tls error in {}: {}", operation, e)),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) | sqlx::Error::Decode(_) => {
            RepositoryError::Decode(format!("decode error in {}: {}", operation, err))
        }
        _ => RepositoryError::Query(format!("sqlx error in {}: {}", operation, err)),
    }
}
