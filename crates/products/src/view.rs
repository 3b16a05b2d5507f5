//! Projected query results.
//!
//! Views carry only the fields a query asked for. Relation collections are an
//! explicit [`Relation`] so an unloaded collection is still enumerable in memory
//! (it yields nothing) but never shows up in serialized output.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use storefront_core::Projection;

use crate::model::{Product, ProductOption, ProductStatus, ProductTag, ProductVariant};

/// A to-many relation on a projected entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation<T> {
    NotLoaded,
    Loaded(Vec<T>),
}

impl<T> Default for Relation<T> {
    fn default() -> Self {
        Relation::NotLoaded
    }
}

impl<T> Relation<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Relation::Loaded(_))
    }

    pub fn is_not_loaded(&self) -> bool {
        !self.is_loaded()
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            Relation::Loaded(items) => items,
            Relation::NotLoaded => &[],
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl<'a, T> IntoIterator for &'a Relation<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Serialize> Serialize for Relation<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_slice().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Relation<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Relation::Loaded)
    }
}

/// A product together with whichever of its collections were loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductGraph {
    pub product: Product,
    pub tags: Option<Vec<ProductTag>>,
    pub options: Option<Vec<ProductOption>>,
    pub variants: Option<Vec<ProductVariant>>,
}

impl ProductGraph {
    pub fn new(product: Product) -> Self {
        Self {
            product,
            tags: None,
            options: None,
            variants: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductView {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Relation::is_not_loaded")]
    pub tags: Relation<ProductTag>,
    #[serde(default, skip_serializing_if = "Relation::is_not_loaded")]
    pub options: Relation<ProductOption>,
    #[serde(default, skip_serializing_if = "Relation::is_not_loaded")]
    pub variants: Relation<VariantView>,
}

impl ProductView {
    pub fn project(graph: &ProductGraph, projection: &Projection) -> Self {
        let p = &graph.product;
        Self {
            id: p.id.clone(),
            title: pick(projection, "title", &p.title),
            handle: pick(projection, "handle", &p.handle).flatten(),
            status: pick(projection, "status", &p.status),
            created_at: pick(projection, "created_at", &p.created_at),
            updated_at: pick(projection, "updated_at", &p.updated_at),
            tags: load(projection, "tags", graph.tags.as_deref(), |t, _| t.clone()),
            options: load(projection, "options", graph.options.as_deref(), |o, _| o.clone()),
            variants: load(projection, "variants", graph.variants.as_deref(), |v, child| {
                VariantView::project(v, None, child)
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantView {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductView>,
}

impl VariantView {
    /// Project a variant. `product` is attached only when the projection asks
    /// for the `product` relation.
    pub fn project(
        variant: &ProductVariant,
        product: Option<&ProductGraph>,
        projection: &Projection,
    ) -> Self {
        let product = match (projection.relation("product"), product) {
            (Some(child), Some(graph)) => Some(ProductView::project(graph, child)),
            _ => None,
        };

        Self {
            id: variant.id.clone(),
            title: pick(projection, "title", &variant.title),
            sku: pick(projection, "sku", &variant.sku).flatten(),
            inventory_quantity: pick(projection, "inventory_quantity", &variant.inventory_quantity),
            product_id: pick(projection, "product_id", &variant.product_id),
            created_at: pick(projection, "created_at", &variant.created_at),
            updated_at: pick(projection, "updated_at", &variant.updated_at),
            product,
        }
    }
}

fn pick<T: Clone>(projection: &Projection, field: &str, value: &T) -> Option<T> {
    projection.includes(field).then(|| value.clone())
}

fn load<S, T>(
    projection: &Projection,
    relation: &str,
    rows: Option<&[S]>,
    map: impl Fn(&S, &Projection) -> T,
) -> Relation<T> {
    match (projection.relation(relation), rows) {
        (Some(child), Some(rows)) => Relation::Loaded(rows.iter().map(|r| map(r, child)).collect()),
        _ => Relation::NotLoaded,
    }
}
