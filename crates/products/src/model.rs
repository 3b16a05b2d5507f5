//! Catalog entities as persisted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::{Entity, EntitySchema};

pub static PRODUCT: EntitySchema = EntitySchema {
    name: "Product",
    table: "product",
    columns: &["id", "title", "handle", "status", "created_at", "updated_at"],
    relations: &[
        ("variants", &PRODUCT_VARIANT),
        ("tags", &PRODUCT_TAG),
        ("options", &PRODUCT_OPTION),
    ],
};

pub static PRODUCT_VARIANT: EntitySchema = EntitySchema {
    name: "ProductVariant",
    table: "product_variant",
    columns: &[
        "id",
        "title",
        "sku",
        "inventory_quantity",
        "product_id",
        "created_at",
        "updated_at",
    ],
    relations: &[("product", &PRODUCT)],
};

pub static PRODUCT_TAG: EntitySchema = EntitySchema {
    name: "ProductTag",
    table: "product_tag",
    columns: &["id", "value"],
    relations: &[],
};

pub static PRODUCT_OPTION: EntitySchema = EntitySchema {
    name: "ProductOption",
    table: "product_option",
    columns: &["id", "title", "product_id"],
    relations: &[],
};

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Proposed,
    Published,
    Rejected,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Proposed => "proposed",
            ProductStatus::Published => "published",
            ProductStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ProductStatus::Draft),
            "proposed" => Some(ProductStatus::Proposed),
            "published" => Some(ProductStatus::Published),
            "rejected" => Some(ProductStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub handle: Option<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(id: impl Into<String>, title: impl Into<String>, status: ProductStatus) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            handle: None,
            status,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Product {
    type Id = String;

    fn id(&self) -> &String {
        &self.id
    }

    fn schema() -> &'static EntitySchema {
        &PRODUCT
    }
}

/// A purchasable configuration of a product with its own inventory count.
///
/// `product_id` is never empty: every variant belongs to exactly one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: String,
    pub title: String,
    pub sku: Option<String>,
    /// Serialized as a string-encoded decimal (`"10"`).
    pub inventory_quantity: Decimal,
    pub product_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductVariant {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        inventory_quantity: impl Into<Decimal>,
        product_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            sku: None,
            inventory_quantity: inventory_quantity.into(),
            product_id: product_id.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for ProductVariant {
    type Id = String;

    fn id(&self) -> &String {
        &self.id
    }

    fn schema() -> &'static EntitySchema {
        &PRODUCT_VARIANT
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTag {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: String,
    pub title: String,
    pub product_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_quantity_serializes_as_string_decimal() {
        let v = ProductVariant::new("test-1", "variant 1", 10, "product-1");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["inventory_quantity"], serde_json::json!("10"));
    }

    #[test]
    fn status_round_trips_through_its_string_form() {
        for status in [
            ProductStatus::Draft,
            ProductStatus::Proposed,
            ProductStatus::Published,
            ProductStatus::Rejected,
        ] {
            assert_eq!(ProductStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProductStatus::parse("archived"), None);
    }

    #[test]
    fn variant_schema_reaches_product_collections() {
        let product = PRODUCT_VARIANT.relation("product").unwrap();
        assert_eq!(product.table, "product");
        assert!(product.relation("tags").is_some());
        assert!(product.relation("variants").is_some());
    }
}
