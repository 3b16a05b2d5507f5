//! Products catalog module.
//!
//! Entities, projected views, the variant repository boundary and the variant
//! query service. No storage lives here; backends are in `storefront-infra`.

pub mod model;
pub mod repository;
pub mod service;
pub mod view;

pub use model::{
    PRODUCT, PRODUCT_OPTION, PRODUCT_TAG, PRODUCT_VARIANT, Product, ProductOption, ProductStatus,
    ProductTag, ProductVariant,
};
pub use repository::ProductVariantRepository;
pub use service::ProductVariantService;
pub use view::{ProductGraph, ProductView, Relation, VariantView};
