//! Regions module: commercial configuration (currency, tax) a cart belongs to.

pub mod region;
pub mod service;

pub use region::{REGION, Region, RegionRepository};
pub use service::{RegionLister, RegionService};
