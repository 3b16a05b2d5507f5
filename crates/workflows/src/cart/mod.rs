//! Cart creation workflow handlers.

pub mod attach_region;

pub use attach_region::{AttachRegion, Aliases, REGION_REQUIRED, RegionDto, RegionInput, attach_region};
