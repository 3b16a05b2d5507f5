//! Resolve the region a new cart belongs to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use storefront_core::{DomainError, Filter, FindConfig, ServiceResult};
use storefront_regions::RegionLister;

use crate::step::{StepData, WorkflowError, WorkflowStep};

/// Data aliases read by [`AttachRegion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aliases {
    Region,
}

impl Aliases {
    pub const ALL: &'static [Aliases] = &[Aliases::Region];

    pub const fn as_str(self) -> &'static str {
        match self {
            Aliases::Region => "region",
        }
    }
}

/// Input wired under [`Aliases::Region`].
///
/// `None` means "not provided", and so does an explicit `"region_id": null`
/// in JSON: both fall back to the first region. `Some("")` is provided and
/// passed through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInput {
    #[serde(default)]
    pub region_id: Option<String>,
}

/// Output consumed by later cart-creation steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
}

pub const REGION_REQUIRED: &str = "A region is required to create a cart";

/// Use the requested region, or fall back to the first region the lister
/// returns. Which region is "first" is whatever order the lister defines.
pub async fn attach_region<L>(regions: &L, input: RegionInput) -> ServiceResult<RegionDto>
where
    L: RegionLister + ?Sized,
{
    let region_id = match input.region_id {
        Some(id) => id,
        None => {
            let first = regions
                .list(&Filter::default(), &FindConfig::default())
                .await?
                .into_iter()
                .next();
            match first {
                Some(region) => {
                    debug!(region_id = %region.id, "defaulted cart region");
                    region.id
                }
                None => {
                    warn!("no regions configured; cannot create cart");
                    return Err(DomainError::invalid_data(REGION_REQUIRED).into());
                }
            }
        }
    };

    Ok(RegionDto {
        region_id: Some(region_id),
    })
}

/// Workflow step wrapper around [`attach_region`].
#[derive(Debug, Clone)]
pub struct AttachRegion<L> {
    regions: L,
}

impl<L> AttachRegion<L> {
    pub fn new(regions: L) -> Self {
        Self { regions }
    }
}

#[async_trait]
impl<L> WorkflowStep for AttachRegion<L>
where
    L: RegionLister,
{
    const NAME: &'static str = "cart.attach_region";
    const ALIASES: &'static [&'static str] = &[Aliases::Region.as_str()];

    type Output = RegionDto;

    async fn invoke(&self, data: &StepData) -> Result<RegionDto, WorkflowError> {
        let input: RegionInput = data.get(Self::NAME, Aliases::Region.as_str())?;
        Ok(attach_region(&self.regions, input).await?)
    }
}
