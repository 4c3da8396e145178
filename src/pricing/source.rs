//! Price lookup.
//!
//! Prices come from an external pricing service keyed by region and tier.
//! [`StaticPricingSource`] answers lookups from the configuration file.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smartmedia_common::{Error, Result};

use super::{LocationPricing, ServiceTier};

/// Regions the transcoder is offered in, with the pricing location name of each.
pub const REGION_LOCATIONS: [(&str, &str); 8] = [
    ("us-east-1", "US East (N. Virginia)"),
    ("us-west-1", "US West (N. California)"),
    ("us-west-2", "US West (Oregon)"),
    ("ap-northeast-1", "Asia Pacific (Tokyo)"),
    ("ap-south-1", "Asia Pacific (Mumbai)"),
    ("ap-southeast-1", "Asia Pacific (Singapore)"),
    ("ap-southeast-2", "Asia Pacific (Sydney)"),
    ("eu-west-1", "EU (Ireland)"),
];

/// Pricing location name of a region, if the transcoder is offered there.
pub fn region_location(region: &str) -> Option<&'static str> {
    REGION_LOCATIONS
        .iter()
        .find(|(code, _)| *code == region)
        .map(|(_, location)| *location)
}

/// Looks up the per-minute price of a tier in a region.
pub trait PricingSource: Send + Sync {
    /// Returns `Ok(None)` when the source has no price for the tier.
    fn lookup_price(&self, region: &str, tier: ServiceTier) -> Result<Option<f64>>;
}

/// Per-minute prices of one region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionPrices {
    #[serde(default)]
    pub standard_definition: Option<f64>,

    #[serde(default)]
    pub high_definition: Option<f64>,

    #[serde(default)]
    pub audio: Option<f64>,
}

impl RegionPrices {
    pub fn get(&self, tier: ServiceTier) -> Option<f64> {
        match tier {
            ServiceTier::StandardDefinition => self.standard_definition,
            ServiceTier::HighDefinition => self.high_definition,
            ServiceTier::Audio => self.audio,
        }
    }
}

/// Pricing source backed by a fixed table of region prices.
#[derive(Debug, Clone, Default)]
pub struct StaticPricingSource {
    prices: HashMap<String, RegionPrices>,
}

impl StaticPricingSource {
    pub fn new(prices: HashMap<String, RegionPrices>) -> Self {
        Self { prices }
    }
}

impl PricingSource for StaticPricingSource {
    fn lookup_price(&self, region: &str, tier: ServiceTier) -> Result<Option<f64>> {
        Ok(self.prices.get(region).and_then(|p| p.get(tier)))
    }
}

/// Build the price catalog of a region, one lookup per tier.
///
/// Tiers the source has no price for stay invalid in the catalog.
pub fn load_location_pricing(source: &dyn PricingSource, region: &str) -> Result<LocationPricing> {
    if region_location(region).is_none() {
        return Err(Error::invalid_input(format!(
            "Transcoding is not offered in region {}",
            region
        )));
    }

    let mut pricing = LocationPricing::new(region);
    for tier in ServiceTier::ALL {
        if let Some(amount) = source.lookup_price(region, tier)? {
            pricing.set_price(tier, amount);
        }
    }

    tracing::debug!(
        region,
        sd = ?pricing.price(ServiceTier::StandardDefinition),
        hd = ?pricing.price(ServiceTier::HighDefinition),
        audio = ?pricing.price(ServiceTier::Audio),
        "Loaded location pricing"
    );

    Ok(pricing)
}
