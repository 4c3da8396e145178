//! Transcoding cost estimation.
//!
//! Pricing is expressed per output minute for three service tiers. A
//! [`LocationPricing`] catalog holds the resolved prices for one region,
//! [`TranscodePreset`] classifies an output preset into a tier, and
//! [`PricingCalculator`] combines both with a source file's height, duration
//! and stream counts.

mod calculator;
mod catalog;
mod preset;
mod source;

pub use calculator::{calculate_cost, preset_charge, PricingCalculator};
pub use catalog::{LocationPricing, ServiceTier};
pub use preset::{
    is_input_high_definition, is_input_video, TranscodePreset, VideoOutput,
    HIGH_DEFINITION_MIN_HEIGHT,
};
pub use source::{
    load_location_pricing, region_location, PricingSource, RegionPrices, StaticPricingSource,
    REGION_LOCATIONS,
};
