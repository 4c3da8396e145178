//! Per-region price catalog.

use serde::{Deserialize, Serialize};
use smartmedia_common::{Error, Result};
use std::fmt;

/// Billing class of a transcoding output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTier {
    Audio,
    StandardDefinition,
    HighDefinition,
}

impl ServiceTier {
    pub const ALL: [ServiceTier; 3] = [
        ServiceTier::StandardDefinition,
        ServiceTier::HighDefinition,
        ServiceTier::Audio,
    ];
}

impl fmt::Display for ServiceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::StandardDefinition => write!(f, "standard definition"),
            Self::HighDefinition => write!(f, "high definition"),
        }
    }
}

/// Resolved per-minute transcoding prices for one region.
///
/// A tier whose price was never set, or was set to a negative or non-finite
/// amount, is invalid and cannot be used to calculate a cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationPricing {
    region: String,
    standard_definition: Option<f64>,
    high_definition: Option<f64>,
    audio: Option<f64>,
}

impl LocationPricing {
    /// Create an empty catalog for a region.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            standard_definition: None,
            high_definition: None,
            audio: None,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn set_standard_definition_price(&mut self, amount: f64) {
        self.standard_definition = Some(amount);
    }

    pub fn set_high_definition_price(&mut self, amount: f64) {
        self.high_definition = Some(amount);
    }

    pub fn set_audio_price(&mut self, amount: f64) {
        self.audio = Some(amount);
    }

    /// Set the price of a tier, replacing any earlier price.
    pub fn set_price(&mut self, tier: ServiceTier, amount: f64) {
        match tier {
            ServiceTier::StandardDefinition => self.set_standard_definition_price(amount),
            ServiceTier::HighDefinition => self.set_high_definition_price(amount),
            ServiceTier::Audio => self.set_audio_price(amount),
        }
    }

    /// The raw price of a tier, valid or not.
    pub fn price(&self, tier: ServiceTier) -> Option<f64> {
        match tier {
            ServiceTier::StandardDefinition => self.standard_definition,
            ServiceTier::HighDefinition => self.high_definition,
            ServiceTier::Audio => self.audio,
        }
    }

    pub fn has_valid_pricing(&self, tier: ServiceTier) -> bool {
        self.price(tier)
            .is_some_and(|amount| amount.is_finite() && amount >= 0.0)
    }

    pub fn has_valid_standard_definition_pricing(&self) -> bool {
        self.has_valid_pricing(ServiceTier::StandardDefinition)
    }

    pub fn has_valid_high_definition_pricing(&self) -> bool {
        self.has_valid_pricing(ServiceTier::HighDefinition)
    }

    pub fn has_valid_audio_pricing(&self) -> bool {
        self.has_valid_pricing(ServiceTier::Audio)
    }

    /// Cost of `duration_minutes` of output in a tier.
    ///
    /// Fails with [`Error::InvalidPricing`] when the tier has no valid price.
    pub fn calculate_cost(&self, tier: ServiceTier, duration_minutes: f64) -> Result<f64> {
        match self.price(tier) {
            Some(amount) if self.has_valid_pricing(tier) => Ok(amount * duration_minutes),
            _ => Err(Error::invalid_pricing(tier.to_string(), &self.region)),
        }
    }

    pub fn calculate_standard_definition_cost(&self, duration_minutes: f64) -> Result<f64> {
        self.calculate_cost(ServiceTier::StandardDefinition, duration_minutes)
    }

    pub fn calculate_high_definition_cost(&self, duration_minutes: f64) -> Result<f64> {
        self.calculate_cost(ServiceTier::HighDefinition, duration_minutes)
    }

    pub fn calculate_audio_cost(&self, duration_minutes: f64) -> Result<f64> {
        self.calculate_cost(ServiceTier::Audio, duration_minutes)
    }
}
