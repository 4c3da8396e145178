//! Transcoding cost calculation.
//!
//! The remote transcoder bills each output file in whole minutes, so source
//! durations are rounded up before pricing. Every preset is billed on its own
//! and the contributions are summed.

use smartmedia_common::Result;

use super::{is_input_high_definition, is_input_video, LocationPricing, ServiceTier, TranscodePreset};

/// Tier billed for producing one preset's output from a source, if any.
///
/// - Standard definition output needs a video source with a video stream.
/// - High definition output is billed as high definition from a high
///   definition source, as standard definition from a lower resolution video
///   source, and not at all without video.
/// - Audio output needs an audio stream.
pub fn preset_charge(
    preset: &TranscodePreset,
    source_height: u32,
    video_streams: u32,
    audio_streams: u32,
) -> Option<ServiceTier> {
    match preset.tier() {
        ServiceTier::StandardDefinition
            if is_input_video(source_height) && video_streams > 0 =>
        {
            Some(ServiceTier::StandardDefinition)
        }
        ServiceTier::HighDefinition if video_streams > 0 => {
            if is_input_high_definition(source_height) {
                Some(ServiceTier::HighDefinition)
            } else if is_input_video(source_height) {
                Some(ServiceTier::StandardDefinition)
            } else {
                None
            }
        }
        ServiceTier::Audio if audio_streams > 0 => Some(ServiceTier::Audio),
        _ => None,
    }
}

/// Total cost of transcoding a source into every preset.
///
/// Returns `Ok(None)` when no presets are selected, since nothing would be
/// transcoded. Fails with `InvalidPricing` if a preset is billed in a tier the
/// catalog has no valid price for.
pub fn calculate_cost(
    source_height: u32,
    duration_secs: f64,
    video_streams: u32,
    audio_streams: u32,
    presets: &[TranscodePreset],
    pricing: &LocationPricing,
) -> Result<Option<f64>> {
    if presets.is_empty() {
        return Ok(None);
    }

    let duration_minutes = (duration_secs / 60.0).ceil();

    let mut cost = 0.0;
    for preset in presets {
        if let Some(tier) = preset_charge(preset, source_height, video_streams, audio_streams) {
            cost += pricing.calculate_cost(tier, duration_minutes)?;
        }
    }

    Ok(Some(cost))
}

/// Cost calculator bound to a region's catalog and a preset selection.
#[derive(Debug, Clone)]
pub struct PricingCalculator {
    pricing: LocationPricing,
    presets: Vec<TranscodePreset>,
}

impl PricingCalculator {
    pub fn new(pricing: LocationPricing, presets: Vec<TranscodePreset>) -> Self {
        Self { pricing, presets }
    }

    pub fn region(&self) -> &str {
        self.pricing.region()
    }

    pub fn presets(&self) -> &[TranscodePreset] {
        &self.presets
    }

    pub fn has_presets(&self) -> bool {
        !self.presets.is_empty()
    }

    pub fn is_standard_definition_pricing_valid(&self) -> bool {
        self.pricing.has_valid_standard_definition_pricing()
    }

    pub fn is_high_definition_pricing_valid(&self) -> bool {
        self.pricing.has_valid_high_definition_pricing()
    }

    pub fn is_audio_pricing_valid(&self) -> bool {
        self.pricing.has_valid_audio_pricing()
    }

    /// See [`calculate_cost`].
    pub fn calculate_transcode_cost(
        &self,
        source_height: u32,
        duration_secs: f64,
        video_streams: u32,
        audio_streams: u32,
    ) -> Result<Option<f64>> {
        calculate_cost(
            source_height,
            duration_secs,
            video_streams,
            audio_streams,
            &self.presets,
            &self.pricing,
        )
    }
}
