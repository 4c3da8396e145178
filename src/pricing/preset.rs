//! Output preset classification.

use serde::{Deserialize, Serialize};

use super::ServiceTier;

/// Smallest frame height billed as high definition, for outputs and inputs alike.
pub const HIGH_DEFINITION_MIN_HEIGHT: u32 = 720;

/// Returns `true` if a source of this height is high definition.
pub fn is_input_high_definition(source_height: u32) -> bool {
    source_height >= HIGH_DEFINITION_MIN_HEIGHT
}

/// Returns `true` if the source has a picture. Zero height means audio only.
pub fn is_input_video(source_height: u32) -> bool {
    source_height > 0
}

/// Video stream settings of an output preset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoOutput {
    /// Maximum output height. `None` keeps the source height ("auto").
    #[serde(default)]
    pub max_height: Option<u32>,

    #[serde(default)]
    pub max_width: Option<u32>,

    #[serde(default)]
    pub codec: Option<String>,
}

/// A named transcoding output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodePreset {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Output container, e.g. `ts`, `fmp4`, `mp3`.
    #[serde(default)]
    pub container: String,

    /// Absent for audio-only presets.
    #[serde(default)]
    pub video: Option<VideoOutput>,
}

impl TranscodePreset {
    /// Billing tier of this preset's output.
    ///
    /// A video preset with no maximum height follows the source resolution
    /// and is treated as high definition output.
    pub fn tier(&self) -> ServiceTier {
        match &self.video {
            None => ServiceTier::Audio,
            Some(VideoOutput {
                max_height: Some(height),
                ..
            }) if *height < HIGH_DEFINITION_MIN_HEIGHT => ServiceTier::StandardDefinition,
            Some(_) => ServiceTier::HighDefinition,
        }
    }

    pub fn is_output_audio(&self) -> bool {
        self.tier() == ServiceTier::Audio
    }

    pub fn is_output_standard_definition(&self) -> bool {
        self.tier() == ServiceTier::StandardDefinition
    }

    pub fn is_output_high_definition(&self) -> bool {
        self.tier() == ServiceTier::HighDefinition
    }
}
