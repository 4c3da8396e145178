use serde::{Deserialize, Deserializer, Serialize};
use smartmedia_common::Service;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::conversion::{
    normalize_preset_ids, parse_preset_ids, OrchestratorSettings, ServiceSelection,
    DEFAULT_BATCH_SIZE,
};
use crate::pricing::{RegionPrices, TranscodePreset};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Identifies this installation to the remote pipeline.
    #[serde(default = "default_site_id")]
    pub site_id: String,

    /// Holds the database and the blob store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Records handled per batch operation.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub services: ServicesConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub pricing: PricingConfig,

    /// Preset catalog used for cost estimation.
    #[serde(default)]
    pub presets: Vec<TranscodePreset>,
}

fn default_site_id() -> String {
    "smartmedia".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            data_dir: default_data_dir(),
            batch_size: default_batch_size(),
            services: ServicesConfig::default(),
            transcode: TranscodeConfig::default(),
            remote: RemoteConfig::default(),
            pricing: PricingConfig::default(),
            presets: Vec::new(),
        }
    }
}

impl Config {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("smartmedia.db")
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("files")
    }

    /// Settings handed to the conversion orchestrator.
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            site_id: self.site_id.clone(),
            services: self.services.selection(),
            preset_ids: self.transcode.presets.clone(),
            batch_size: self.batch_size,
        }
    }
}

/// Which optional services new conversions request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub transcribe: bool,
    #[serde(default)]
    pub detect_labels: bool,
    #[serde(default)]
    pub detect_moderation: bool,
    #[serde(default)]
    pub detect_faces: bool,
    #[serde(default)]
    pub detect_people: bool,
    #[serde(default)]
    pub detect_sentiment: bool,
    #[serde(default)]
    pub detect_phrases: bool,
    #[serde(default)]
    pub detect_entities: bool,
}

impl ServicesConfig {
    pub fn is_enabled(&self, service: Service) -> bool {
        match service {
            Service::Transcoding => true,
            Service::Transcription => self.transcribe,
            Service::LabelDetection => self.detect_labels,
            Service::ModerationDetection => self.detect_moderation,
            Service::FaceDetection => self.detect_faces,
            Service::PersonTracking => self.detect_people,
            Service::SentimentDetection => self.detect_sentiment,
            Service::PhraseDetection => self.detect_phrases,
            Service::EntityDetection => self.detect_entities,
        }
    }

    pub fn selection(&self) -> ServiceSelection {
        ServiceSelection::only(Service::OPTIONAL.into_iter().filter(|s| self.is_enabled(*s)))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Preset ids requested for every new conversion.
    #[serde(default, deserialize_with = "deserialize_preset_ids")]
    pub presets: Vec<String>,
}

/// Accepts either a list of ids or a single comma-separated string; both
/// forms drop blanks and repeats.
fn deserialize_preset_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PresetIds {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match PresetIds::deserialize(deserializer)? {
        PresetIds::List(ids) => normalize_preset_ids(ids),
        PresetIds::Joined(raw) => parse_preset_ids(&raw),
    })
}

/// Local directories standing in for the remote buckets.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("./bucket/input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./bucket/output")
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
    #[serde(default = "default_region")]
    pub region: String,

    /// Per-minute prices keyed by region.
    #[serde(default)]
    pub prices: HashMap<String, RegionPrices>,
}

fn default_region() -> String {
    "ap-southeast-2".to_string()
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            prices: HashMap::new(),
        }
    }
}
