mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

use crate::pricing::{region_location, ServiceTier};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./smartmedia.toml",
        "~/.config/smartmedia/config.toml",
        "/etc/smartmedia/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.site_id.trim().is_empty() {
        anyhow::bail!("site_id cannot be empty");
    }

    if config.batch_size == 0 {
        anyhow::bail!("batch_size cannot be 0");
    }

    if config.transcode.presets.iter().any(|id| id.is_empty()) {
        anyhow::bail!("Transcode preset ids cannot be blank");
    }

    if region_location(&config.pricing.region).is_none() {
        anyhow::bail!("Unsupported pricing region '{}'", config.pricing.region);
    }

    for (region, prices) in &config.pricing.prices {
        for tier in ServiceTier::ALL {
            if let Some(price) = prices.get(tier) {
                if !price.is_finite() || price < 0.0 {
                    anyhow::bail!("Invalid {} price for region '{}': {}", tier, region, price);
                }
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    for preset in &config.presets {
        if preset.id.trim().is_empty() {
            anyhow::bail!("Preset '{}' has no id", preset.name);
        }
        if !seen.insert(preset.id.as_str()) {
            anyhow::bail!("Preset '{}' is defined more than once", preset.id);
        }
    }

    // Requested presets without a catalog entry can still be dispatched but not priced.
    for id in &config.transcode.presets {
        if !config.presets.iter().any(|p| &p.id == id) {
            tracing::warn!("Transcode preset {} has no catalog entry", id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::DEFAULT_BATCH_SIZE;
    use smartmedia_common::Service;
    use std::io::Write;

    const SAMPLE: &str = r#"
site_id = "moodle-1"
data_dir = "/var/lib/smartmedia"
batch_size = 50

[services]
detect_labels = true
transcribe = true

[transcode]
presets = "1351620000001-200045, 1351620000001-300040"

[pricing]
region = "ap-southeast-2"

[pricing.prices.ap-southeast-2]
standard_definition = 0.017
high_definition = 0.034
audio = 0.00522

[[presets]]
id = "1351620000001-200045"
name = "HLS 400k"
container = "ts"
video = { max_height = 288, max_width = 400 }

[[presets]]
id = "1351620000001-300040"
name = "MP3 128k"
container = "mp3"
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_sample_config() {
        let file = write_config(SAMPLE);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.site_id, "moodle-1");
        assert_eq!(config.batch_size, 50);
        assert_eq!(
            config.transcode.presets,
            vec!["1351620000001-200045", "1351620000001-300040"]
        );
        assert_eq!(config.presets.len(), 2);
        assert!(config.presets[1].video.is_none());
        assert_eq!(
            config.pricing.prices["ap-southeast-2"].get(ServiceTier::HighDefinition),
            Some(0.034)
        );

        let settings = config.orchestrator_settings();
        assert!(settings.services.is_enabled(Service::LabelDetection));
        assert!(settings.services.is_enabled(Service::Transcription));
        assert!(!settings.services.is_enabled(Service::FaceDetection));
        assert!(settings.services.is_enabled(Service::Transcoding));
    }

    #[test]
    fn test_preset_list_form() {
        let config: Config = toml::from_str("[transcode]\npresets = [\"a\", \"b\"]").unwrap();
        assert_eq!(config.transcode.presets, vec!["a", "b"]);
    }

    #[test]
    fn test_preset_forms_normalize_alike() {
        let list: Config =
            toml::from_str("[transcode]\npresets = [\"a\", \" a \", \"\", \"b\"]").unwrap();
        let joined: Config = toml::from_str("[transcode]\npresets = \"a, a,,b\"").unwrap();
        assert_eq!(list.transcode.presets, vec!["a", "b"]);
        assert_eq!(joined.transcode.presets, list.transcode.presets);
        assert!(validate_config(&list).is_ok());
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.pricing.region, "ap-southeast-2");
        assert!(config.transcode.presets.is_empty());
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.db_path(), Path::new("./data/smartmedia.db"));
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let file = write_config("batch_size = 0");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_rejects_unknown_region() {
        let config: Config = toml::from_str("[pricing]\nregion = \"mars-north-1\"").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_negative_price() {
        let config: Config =
            toml::from_str("[pricing.prices.us-east-1]\naudio = -1.0").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_duplicate_preset() {
        let config: Config = toml::from_str(
            "[[presets]]\nid = \"a\"\n\n[[presets]]\nid = \"a\"\n",
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_config(Path::new("/nonexistent/smartmedia.toml")).is_err());
    }
}
