//! Runtime settings for the conversion batches.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use smartmedia_common::Service;

/// Default number of records handled per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Which optional services new conversions request. Transcoding is always on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSelection {
    enabled: BTreeSet<Service>,
}

impl ServiceSelection {
    /// Only transcoding.
    pub fn transcoding_only() -> Self {
        Self::default()
    }

    /// Every optional service.
    pub fn all() -> Self {
        Self::only(Service::OPTIONAL)
    }

    pub fn only(services: impl IntoIterator<Item = Service>) -> Self {
        Self {
            enabled: services
                .into_iter()
                .filter(|s| *s != Service::Transcoding)
                .collect(),
        }
    }

    pub fn is_enabled(&self, service: Service) -> bool {
        service == Service::Transcoding || self.enabled.contains(&service)
    }

    /// Enabled optional services, in flag order.
    pub fn optional(&self) -> impl Iterator<Item = Service> + '_ {
        Service::OPTIONAL.into_iter().filter(|s| self.enabled.contains(s))
    }
}

/// Settings shared by all batch operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Installation identifier sent with every dispatch.
    pub site_id: String,
    pub services: ServiceSelection,
    /// Transcode presets every new conversion is created with.
    pub preset_ids: Vec<String>,
    pub batch_size: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            site_id: String::new(),
            services: ServiceSelection::transcoding_only(),
            preset_ids: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Split a comma-separated preset id list, dropping blanks and repeats.
pub fn parse_preset_ids(raw: &str) -> Vec<String> {
    normalize_preset_ids(raw.split(','))
}

/// Trim preset ids, dropping blanks and repeats while keeping first-seen order.
pub fn normalize_preset_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for id in ids {
        let id = id.as_ref().trim();
        if !id.is_empty() && !normalized.iter().any(|existing| existing == id) {
            normalized.push(id.to_string());
        }
    }
    normalized
}
