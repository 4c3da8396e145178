//! Transcoding cost estimates for existing conversions.

use std::collections::BTreeMap;

use serde::Serialize;
use smartmedia_common::{Error, PathHash, Result};
use smartmedia_db::pool::{get_conn, DbPool};
use smartmedia_db::queries::{conversions, media_metadata, presets};

use crate::pricing::{LocationPricing, PricingCalculator, TranscodePreset};

/// Known transcode presets, by id.
#[derive(Debug, Clone, Default)]
pub struct PresetCatalog {
    presets: BTreeMap<String, TranscodePreset>,
}

impl PresetCatalog {
    pub fn new(presets: impl IntoIterator<Item = TranscodePreset>) -> Self {
        Self {
            presets: presets.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&TranscodePreset> {
        self.presets.get(id)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Look up every id, failing on the first unknown one.
    pub fn resolve(&self, ids: &[String]) -> Result<Vec<TranscodePreset>> {
        ids.iter()
            .map(|id| {
                self.get(id)
                    .cloned()
                    .ok_or_else(|| Error::invalid_input(format!("Unknown transcode preset: {}", id)))
            })
            .collect()
    }
}

/// Estimated cost of one conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordEstimate {
    pub path_hash: PathHash,
    pub region: String,
    pub presets: Vec<String>,
    /// `None` when the conversion has no presets.
    pub cost: Option<f64>,
}

/// Prices conversions from their preset rows and the file's media metadata.
pub struct CostEstimator {
    pool: DbPool,
    catalog: PresetCatalog,
    pricing: LocationPricing,
}

impl CostEstimator {
    pub fn new(pool: DbPool, catalog: PresetCatalog, pricing: LocationPricing) -> Self {
        Self {
            pool,
            catalog,
            pricing,
        }
    }

    pub fn estimate_record(&self, path_hash: &PathHash) -> Result<RecordEstimate> {
        let conn = get_conn(&self.pool)?;

        let record = conversions::find_by_path_hash(&conn, path_hash)?
            .ok_or_else(|| Error::not_found(format!("conversion for {}", path_hash)))?;
        let preset_ids = presets::list_presets(&conn, record.id)?;
        let metadata = media_metadata::get_metadata(&conn, path_hash)?
            .ok_or_else(|| Error::not_found(format!("media metadata for {}", path_hash)))?;

        let calculator = PricingCalculator::new(self.pricing.clone(), self.catalog.resolve(&preset_ids)?);
        let cost = calculator.calculate_transcode_cost(
            metadata.height,
            metadata.duration_secs,
            metadata.video_streams,
            metadata.audio_streams,
        )?;

        Ok(RecordEstimate {
            path_hash: path_hash.clone(),
            region: self.pricing.region().to_string(),
            presets: preset_ids,
            cost,
        })
    }
}
