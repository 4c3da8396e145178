//! Preset selection query operations.
//!
//! Each conversion stores the transcoding preset ids that were configured when
//! it was created, one row per preset, so later configuration changes do not
//! alter what an in-flight conversion asks for.

use rusqlite::{params, Connection};
use smartmedia_common::{ConversionId, Error, Result};

/// Insert one preset row per id for a conversion.
pub fn insert_presets(conn: &Connection, conversion_id: ConversionId, preset_ids: &[String]) -> Result<()> {
    let mut stmt = conn
        .prepare("INSERT INTO conversion_presets (conversion_id, preset) VALUES (?, ?)")
        .map_err(|e| Error::database(e.to_string()))?;

    for preset in preset_ids {
        stmt.execute(params![conversion_id.get(), preset])
            .map_err(|e| Error::database(e.to_string()))?;
    }

    Ok(())
}

/// List the preset ids selected for a conversion, in insertion order.
pub fn list_presets(conn: &Connection, conversion_id: ConversionId) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT preset FROM conversion_presets WHERE conversion_id = ? ORDER BY id ASC")
        .map_err(|e| Error::database(e.to_string()))?;

    let presets = stmt
        .query_map([conversion_id.get()], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(presets)
}
