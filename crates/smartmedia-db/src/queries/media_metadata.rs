//! Media metadata query operations.
//!
//! Rows are produced by the upstream metadata extraction stage. The conversion
//! backfill reads files that have metadata but no conversion record yet, and
//! cost estimation reads the stream layout of a single file.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use smartmedia_common::{ContentHash, Error, PathHash, Result};

use crate::models::MediaMetadata;

const METADATA_COLUMNS: &str =
    "m.path_hash, m.content_hash, m.height, m.duration_secs, m.video_streams, m.audio_streams";

fn row_to_metadata(row: &Row) -> rusqlite::Result<MediaMetadata> {
    Ok(MediaMetadata {
        path_hash: PathHash::new(row.get::<_, String>(0)?),
        content_hash: ContentHash::new(row.get::<_, String>(1)?),
        height: row.get(2)?,
        duration_secs: row.get(3)?,
        video_streams: row.get(4)?,
        audio_streams: row.get(5)?,
    })
}

/// Insert or replace the metadata for a stored file.
pub fn upsert_metadata(conn: &Connection, metadata: &MediaMetadata) -> Result<()> {
    conn.execute(
        "INSERT INTO media_metadata
            (path_hash, content_hash, height, duration_secs, video_streams, audio_streams, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(path_hash) DO UPDATE SET
            content_hash = excluded.content_hash,
            height = excluded.height,
            duration_secs = excluded.duration_secs,
            video_streams = excluded.video_streams,
            audio_streams = excluded.audio_streams",
        params![
            metadata.path_hash.as_str(),
            metadata.content_hash.as_str(),
            metadata.height,
            metadata.duration_secs,
            metadata.video_streams,
            metadata.audio_streams,
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Get the metadata for a stored file.
pub fn get_metadata(conn: &Connection, path_hash: &PathHash) -> Result<Option<MediaMetadata>> {
    conn.query_row(
        &format!("SELECT {METADATA_COLUMNS} FROM media_metadata m WHERE m.path_hash = ?"),
        [path_hash.as_str()],
        row_to_metadata,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List stored files with extracted metadata whose content has no conversion
/// record.
///
/// Metadata rows without a `stored_files` entry are skipped, so they never
/// hold back the files behind them.
pub fn list_without_conversion(conn: &Connection, limit: usize) -> Result<Vec<MediaMetadata>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {METADATA_COLUMNS}
             FROM media_metadata m
             JOIN stored_files s ON s.path_hash = m.path_hash
             LEFT JOIN conversions c ON m.content_hash = c.content_hash
             WHERE c.content_hash IS NULL
             ORDER BY m.id ASC
             LIMIT ?"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([limit as i64], row_to_metadata)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(rows)
}
