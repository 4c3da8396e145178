//! Conversion record query operations.
//!
//! Records are created once per path hash and afterwards only move forward
//! through guarded updates: every write names the aggregate status and the
//! modification time it read, so two processes racing on one record cannot
//! both win.

use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use smartmedia_common::{
    ContentHash, ConversionId, ConversionStatus, Error, PathHash, Result, Service,
};

use super::{is_unique_violation, parse_column, parse_timestamp, presets};
use crate::models::{status_column, ConversionRecord, ServiceStatuses};

const CONVERSION_COLUMNS: &str = "id, path_hash, content_hash, status,
    transcoding_status, transcription_status, label_detection_status,
    moderation_detection_status, face_detection_status, person_tracking_status,
    sentiment_detection_status, phrase_detection_status, entity_detection_status,
    created_at, modified_at, completed_at";

fn row_to_conversion(row: &Row) -> rusqlite::Result<ConversionRecord> {
    let status_at = |idx: usize| -> rusqlite::Result<ConversionStatus> {
        parse_column(idx, &row.get::<_, String>(idx)?)
    };

    Ok(ConversionRecord {
        id: ConversionId::from(row.get::<_, i64>(0)?),
        path_hash: PathHash::new(row.get::<_, String>(1)?),
        content_hash: ContentHash::new(row.get::<_, String>(2)?),
        status: status_at(3)?,
        services: ServiceStatuses {
            transcoding: status_at(4)?,
            transcription: status_at(5)?,
            label_detection: status_at(6)?,
            moderation_detection: status_at(7)?,
            face_detection: status_at(8)?,
            person_tracking: status_at(9)?,
            sentiment_detection: status_at(10)?,
            phrase_detection: status_at(11)?,
            entity_detection: status_at(12)?,
        },
        created_at: parse_timestamp(13, &row.get::<_, String>(13)?)?,
        modified_at: parse_timestamp(14, &row.get::<_, String>(14)?)?,
        completed_at: row
            .get::<_, Option<String>>(15)?
            .map(|s| parse_timestamp(15, &s))
            .transpose()?,
    })
}

/// Create a conversion record together with its preset selection.
///
/// The record and its preset rows are written in one transaction. If a record
/// already exists for the path hash or the content hash, nothing is written
/// and [`Error::Duplicate`] is returned.
pub fn create_conversion(
    conn: &Connection,
    path_hash: &PathHash,
    content_hash: &ContentHash,
    services: &ServiceStatuses,
    preset_ids: &[String],
) -> Result<ConversionRecord> {
    let now = Utc::now();
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    tx.execute(
        "INSERT INTO conversions (path_hash, content_hash, status,
            transcoding_status, transcription_status, label_detection_status,
            moderation_detection_status, face_detection_status, person_tracking_status,
            sentiment_detection_status, phrase_detection_status, entity_detection_status,
            created_at, modified_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            path_hash.as_str(),
            content_hash.as_str(),
            ConversionStatus::Accepted.to_string(),
            services.transcoding.to_string(),
            services.transcription.to_string(),
            services.label_detection.to_string(),
            services.moderation_detection.to_string(),
            services.face_detection.to_string(),
            services.person_tracking.to_string(),
            services.sentiment_detection.to_string(),
            services.phrase_detection.to_string(),
            services.entity_detection.to_string(),
            now.to_rfc3339(),
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::duplicate(format!(
                "conversion for path {} / content {}",
                path_hash, content_hash
            ))
        } else {
            Error::database(e.to_string())
        }
    })?;

    let id = ConversionId::from(tx.last_insert_rowid());
    presets::insert_presets(&tx, id, preset_ids)?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    Ok(ConversionRecord {
        id,
        path_hash: path_hash.clone(),
        content_hash: content_hash.clone(),
        status: ConversionStatus::Accepted,
        services: *services,
        created_at: now,
        modified_at: now,
        completed_at: None,
    })
}

/// Get a conversion record by ID.
pub fn get_conversion(conn: &Connection, id: ConversionId) -> Result<ConversionRecord> {
    conn.query_row(
        &format!("SELECT {CONVERSION_COLUMNS} FROM conversions WHERE id = ?"),
        [id.get()],
        row_to_conversion,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Error::not_found(format!("conversion {}", id)),
        _ => Error::database(e.to_string()),
    })
}

/// Find the conversion record for a stored file, if one exists.
pub fn find_by_path_hash(
    conn: &Connection,
    path_hash: &PathHash,
) -> Result<Option<ConversionRecord>> {
    conn.query_row(
        &format!("SELECT {CONVERSION_COLUMNS} FROM conversions WHERE path_hash = ?"),
        [path_hash.as_str()],
        row_to_conversion,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Get only the aggregate status for a stored file.
pub fn status_for_path_hash(
    conn: &Connection,
    path_hash: &PathHash,
) -> Result<Option<ConversionStatus>> {
    conn.query_row(
        "SELECT status FROM conversions WHERE path_hash = ?",
        [path_hash.as_str()],
        |row| parse_column(0, &row.get::<_, String>(0)?),
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List conversion records with the given aggregate status, oldest first.
pub fn list_by_status(
    conn: &Connection,
    status: ConversionStatus,
    limit: usize,
) -> Result<Vec<ConversionRecord>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {CONVERSION_COLUMNS} FROM conversions
             WHERE status = ?
             ORDER BY id ASC
             LIMIT ?"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let records = stmt
        .query_map(params![status.to_string(), limit as i64], row_to_conversion)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(records)
}

/// Persist a record's statuses, guarded by the state it was read in.
///
/// Writes the aggregate status, every per-service status and the completion
/// time. Returns `false` without writing when the stored aggregate status is
/// no longer `expected` or the row was modified after `record` was read,
/// i.e. another process saved the record first.
pub fn save_statuses(
    conn: &Connection,
    record: &ConversionRecord,
    expected: ConversionStatus,
) -> Result<bool> {
    let service_columns: Vec<String> = Service::ALL
        .iter()
        .map(|s| format!("{} = ?", status_column(*s)))
        .collect();
    let sql = format!(
        "UPDATE conversions SET status = ?, {}, modified_at = ?, completed_at = ?
         WHERE id = ? AND status = ? AND modified_at = ?",
        service_columns.join(", ")
    );

    // Strictly later than the value read, so a stale copy never matches again.
    let modified_at = Utc::now().max(record.modified_at + Duration::microseconds(1));

    let mut values: Vec<Value> = Vec::with_capacity(Service::ALL.len() + 6);
    values.push(Value::Text(record.status.to_string()));
    values.extend(
        record
            .services
            .iter()
            .map(|(_, status)| Value::Text(status.to_string())),
    );
    values.push(Value::Text(modified_at.to_rfc3339()));
    values.push(
        record
            .completed_at
            .map(|t: DateTime<Utc>| Value::Text(t.to_rfc3339()))
            .unwrap_or(Value::Null),
    );
    values.push(Value::Integer(record.id.get()));
    values.push(Value::Text(expected.to_string()));
    values.push(Value::Text(record.modified_at.to_rfc3339()));

    let affected = conn
        .execute(&sql, params_from_iter(values))
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(affected > 0)
}

/// Count all conversion records.
pub fn count_conversions(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM conversions", [], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))
}
