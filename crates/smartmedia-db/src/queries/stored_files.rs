//! Stored file index query operations.
//!
//! The local blob store keeps file bytes on disk and indexes them here by
//! path hash and content hash.

use rusqlite::{params, Connection, OptionalExtension, Row};
use smartmedia_common::{ContentHash, Error, PathHash, Result};

use super::parse_timestamp;
use crate::models::StoredFile;

const FILE_COLUMNS: &str = "path_hash, content_hash, path, size, created_at";

fn row_to_file(row: &Row) -> rusqlite::Result<StoredFile> {
    Ok(StoredFile {
        path_hash: PathHash::new(row.get::<_, String>(0)?),
        content_hash: ContentHash::new(row.get::<_, String>(1)?),
        path: row.get(2)?,
        size: row.get::<_, i64>(3)? as u64,
        created_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
    })
}

/// Insert a file, replacing the content of an existing file at the same path.
pub fn upsert_stored_file(conn: &Connection, file: &StoredFile) -> Result<()> {
    conn.execute(
        "INSERT INTO stored_files (path_hash, content_hash, path, size, created_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(path_hash) DO UPDATE SET
            content_hash = excluded.content_hash,
            size = excluded.size",
        params![
            file.path_hash.as_str(),
            file.content_hash.as_str(),
            file.path,
            file.size as i64,
            file.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Get a file by path hash.
pub fn get_by_path_hash(conn: &Connection, path_hash: &PathHash) -> Result<Option<StoredFile>> {
    conn.query_row(
        &format!("SELECT {FILE_COLUMNS} FROM stored_files WHERE path_hash = ?"),
        [path_hash.as_str()],
        row_to_file,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Get the oldest file with the given content.
pub fn get_by_content_hash(
    conn: &Connection,
    content_hash: &ContentHash,
) -> Result<Option<StoredFile>> {
    conn.query_row(
        &format!(
            "SELECT {FILE_COLUMNS} FROM stored_files
             WHERE content_hash = ?
             ORDER BY created_at ASC
             LIMIT 1"
        ),
        [content_hash.as_str()],
        row_to_file,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List files whose path starts with `prefix`, ordered by path.
pub fn list_by_path_prefix(conn: &Connection, prefix: &str) -> Result<Vec<StoredFile>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM stored_files
             WHERE substr(path, 1, length(?1)) = ?1
             ORDER BY path ASC"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let files = stmt
        .query_map([prefix], row_to_file)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(files)
}
