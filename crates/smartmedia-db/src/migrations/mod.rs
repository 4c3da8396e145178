//! Embedded schema migrations.
//!
//! The applied version is tracked in SQLite's `user_version` pragma; each
//! pending migration runs in its own transaction.

use rusqlite::Connection;
use smartmedia_common::{Error, Result};

/// Ordered schema migrations; the version of entry `i` is `i + 1`.
const MIGRATIONS: &[(&str, &str)] = &[("initial", include_str!("001_initial.sql"))];

fn schema_version(conn: &Connection) -> Result<usize> {
    conn.query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))
        .map(|v| v.max(0) as usize)
        .map_err(|e| Error::database(e.to_string()))
}

/// Apply every migration newer than the database's schema version.
///
/// Returns the number of migrations applied; zero for an up-to-date database.
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    conn.execute_batch("PRAGMA foreign_keys = ON")
        .map_err(|e| Error::database(e.to_string()))?;

    let current = schema_version(conn)?;
    let mut applied = 0;
    for (idx, (name, sql)) in MIGRATIONS.iter().enumerate().skip(current) {
        let version = idx + 1;
        let failed = |e: rusqlite::Error| {
            Error::database(format!("Migration {} ({}) failed: {}", version, name, e))
        };

        let tx = conn.unchecked_transaction().map_err(failed)?;
        tx.execute_batch(sql).map_err(failed)?;
        tx.pragma_update(None, "user_version", version as i64)
            .map_err(failed)?;
        tx.commit().map_err(failed)?;
        applied += 1;
    }

    Ok(applied)
}
