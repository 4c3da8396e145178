//! Inbound queue message query operations.
//!
//! Messages are written by the external notification receiver. Reconciliation
//! reads the terminal ones for a content hash and marks each message processed
//! once applied, so a message is never applied twice.

use chrono::Utc;
use rusqlite::{params, params_from_iter, types::Value, Connection, Row};
use smartmedia_common::{ContentHash, Error, RemoteOutcome, Result, Service};

use super::{parse_timestamp, repeat_vars};
use crate::models::{NewQueueMessage, QueueMessage};

const MESSAGE_COLUMNS: &str =
    "id, message_id, process, status, object_key, body, received_at, processed_at";

fn row_to_message(row: &Row) -> rusqlite::Result<QueueMessage> {
    Ok(QueueMessage {
        id: row.get(0)?,
        message_id: row.get(1)?,
        process: row.get(2)?,
        status: row.get(3)?,
        object_key: ContentHash::new(row.get::<_, String>(4)?),
        body: row.get(5)?,
        received_at: parse_timestamp(6, &row.get::<_, String>(6)?)?,
        processed_at: row
            .get::<_, Option<String>>(7)?
            .map(|s| parse_timestamp(7, &s))
            .transpose()?,
    })
}

/// Record an inbound message. Redelivered message ids are ignored.
///
/// Returns `true` if the message was new.
pub fn insert_message(conn: &Connection, message: &NewQueueMessage) -> Result<bool> {
    let affected = conn
        .execute(
            "INSERT OR IGNORE INTO queue_messages
                (message_id, process, status, object_key, body, received_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                message.message_id,
                message.process,
                message.status,
                message.object_key.as_str(),
                message.body,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(affected > 0)
}

/// List unprocessed terminal messages for an object from the given services.
///
/// Only messages whose status carries an outcome are returned; progress and
/// warning notifications are left alone. Results are in arrival order.
pub fn list_pending(
    conn: &Connection,
    object_key: &ContentHash,
    services: &[Service],
) -> Result<Vec<QueueMessage>> {
    if services.is_empty() {
        return Ok(Vec::new());
    }

    let statuses: Vec<&str> = RemoteOutcome::terminal_statuses().collect();
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM queue_messages
         WHERE process IN ({})
           AND status IN ({})
           AND object_key = ?
           AND processed_at IS NULL
         ORDER BY received_at ASC, id ASC",
        repeat_vars(services.len()),
        repeat_vars(statuses.len()),
    );

    let values: Vec<Value> = services
        .iter()
        .map(|s| Value::from(s.process_name().to_string()))
        .chain(statuses.iter().map(|s| Value::from(s.to_string())))
        .chain(std::iter::once(Value::from(object_key.to_string())))
        .collect();

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| Error::database(e.to_string()))?;

    let messages = stmt
        .query_map(params_from_iter(values), row_to_message)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(messages)
}

/// Mark messages as processed. Already-processed messages keep their stamp.
pub fn mark_processed(conn: &Connection, ids: &[i64]) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }

    let sql = format!(
        "UPDATE queue_messages SET processed_at = ?
         WHERE id IN ({}) AND processed_at IS NULL",
        repeat_vars(ids.len()),
    );

    let values: Vec<Value> = std::iter::once(Value::from(Utc::now().to_rfc3339()))
        .chain(ids.iter().map(|id| Value::from(*id)))
        .collect();

    conn.execute(&sql, params_from_iter(values))
        .map_err(|e| Error::database(e.to_string()))
}

/// List every message for an object, processed or not, in arrival order.
pub fn list_for_object(conn: &Connection, object_key: &ContentHash) -> Result<Vec<QueueMessage>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM queue_messages
             WHERE object_key = ?
             ORDER BY received_at ASC, id ASC"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let messages = stmt
        .query_map([object_key.as_str()], row_to_message)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{init_memory_pool, PooledConnection};

    fn setup_test_db() -> PooledConnection {
        let pool = init_memory_pool().unwrap();
        pool.get().unwrap()
    }

    fn message(id: &str, service: Service, status: &str, key: &str) -> NewQueueMessage {
        NewQueueMessage {
            message_id: id.to_string(),
            process: service.process_name().to_string(),
            status: status.to_string(),
            object_key: ContentHash::new(key),
            body: None,
        }
    }

    #[test]
    fn test_insert_ignores_redelivery() {
        let conn = setup_test_db();
        let msg = message("m1", Service::Transcoding, "COMPLETED", "abc");

        assert!(insert_message(&conn, &msg).unwrap());
        assert!(!insert_message(&conn, &msg).unwrap());
        assert_eq!(
            list_for_object(&conn, &ContentHash::new("abc")).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_list_pending_filters() {
        let conn = setup_test_db();
        let key = ContentHash::new("abc");

        insert_message(&conn, &message("m1", Service::Transcoding, "PROGRESSING", "abc")).unwrap();
        insert_message(&conn, &message("m2", Service::Transcoding, "COMPLETED", "abc")).unwrap();
        insert_message(&conn, &message("m3", Service::LabelDetection, "SUCCEEDED", "abc")).unwrap();
        insert_message(&conn, &message("m4", Service::FaceDetection, "ERROR", "abc")).unwrap();
        insert_message(&conn, &message("m5", Service::Transcoding, "COMPLETED", "other")).unwrap();

        let pending =
            list_pending(&conn, &key, &[Service::Transcoding, Service::FaceDetection]).unwrap();
        let ids: Vec<_> = pending.iter().map(|m| m.message_id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m4"]);

        assert!(list_pending(&conn, &key, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_mark_processed_hides_messages() {
        let conn = setup_test_db();
        let key = ContentHash::new("abc");
        insert_message(&conn, &message("m1", Service::Transcoding, "COMPLETED", "abc")).unwrap();

        let pending = list_pending(&conn, &key, &[Service::Transcoding]).unwrap();
        assert_eq!(pending.len(), 1);

        assert_eq!(mark_processed(&conn, &[pending[0].id]).unwrap(), 1);
        assert_eq!(mark_processed(&conn, &[pending[0].id]).unwrap(), 0);
        assert!(list_pending(&conn, &key, &[Service::Transcoding])
            .unwrap()
            .is_empty());

        let all = list_for_object(&conn, &key).unwrap();
        assert!(all[0].processed_at.is_some());
    }
}
