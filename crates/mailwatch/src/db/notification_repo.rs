//! Notification repository: the append-only `notifications` table.

use rusqlite::{params, Row};

use super::{format_timestamp, parse_timestamp, Database, DatabaseError};
use crate::model::NotificationEvent;

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<NotificationEvent> {
    let received_at: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(NotificationEvent {
        id: row.get(0)?,
        message_id: row.get(1)?,
        account_email: row.get(2)?,
        from: row.get(3)?,
        subject: row.get(4)?,
        received_at: parse_timestamp(&received_at),
        created_at: parse_timestamp(&created_at),
    })
}

/// Checks whether an event with this message id has been stored.
pub fn exists(db: &Database, message_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let found: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notifications WHERE message_id = ?1)",
            params![message_id],
            |r| r.get(0),
        )?;
        Ok(found)
    })
}

/// Inserts an event and returns its row id.
///
/// Fails with a unique-constraint violation if the message id is already
/// present; see [`DatabaseError::is_unique_violation`].
pub fn insert(db: &Database, event: &NotificationEvent) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO notifications (message_id, account_email, sender, subject, received_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.message_id,
                event.account_email,
                event.from,
                event.subject,
                format_timestamp(event.received_at),
                format_timestamp(event.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Returns up to `limit` events, newest received first.
pub fn recent(db: &Database, limit: usize) -> Result<Vec<NotificationEvent>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, message_id, account_email, sender, subject, received_at, created_at
             FROM notifications
             ORDER BY received_at DESC, id DESC
             LIMIT ?1",
        )?;
        let events = stmt
            .query_map(params![limit as i64], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    })
}
