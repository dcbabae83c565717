//! Versioned schema changes.
//!
//! Applied versions are recorded in `_migrations`. Each pending step runs in
//! its own transaction together with its bookkeeping row, so a failed step
//! leaves the schema at the previous version.

use rusqlite::{params, Connection};

use super::error::DatabaseError;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "accounts",
        sql: include_str!("sql/001_create_accounts.sql"),
    },
    Migration {
        version: 2,
        name: "notifications",
        sql: include_str!("sql/002_create_notifications.sql"),
    },
];

const BOOKKEEPING: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version     INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    applied_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);";

/// Applies every migration newer than the recorded schema version and
/// returns how many ran.
pub fn run_all(conn: &mut Connection) -> Result<usize, DatabaseError> {
    conn.execute_batch(BOOKKEEPING)?;

    let schema_version: u32 = conn.query_row(
        "SELECT IFNULL(MAX(version), 0) FROM _migrations",
        [],
        |row| row.get(0),
    )?;

    let mut applied = 0;
    for step in MIGRATIONS.iter().filter(|m| m.version > schema_version) {
        log::debug!("Applying migration {} ({})", step.version, step.name);

        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)
            .map_err(|e| DatabaseError::Migration {
                version: step.version,
                reason: e.to_string(),
            })?;
        tx.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            params![step.version, step.name],
        )?;
        tx.commit()?;

        applied += 1;
    }

    Ok(applied)
}
