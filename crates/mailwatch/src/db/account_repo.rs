//! Account repository: CRUD operations for the `accounts` table.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use secrecy::{ExposeSecret, SecretString};

use super::{format_timestamp, parse_timestamp, Database, DatabaseError};
use crate::model::{Account, AccountChanges, NewAccount, Protocol};

const COLUMNS: &str =
    "id, email, password, host, port, protocol, is_active, last_check, created_at, updated_at";

/// A raw account row from the database.
#[derive(Debug, Clone)]
struct AccountRow {
    id: i64,
    email: String,
    password: String,
    host: String,
    port: u16,
    protocol: String,
    is_active: bool,
    last_check: Option<String>,
    created_at: String,
    updated_at: String,
}

impl AccountRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            password: row.get(2)?,
            host: row.get(3)?,
            port: row.get(4)?,
            protocol: row.get(5)?,
            is_active: row.get(6)?,
            last_check: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_account(self) -> Result<Account, DatabaseError> {
        let protocol = Protocol::parse(&self.protocol).ok_or_else(|| DatabaseError::CorruptRow {
            table: "accounts",
            reason: format!("unknown protocol '{}' for {}", self.protocol, self.email),
        })?;

        Ok(Account {
            id: self.id,
            email: self.email,
            secret: SecretString::from(self.password),
            host: self.host,
            port: self.port,
            protocol,
            is_active: self.is_active,
            last_check: self.last_check.as_deref().map(parse_timestamp),
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        })
    }
}

fn query_accounts(
    db: &Database,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Account>, DatabaseError> {
    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, AccountRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;

    rows.into_iter().map(AccountRow::into_account).collect()
}

/// Lists all accounts ordered by id.
pub fn list(db: &Database) -> Result<Vec<Account>, DatabaseError> {
    query_accounts(
        db,
        &format!("SELECT {} FROM accounts ORDER BY id", COLUMNS),
        [],
    )
}

/// Lists accounts with `is_active = 1`.
pub fn list_active(db: &Database) -> Result<Vec<Account>, DatabaseError> {
    query_accounts(
        db,
        &format!(
            "SELECT {} FROM accounts WHERE is_active = 1 ORDER BY id",
            COLUMNS
        ),
        [],
    )
}

/// Finds an account by id.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<Account>, DatabaseError> {
    let row = db.with_conn(|conn| {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM accounts WHERE id = ?1", COLUMNS),
                params![id],
                AccountRow::from_row,
            )
            .optional()?;
        Ok(row)
    })?;
    row.map(AccountRow::into_account).transpose()
}

/// Finds an account by email address (case-insensitive).
pub fn find_by_email(db: &Database, email: &str) -> Result<Option<Account>, DatabaseError> {
    let row = db.with_conn(|conn| {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM accounts WHERE email = ?1 COLLATE NOCASE",
                    COLUMNS
                ),
                params![email],
                AccountRow::from_row,
            )
            .optional()?;
        Ok(row)
    })?;
    row.map(AccountRow::into_account).transpose()
}

/// Inserts a new account and returns it with its assigned id.
pub fn insert(db: &Database, account: &NewAccount) -> Result<Account, DatabaseError> {
    let now = format_timestamp(Utc::now());
    let id = db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO accounts (email, password, host, port, protocol, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                account.email,
                account.secret.expose_secret(),
                account.host,
                account.port,
                account.protocol.as_str(),
                account.is_active,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })?;

    find_by_id(db, id)?.ok_or_else(|| DatabaseError::CorruptRow {
        table: "accounts",
        reason: format!("inserted account {} not found", id),
    })
}

/// Applies a partial update. Returns the updated account, or `None` if no
/// account has that id.
pub fn update(
    db: &Database,
    id: i64,
    changes: &AccountChanges,
) -> Result<Option<Account>, DatabaseError> {
    let now = format_timestamp(Utc::now());
    let updated = db.with_conn(|conn| {
        let count = conn.execute(
            "UPDATE accounts SET
                password = COALESCE(?2, password),
                host = COALESCE(?3, host),
                port = COALESCE(?4, port),
                protocol = COALESCE(?5, protocol),
                is_active = COALESCE(?6, is_active),
                updated_at = ?7
             WHERE id = ?1",
            params![
                id,
                changes.secret.as_ref().map(|s| s.expose_secret().to_string()),
                changes.host,
                changes.port,
                changes.protocol.map(|p| p.as_str()),
                changes.is_active,
                now,
            ],
        )?;
        Ok(count)
    })?;

    if updated == 0 {
        return Ok(None);
    }
    find_by_id(db, id)
}

/// Deletes an account. Returns true if a row was removed.
pub fn delete(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let count = conn.execute("DELETE FROM accounts WHERE id = ?1", params![id])?;
        Ok(count > 0)
    })
}

/// Records the time of the latest poll attempt.
pub fn touch_last_check(db: &Database, id: i64, at: DateTime<Utc>) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE accounts SET last_check = ?2 WHERE id = ?1",
            params![id, format_timestamp(at)],
        )?;
        Ok(())
    })
}
