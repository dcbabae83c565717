//! Storage contracts used by the polling core.
//!
//! The core never talks to SQL directly; it goes through [`AccountStore`]
//! and [`EventStore`]. [`SqliteStore`] implements both on top of
//! [`crate::db::Database`].

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::DatabaseError;
use crate::model::{Account, AccountChanges, NewAccount, NotificationEvent};

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Errors from a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Account with email '{0}' already exists")]
    DuplicateAccount(String),
}

/// Outcome of an idempotent event write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The event was stored; carries it with its assigned row id.
    Inserted(NotificationEvent),
    /// An event with the same message id already exists.
    Duplicate,
}

/// Durable table of monitored mailboxes.
pub trait AccountStore: Send + Sync {
    fn list(&self) -> Result<Vec<Account>, StoreError>;

    fn list_active(&self) -> Result<Vec<Account>, StoreError>;

    fn touch_last_check(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError>;

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    fn create(&self, account: &NewAccount) -> Result<Account, StoreError>;

    /// Returns `None` if no account has this id.
    fn update(&self, id: i64, changes: &AccountChanges) -> Result<Option<Account>, StoreError>;

    /// Returns false if no account has this id.
    fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

/// Durable append log of notification events, unique by message id.
pub trait EventStore: Send + Sync {
    fn exists(&self, message_id: &str) -> Result<bool, StoreError>;

    /// Writes the event unless its message id is already present. The
    /// uniqueness check happens at commit time, so concurrent callers with
    /// the same id see exactly one `Inserted`.
    fn insert_if_absent(&self, event: &NotificationEvent) -> Result<InsertOutcome, StoreError>;

    /// Up to `limit` events ordered by received timestamp, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<NotificationEvent>, StoreError>;
}
