use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema migration {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A stored value no longer maps onto the domain type.
    #[error("Unreadable row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    #[error("Connection mutex poisoned by a panicking thread")]
    LockPoisoned,
}

impl DatabaseError {
    /// True when an insert hit a UNIQUE index or primary key. The store maps
    /// this onto "already exists" rather than a failure.
    pub fn is_unique_violation(&self) -> bool {
        let Self::Sqlite(rusqlite::Error::SqliteFailure(failure, _)) = self else {
            return false;
        };
        matches!(
            failure.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
    }
}
