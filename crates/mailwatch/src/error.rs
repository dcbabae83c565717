//! Crate-level error type. Each layer has its own enum; this one wraps them
//! for callers that cross layers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailwatchError {
    #[error("Config: {0}")]
    Config(#[from] ConfigError),

    #[error("Credentials: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("Storage: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Store: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Mail server: {0}")]
    Fetch(#[from] crate::email::FetchError),

    #[error("Broadcast: {0}")]
    Hub(#[from] crate::broadcast::HubError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("{message}")]
    Validation { message: String },

    #[error("Account '{email}' is invalid: {reason}")]
    InvalidAccount { email: String, reason: String },

    #[error("{name}={value} is not a valid override")]
    InvalidEnv { name: String, value: String },
}

pub type Result<T> = std::result::Result<T, MailwatchError>;
