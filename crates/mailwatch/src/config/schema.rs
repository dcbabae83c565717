use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::model::{NewAccount, Protocol};
use crate::secrets::{resolve_secret, SecretError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Number of most recent messages inspected per poll.
    #[serde(default = "default_window_size")]
    pub window_size: u32,
    /// Number of persisted events replayed to a new subscriber.
    #[serde(default = "default_replay_limit")]
    pub replay_limit: usize,
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
    /// Skip TLS certificate verification (self-signed test servers).
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_window_size() -> u32 {
    crate::email::DEFAULT_WINDOW_SIZE
}

fn default_replay_limit() -> usize {
    50
}

fn default_subscriber_buffer() -> usize {
    256
}

fn default_listen_addr() -> String {
    "0.0.0.0:8081".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            window_size: default_window_size(),
            replay_limit: default_replay_limit(),
            subscriber_buffer: default_subscriber_buffer(),
            accept_invalid_certs: false,
            database_path: None,
            listen_addr: default_listen_addr(),
            accounts: Vec::new(),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Returns the configured database path, or `~/.mailwatch/data/mailwatch.db`.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(crate::db::default_database_path)
    }
}

/// An account declared in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    pub email: String,
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Direct password value. Prefer `password_file` or `password_env_var`.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_file: Option<String>,
    #[serde(default)]
    pub password_env_var: Option<String>,
}

impl AccountConfig {
    /// Resolves the credential and produces an account ready for the store.
    pub fn to_new_account(&self) -> Result<NewAccount, SecretError> {
        if self.password.is_some() {
            log::warn!(
                "Account '{}' uses a direct password value. \
                 Consider passwordFile or passwordEnvVar instead.",
                self.email
            );
        }
        let secret = resolve_secret(
            self.password.as_deref(),
            self.password_file.as_deref(),
            self.password_env_var.as_deref(),
        )?;

        Ok(NewAccount {
            email: self.email.clone(),
            secret,
            host: self.host.clone(),
            port: self.port,
            protocol: self.protocol,
            is_active: self.active,
        })
    }
}
