pub mod accounts;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod model;
pub mod poll;
pub mod secrets;
pub mod store;

pub use accounts::{AccountRegistry, SyncSummary};
pub use broadcast::{Hub, HubError, HubMessage, HubOptions, Subscription};
pub use config::{load_config, load_config_from_str, AccountConfig, WatchConfig};
pub use email::{FetchError, Fetchers, ImapFetcher, MailFetcher, Pop3Fetcher, TlsOptions};
pub use error::{ConfigError, MailwatchError, Result};
pub use model::{Account, AccountChanges, NewAccount, NotificationEvent, Protocol, RawMessage};
pub use poll::{Admission, DedupGate, PollScheduler};
pub use secrets::{resolve_secret, SecretError};
pub use store::{AccountStore, EventStore, InsertOutcome, SqliteStore, StoreError};
