//! Monitored mailbox accounts.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Mail retrieval protocol spoken by an account's server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Imap,
    Pop3,
}

impl Protocol {
    /// Returns the tag stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Imap => "IMAP",
            Protocol::Pop3 => "POP3",
        }
    }

    /// Lowercase prefix for message ids synthesized on this protocol.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Protocol::Imap => "imap",
            Protocol::Pop3 => "pop3",
        }
    }

    /// Parses a stored protocol tag (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "IMAP" => Some(Protocol::Imap),
            "POP3" => Some(Protocol::Pop3),
            _ => None,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mailbox the watcher polls.
///
/// The credential secret is never serialized, so an `Account` can be sent to
/// subscribers as-is.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub secret: SecretString,
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub is_active: bool,
    pub last_check: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub secret: SecretString,
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub is_active: bool,
}

/// Partial update of an account. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub secret: Option<SecretString>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<Protocol>,
    pub is_active: Option<bool>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.secret.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.protocol.is_none()
            && self.is_active.is_none()
    }
}
