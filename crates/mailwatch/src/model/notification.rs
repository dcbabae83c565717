//! New-mail notifications and the raw adapter output they are built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::Protocol;

/// Message metadata as observed by a protocol adapter during one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Sequence number of the message in the mailbox at observation time.
    pub sequence: u32,
    /// Display sender (`Name <mailbox@host>` or `mailbox@host`).
    pub from: String,
    pub subject: String,
    /// Protocol-native identifier, if the server provided one.
    pub message_id: Option<String>,
    /// Server-provided date, or the observation time.
    pub received_at: DateTime<Utc>,
}

/// A persisted, user-facing record of one detected message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// Row id assigned by the event store; zero until persisted.
    #[serde(default)]
    pub id: i64,
    pub message_id: String,
    pub account_email: String,
    pub from: String,
    pub subject: String,
    pub received_at: DateTime<Utc>,
    /// When the row was written. The event store stamps this on insert.
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    /// Builds an event for `raw`, observed at `observed_at` on an account
    /// speaking `protocol`.
    ///
    /// A message without a native identifier gets one synthesized from the
    /// protocol, the account, its sequence number and the observation time.
    pub fn from_raw(
        account_email: &str,
        protocol: Protocol,
        raw: RawMessage,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let message_id = match raw.message_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => synthesize_message_id(protocol, account_email, raw.sequence, observed_at),
        };

        Self {
            id: 0,
            message_id,
            account_email: account_email.to_string(),
            from: raw.from,
            subject: raw.subject,
            received_at: raw.received_at,
            created_at: observed_at,
        }
    }
}

/// Synthesizes a message identifier for servers that don't supply one.
///
/// Unique within a poll because sequence numbers are. Not stable across polls
/// once the mailbox is renumbered by another client.
pub fn synthesize_message_id(
    protocol: Protocol,
    account_email: &str,
    sequence: u32,
    observed_at: DateTime<Utc>,
) -> String {
    format!(
        "{}-{}-{}-{}",
        protocol.id_prefix(),
        account_email,
        sequence,
        observed_at.timestamp()
    )
}
