use serde::Serialize;

use crate::model::{Account, NotificationEvent};

/// A message delivered to subscribers.
///
/// Serialized as `{"type": "<kind>", "payload": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum HubMessage {
    /// The full current account list.
    AccountsSnapshot(Vec<Account>),
    /// Recent persisted events, newest first.
    EventsSnapshot(Vec<NotificationEvent>),
    /// A newly persisted event.
    NewEvent(NotificationEvent),
}

impl HubMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            HubMessage::AccountsSnapshot(_) => "accounts-snapshot",
            HubMessage::EventsSnapshot(_) => "events-snapshot",
            HubMessage::NewEvent(_) => "new-event",
        }
    }
}
