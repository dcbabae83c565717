use std::sync::Arc;

use crate::broadcast::Hub;
use crate::model::NotificationEvent;
use crate::store::{EventStore, InsertOutcome, StoreError};

/// Result of offering an event to the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// First sighting: persisted and published.
    Inserted(NotificationEvent),
    /// Already known. Not an error.
    Duplicate,
}

/// Decides whether an observed message is new, persists it if so, and
/// publishes it to the hub.
///
/// The `exists` lookup only saves a write in the common case. Correctness
/// rests on the store's uniqueness constraint, so two overlapping polls
/// racing on the same message still produce a single `Inserted`.
pub struct DedupGate {
    events: Arc<dyn EventStore>,
    hub: Arc<Hub>,
}

impl DedupGate {
    pub fn new(events: Arc<dyn EventStore>, hub: Arc<Hub>) -> Self {
        Self { events, hub }
    }

    pub async fn admit(&self, event: NotificationEvent) -> Result<Admission, StoreError> {
        if self.events.exists(&event.message_id)? {
            return Ok(Admission::Duplicate);
        }

        match self.events.insert_if_absent(&event)? {
            InsertOutcome::Inserted(stored) => {
                self.hub.publish_event(stored.clone()).await;
                Ok(Admission::Inserted(stored))
            }
            InsertOutcome::Duplicate => Ok(Admission::Duplicate),
        }
    }
}
