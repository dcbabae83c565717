//! Subscriber registry and delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

use super::message::HubMessage;
use crate::model::NotificationEvent;
use crate::store::{AccountStore, EventStore, StoreError};

/// Identifies a registered subscriber.
pub type SubscriberId = u64;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Failed to load snapshot: {0}")]
    Store(#[from] StoreError),

    #[error("Subscriber channel closed before the snapshot was delivered")]
    ChannelClosed,
}

/// Tuning for the hub.
#[derive(Debug, Clone, Copy)]
pub struct HubOptions {
    /// Number of recent events replayed to a new subscriber.
    pub replay_limit: usize,
    /// Capacity of each subscriber channel.
    pub buffer: usize,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            replay_limit: 50,
            buffer: 256,
        }
    }
}

/// A live subscription. Dropping it closes the channel, and the hub removes
/// it on the next delivery.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<HubMessage>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next message. `None` once the hub has dropped this
    /// subscriber.
    pub async fn recv(&mut self) -> Option<HubMessage> {
        self.receiver.recv().await
    }

    /// Returns a message if one is already queued.
    pub fn try_recv(&mut self) -> Option<HubMessage> {
        self.receiver.try_recv().ok()
    }
}

/// Set of live subscribers.
///
/// The subscriber map sits behind a single read/write lock: deliveries take
/// the read side, registration and removal take the write side. A new
/// subscriber receives its snapshot while the write lock is held, so no live
/// event can overtake it.
pub struct Hub {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<HubMessage>>>,
    next_id: AtomicU64,
    accounts: Arc<dyn AccountStore>,
    events: Arc<dyn EventStore>,
    options: HubOptions,
}

impl Hub {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        events: Arc<dyn EventStore>,
        options: HubOptions,
    ) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            accounts,
            events,
            options,
        }
    }

    /// Registers a subscriber. Its first two messages are the current
    /// account list and the most recent events, newest first.
    pub async fn subscribe(&self) -> Result<Subscription, HubError> {
        let mut subscribers = self.subscribers.write().await;

        let accounts = self.accounts.list()?;
        let recent = self.events.recent(self.options.replay_limit)?;

        // Room for both snapshot messages regardless of configuration.
        let (sender, receiver) = mpsc::channel(self.options.buffer.max(2));
        sender
            .try_send(HubMessage::AccountsSnapshot(accounts))
            .map_err(|_| HubError::ChannelClosed)?;
        sender
            .try_send(HubMessage::EventsSnapshot(recent))
            .map_err(|_| HubError::ChannelClosed)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        subscribers.insert(id, sender);
        debug!("Subscriber {} registered ({} live)", id, subscribers.len());

        Ok(Subscription { id, receiver })
    }

    /// Removes a subscriber. Returns false if it was already gone.
    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.write().await.remove(&id).is_some();
        if removed {
            debug!("Subscriber {} unregistered", id);
        }
        removed
    }

    /// Delivers `message` to every subscriber. Subscribers whose channel is
    /// closed or full are dropped.
    pub async fn publish(&self, message: HubMessage) {
        let failed: Vec<SubscriberId> = {
            let subscribers = self.subscribers.read().await;
            subscribers
                .iter()
                .filter_map(|(id, sender)| match sender.try_send(message.clone()) {
                    Ok(()) => None,
                    Err(TrySendError::Full(_)) => {
                        warn!("Subscriber {} is not keeping up, dropping it", id);
                        Some(*id)
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Subscriber {} has gone away", id);
                        Some(*id)
                    }
                })
                .collect()
        };

        if failed.is_empty() {
            return;
        }

        let mut subscribers = self.subscribers.write().await;
        for id in failed {
            subscribers.remove(&id);
        }
    }

    pub async fn publish_event(&self, event: NotificationEvent) {
        self.publish(HubMessage::NewEvent(event)).await;
    }

    /// Publishes the current account list.
    pub async fn publish_accounts(&self) -> Result<(), HubError> {
        let accounts = self.accounts.list()?;
        self.publish(HubMessage::AccountsSnapshot(accounts)).await;
        Ok(())
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}
