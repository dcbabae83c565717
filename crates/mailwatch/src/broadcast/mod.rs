//! Fan-out of notification events to live subscribers.
//!
//! The [`Hub`] owns the subscriber set. It is shared by the poll scheduler
//! (which publishes new events), the account registry (which publishes the
//! account list after every change) and whatever transport hands
//! subscriptions to clients.

pub mod hub;
pub mod message;

pub use hub::{Hub, HubError, HubOptions, Subscription, SubscriberId};
pub use message::HubMessage;
