//! Domain types shared by the adapters, stores and the fan-out hub.

pub mod account;
pub mod notification;

pub use account::{Account, AccountChanges, NewAccount, Protocol};
pub use notification::{synthesize_message_id, NotificationEvent, RawMessage};
