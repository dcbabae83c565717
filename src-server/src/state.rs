use std::sync::Arc;

use mailwatch::{AccountRegistry, EventStore, Hub, PollScheduler};

/// Shared state handed to every request handler.
pub struct AppState {
    pub hub: Arc<Hub>,
    pub events: Arc<dyn EventStore>,
    pub registry: Arc<AccountRegistry>,
    pub scheduler: PollScheduler,
    /// Default page size for `/api/notifications`.
    pub replay_limit: usize,
}
