//! Protocol dispatch for the poll scheduler.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::{FetchError, Result};
use crate::model::{Account, Protocol, RawMessage};

/// Fetches metadata for the most recent messages of an account's inbox.
#[async_trait]
pub trait MailFetcher: Send + Sync {
    async fn fetch_recent(&self, account: &Account) -> Result<Vec<RawMessage>>;
}

/// The adapter registered for each protocol tag.
#[derive(Clone, Default)]
pub struct Fetchers {
    imap: Option<Arc<dyn MailFetcher>>,
    pop3: Option<Arc<dyn MailFetcher>>,
}

impl Fetchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_imap(mut self, fetcher: Arc<dyn MailFetcher>) -> Self {
        self.imap = Some(fetcher);
        self
    }

    pub fn with_pop3(mut self, fetcher: Arc<dyn MailFetcher>) -> Self {
        self.pop3 = Some(fetcher);
        self
    }

    /// Returns the fetcher for `protocol`.
    pub fn for_protocol(&self, protocol: Protocol) -> Result<Arc<dyn MailFetcher>> {
        let fetcher = match protocol {
            Protocol::Imap => self.imap.as_ref(),
            Protocol::Pop3 => self.pop3.as_ref(),
        };
        fetcher
            .cloned()
            .ok_or(FetchError::UnsupportedProtocol(protocol))
    }
}
