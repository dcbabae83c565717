//! Mail protocol adapters.
//!
//! Each adapter connects to a remote server with an account's credentials and
//! returns metadata for the most recent window of messages in the inbox. The
//! window is bounded so per-poll cost does not grow with mailbox size; a burst
//! of more than `window_size` messages between two polls loses the oldest
//! messages of that burst.

pub mod error;
pub mod fetcher;
pub mod headers;
pub mod imap;
pub mod pop3;
pub mod transport;

#[cfg(test)]
pub(crate) mod scripted;

use std::ops::RangeInclusive;

pub use error::FetchError;
pub use fetcher::{Fetchers, MailFetcher};
pub use imap::ImapFetcher;
pub use pop3::Pop3Fetcher;
pub use transport::TlsOptions;

/// Default number of most recent messages inspected per poll.
pub const DEFAULT_WINDOW_SIZE: u32 = 10;

/// Returns the 1-based sequence range `[max(1, count - size + 1), count]`, or
/// `None` for an empty mailbox.
pub fn recent_window(count: u32, size: u32) -> Option<RangeInclusive<u32>> {
    if count == 0 || size == 0 {
        return None;
    }
    let start = count.saturating_sub(size - 1).max(1);
    Some(start..=count)
}
