//! Shared test utilities for mailwatch integration tests.
//!
//! - `FakeMailServer`: an in-memory `MailFetcher` holding one mailbox per
//!   account, with switchable authentication failures
//! - `TestHarness`: store, hub, gate, registry and scheduler wired together
//!   over a database in a temporary directory

pub mod fake_server;
pub mod harness;

pub use fake_server::FakeMailServer;
pub use harness::TestHarness;
