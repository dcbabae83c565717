//! Test harness wiring the polling core over a temporary database.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tempfile::TempDir;

use mailwatch::db::Database;
use mailwatch::{
    Account, AccountRegistry, DedupGate, Fetchers, Hub, HubOptions, NewAccount, PollScheduler,
    Protocol, SqliteStore,
};

use super::FakeMailServer;

pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub store: Arc<SqliteStore>,
    pub hub: Arc<Hub>,
    pub registry: AccountRegistry,
    pub server: Arc<FakeMailServer>,
    pub scheduler: PollScheduler,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_window(10)
    }

    pub fn with_window(window_size: u32) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("mailwatch.db");
        let server = Arc::new(FakeMailServer::new(window_size));
        Self::assemble(temp_dir, db_path, server)
    }

    /// Rebuilds every component over the same database file and mail server,
    /// as a process restart would.
    pub fn restart(self) -> Self {
        let TestHarness {
            temp_dir,
            db_path,
            server,
            ..
        } = self;
        Self::assemble(temp_dir, db_path, server)
    }

    fn assemble(temp_dir: TempDir, db_path: PathBuf, server: Arc<FakeMailServer>) -> Self {
        let db = Database::open(&db_path).expect("Failed to open database");
        let store = Arc::new(SqliteStore::new(db));
        let hub = Arc::new(Hub::new(
            store.clone(),
            store.clone(),
            HubOptions::default(),
        ));
        let gate = Arc::new(DedupGate::new(store.clone(), hub.clone()));
        let registry = AccountRegistry::new(store.clone(), hub.clone());
        let fetchers = Fetchers::new()
            .with_imap(server.clone())
            .with_pop3(server.clone());
        let scheduler = PollScheduler::new(
            store.clone(),
            fetchers,
            gate,
            Duration::from_secs(3600),
        );

        Self {
            temp_dir,
            db_path,
            store,
            hub,
            registry,
            server,
            scheduler,
        }
    }

    pub async fn add_account(&self, email: &str, protocol: Protocol) -> Account {
        self.registry
            .create(NewAccount {
                email: email.to_string(),
                secret: SecretString::from("secret"),
                host: "mail.example.com".to_string(),
                port: match protocol {
                    Protocol::Imap => 993,
                    Protocol::Pop3 => 995,
                },
                protocol,
                is_active: true,
            })
            .await
            .expect("Failed to create account")
    }

    /// Runs one poll cycle and waits for every account check to finish.
    pub async fn poll(&self) {
        for handle in self.scheduler.run_cycle() {
            handle.await.expect("account check panicked");
        }
    }
}
