#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use mailwatch::email::recent_window;
use mailwatch::{Account, FetchError, MailFetcher, RawMessage};

/// Mail server stand-in. Each delivered message gets a stable Message-ID and
/// a received time one minute after the previous one.
pub struct FakeMailServer {
    mailboxes: Mutex<HashMap<String, Vec<RawMessage>>>,
    rejected: Mutex<HashSet<String>>,
    window_size: u32,
    calls: AtomicUsize,
}

impl FakeMailServer {
    pub fn new(window_size: u32) -> Self {
        Self {
            mailboxes: Mutex::new(HashMap::new()),
            rejected: Mutex::new(HashSet::new()),
            window_size,
            calls: AtomicUsize::new(0),
        }
    }

    /// Appends a message to `email`'s inbox and returns its Message-ID.
    pub fn deliver(&self, email: &str, subject: &str) -> String {
        let mut mailboxes = self.mailboxes.lock().unwrap();
        let inbox = mailboxes.entry(email.to_string()).or_default();
        let sequence = inbox.len() as u32 + 1;
        let message_id = format!("{}.{}", sequence, email);
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        inbox.push(RawMessage {
            sequence,
            from: "Bob <bob@example.com>".to_string(),
            subject: subject.to_string(),
            message_id: Some(message_id.clone()),
            received_at: base + Duration::minutes(sequence as i64),
        });
        message_id
    }

    /// Makes every login for `email` fail.
    pub fn reject_logins(&self, email: &str) {
        self.rejected.lock().unwrap().insert(email.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailFetcher for FakeMailServer {
    async fn fetch_recent(&self, account: &Account) -> Result<Vec<RawMessage>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.rejected.lock().unwrap().contains(&account.email) {
            return Err(FetchError::AuthenticationFailed(
                "invalid credentials".to_string(),
            ));
        }

        let mailboxes = self.mailboxes.lock().unwrap();
        let Some(inbox) = mailboxes.get(&account.email) else {
            return Ok(Vec::new());
        };
        let Some(window) = recent_window(inbox.len() as u32, self.window_size) else {
            return Ok(Vec::new());
        };

        Ok(inbox[(*window.start() as usize - 1)..(*window.end() as usize)].to_vec())
    }
}
