//! Periodic mailbox poller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::gate::{Admission, DedupGate};
use crate::email::Fetchers;
use crate::model::{Account, NotificationEvent};
use crate::store::AccountStore;

/// Fires a poll cycle every `interval`, plus on demand via [`trigger`].
///
/// Each cycle spawns one independent task per active account. Tasks are
/// never joined by the loop, so a slow or hanging server only delays its
/// own account.
///
/// [`trigger`]: PollScheduler::trigger
#[derive(Clone)]
pub struct PollScheduler {
    accounts: Arc<dyn AccountStore>,
    fetchers: Fetchers,
    gate: Arc<DedupGate>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
    manual: Arc<Notify>,
}

impl PollScheduler {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        fetchers: Fetchers,
        gate: Arc<DedupGate>,
        interval: Duration,
    ) -> Self {
        Self {
            accounts,
            fetchers,
            gate,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
            manual: Arc::new(Notify::new()),
        }
    }

    /// Starts the timer loop on the current tokio runtime. The first cycle
    /// runs one interval after start.
    pub fn start(&self) -> JoinHandle<()> {
        let scheduler = self.clone();

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(scheduler.interval);
            timer.tick().await; // skip immediate first tick

            loop {
                if scheduler.shutdown.load(Ordering::Acquire) {
                    break;
                }

                tokio::select! {
                    _ = timer.tick() => {},
                    _ = scheduler.manual.notified() => {
                        info!("Manual poll triggered");
                    },
                    _ = scheduler.wake.notified() => {},
                }

                if scheduler.shutdown.load(Ordering::Acquire) {
                    break;
                }

                scheduler.run_cycle();
            }

            info!("Poll scheduler stopped");
        })
    }

    /// Requests an immediate poll cycle.
    pub fn trigger(&self) {
        self.manual.notify_one();
    }

    /// Signals the loop to stop. In-flight account checks run to completion.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Runs one poll cycle: lists active accounts and spawns a check for each.
    ///
    /// Returns the handles of the spawned checks; the timer loop drops them.
    pub fn run_cycle(&self) -> Vec<JoinHandle<()>> {
        let accounts = match self.accounts.list_active() {
            Ok(accounts) => accounts,
            Err(e) => {
                error!("Failed to list active accounts: {}", e);
                return Vec::new();
            }
        };

        let _span = info_span!("poll_cycle", account_count = accounts.len()).entered();
        debug!("Dispatching {} account checks", accounts.len());

        accounts
            .into_iter()
            .map(|account| {
                let span = info_span!("account_check", email = %account.email);
                let scheduler = self.clone();
                tokio::spawn(async move { scheduler.check_account(account).await }.instrument(span))
            })
            .collect()
    }

    async fn check_account(&self, account: Account) {
        info!("Checking {} ({})", account.email, account.protocol);

        let fetched = match self.fetchers.for_protocol(account.protocol) {
            Ok(fetcher) => fetcher.fetch_recent(&account).await,
            Err(e) => Err(e),
        };

        match fetched {
            Ok(messages) => {
                let observed_at = Utc::now();
                let mut new_count = 0usize;
                for raw in messages {
                    let event = NotificationEvent::from_raw(
                        &account.email,
                        account.protocol,
                        raw,
                        observed_at,
                    );
                    let message_id = event.message_id.clone();
                    match self.gate.admit(event).await {
                        Ok(Admission::Inserted(_)) => new_count += 1,
                        Ok(Admission::Duplicate) => {}
                        Err(e) => {
                            error!("Failed to persist message {}: {}", message_id, e);
                        }
                    }
                }
                if new_count > 0 {
                    info!("{} new message(s) for {}", new_count, account.email);
                }
            }
            Err(e) => {
                warn!(kind = e.kind(), "Check failed for {}: {}", account.email, e);
            }
        }

        if let Err(e) = self.accounts.touch_last_check(account.id, Utc::now()) {
            error!("Failed to update last check for {}: {}", account.email, e);
        }
    }
}
