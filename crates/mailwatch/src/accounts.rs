//! Account management on top of the account store.
//!
//! Every mutation goes through [`AccountRegistry`] so subscribers always see
//! the current account list.

use std::sync::Arc;

use log::{error, info, warn};
use secrecy::ExposeSecret;

use crate::broadcast::Hub;
use crate::config::AccountConfig;
use crate::error::Result;
use crate::model::{Account, AccountChanges, NewAccount};
use crate::store::AccountStore;

/// Counts from reconciling configured accounts into the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Accounts whose credential could not be resolved.
    pub skipped: usize,
}

pub struct AccountRegistry {
    store: Arc<dyn AccountStore>,
    hub: Arc<Hub>,
}

impl AccountRegistry {
    pub fn new(store: Arc<dyn AccountStore>, hub: Arc<Hub>) -> Self {
        Self { store, hub }
    }

    pub fn list(&self) -> Result<Vec<Account>> {
        Ok(self.store.list()?)
    }

    pub async fn create(&self, account: NewAccount) -> Result<Account> {
        let created = self.store.create(&account)?;
        info!("Added account {} ({})", created.email, created.protocol);
        self.publish().await;
        Ok(created)
    }

    /// Applies `changes` to the account. Returns `None` if it doesn't exist.
    pub async fn update(&self, id: i64, changes: AccountChanges) -> Result<Option<Account>> {
        let updated = self.store.update(id, &changes)?;
        if updated.is_some() {
            self.publish().await;
        }
        Ok(updated)
    }

    /// Deletes the account. Returns false if it doesn't exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let deleted = self.store.delete(id)?;
        if deleted {
            info!("Removed account {}", id);
            self.publish().await;
        }
        Ok(deleted)
    }

    /// Reconciles configured accounts into the store: missing accounts are
    /// created and changed ones updated. Accounts that exist only in the
    /// store are left alone.
    pub async fn sync_from_config(&self, configured: &[AccountConfig]) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();

        for entry in configured {
            let wanted = match entry.to_new_account() {
                Ok(account) => account,
                Err(e) => {
                    error!("Skipping account {}: {}", entry.email, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            match self.store.find_by_email(&wanted.email)? {
                None => {
                    self.store.create(&wanted)?;
                    summary.created += 1;
                }
                Some(existing) => {
                    let changes = diff_account(&existing, &wanted);
                    if changes.is_empty() {
                        summary.unchanged += 1;
                    } else {
                        self.store.update(existing.id, &changes)?;
                        summary.updated += 1;
                    }
                }
            }
        }

        info!(
            "Account sync: {} created, {} updated, {} unchanged, {} skipped",
            summary.created, summary.updated, summary.unchanged, summary.skipped
        );

        if summary.created + summary.updated > 0 {
            self.publish().await;
        }
        Ok(summary)
    }

    async fn publish(&self) {
        if let Err(e) = self.hub.publish_accounts().await {
            warn!("Failed to publish account list: {}", e);
        }
    }
}

/// Fields of `wanted` that differ from `existing`.
fn diff_account(existing: &Account, wanted: &NewAccount) -> AccountChanges {
    let mut changes = AccountChanges::default();
    if existing.secret.expose_secret() != wanted.secret.expose_secret() {
        changes.secret = Some(wanted.secret.clone());
    }
    if existing.host != wanted.host {
        changes.host = Some(wanted.host.clone());
    }
    if existing.port != wanted.port {
        changes.port = Some(wanted.port);
    }
    if existing.protocol != wanted.protocol {
        changes.protocol = Some(wanted.protocol);
    }
    if existing.is_active != wanted.is_active {
        changes.is_active = Some(wanted.is_active);
    }
    changes
}
