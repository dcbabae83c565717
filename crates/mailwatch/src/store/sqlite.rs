//! SQLite-backed implementation of both store contracts.

use chrono::{DateTime, SubsecRound, Utc};

use super::{AccountStore, EventStore, InsertOutcome, StoreError};
use crate::db::{account_repo, notification_repo, Database};
use crate::model::{Account, AccountChanges, NewAccount, NotificationEvent};

#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl AccountStore for SqliteStore {
    fn list(&self) -> Result<Vec<Account>, StoreError> {
        Ok(account_repo::list(&self.db)?)
    }

    fn list_active(&self) -> Result<Vec<Account>, StoreError> {
        Ok(account_repo::list_active(&self.db)?)
    }

    fn touch_last_check(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        Ok(account_repo::touch_last_check(&self.db, id, at)?)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(account_repo::find_by_email(&self.db, email)?)
    }

    fn create(&self, account: &NewAccount) -> Result<Account, StoreError> {
        account_repo::insert(&self.db, account).map_err(|e| {
            if e.is_unique_violation() {
                StoreError::DuplicateAccount(account.email.clone())
            } else {
                StoreError::Database(e)
            }
        })
    }

    fn update(&self, id: i64, changes: &AccountChanges) -> Result<Option<Account>, StoreError> {
        Ok(account_repo::update(&self.db, id, changes)?)
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(account_repo::delete(&self.db, id)?)
    }
}

impl EventStore for SqliteStore {
    fn exists(&self, message_id: &str) -> Result<bool, StoreError> {
        Ok(notification_repo::exists(&self.db, message_id)?)
    }

    fn insert_if_absent(&self, event: &NotificationEvent) -> Result<InsertOutcome, StoreError> {
        // Stored timestamps keep microseconds; match them so the published
        // event equals what a later read returns.
        let mut stored = event.clone();
        stored.created_at = Utc::now().trunc_subsecs(6);

        match notification_repo::insert(&self.db, &stored) {
            Ok(id) => {
                stored.id = id;
                Ok(InsertOutcome::Inserted(stored))
            }
            Err(e) if e.is_unique_violation() => {
                log::debug!("Message '{}' already stored", event.message_id);
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    fn recent(&self, limit: usize) -> Result<Vec<NotificationEvent>, StoreError> {
        Ok(notification_repo::recent(&self.db, limit)?)
    }
}
