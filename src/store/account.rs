use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::core::packet::Password;
use crate::error::{constants, LoginError, Result};

/// Anonymous identifiers live in `[0, ANONYMOUS_ID_LIMIT)` and wrap.
pub const ANONYMOUS_ID_LIMIT: u32 = 0x8000_0000;

/// First registered identifier.
pub const REGISTERED_ID_BASE: u32 = 0x8000_0000;

/// One past the last registered identifier.
pub const REGISTERED_ID_LIMIT: u64 = 0x1_0000_0000;

/// A registered account as handed out by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub password: Password,
    pub user_id: u32,
}

/// Persisted value of the `accounts` map (the username is the key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountRecord {
    pub password: Password,
    pub user_id: u32,
}

/// Root of the credential store, in memory and on disk.
///
/// `next_registered_id` is wider than an identifier so that the exhausted
/// state (`0x1_0000_0000`) stays representable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreState {
    #[serde(alias = "registered_logins")]
    pub accounts: BTreeMap<String, AccountRecord>,
    pub next_anonymous_id: u32,
    pub next_registered_id: u64,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            accounts: BTreeMap::new(),
            next_anonymous_id: 0,
            next_registered_id: REGISTERED_ID_BASE as u64,
        }
    }
}

impl StoreState {
    /// Check the invariants a loaded document must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.next_anonymous_id >= ANONYMOUS_ID_LIMIT {
            return Err(LoginError::CorruptStore(
                constants::ERR_ANONYMOUS_COUNTER.to_string(),
            ));
        }
        if self.next_registered_id < REGISTERED_ID_BASE as u64
            || self.next_registered_id > REGISTERED_ID_LIMIT
        {
            return Err(LoginError::CorruptStore(
                constants::ERR_REGISTERED_COUNTER.to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.accounts.len());
        for (username, record) in &self.accounts {
            if record.user_id < REGISTERED_ID_BASE
                || record.user_id as u64 >= self.next_registered_id
            {
                return Err(LoginError::CorruptStore(format!(
                    "user {username:?} has id {:#x} outside the allocated registered range",
                    record.user_id
                )));
            }
            if !seen.insert(record.user_id) {
                return Err(LoginError::CorruptStore(format!(
                    "user id {:#x} assigned twice (again to {username:?})",
                    record.user_id
                )));
            }
        }
        Ok(())
    }

    pub fn account(&self, username: &str) -> Option<Account> {
        self.accounts.get(username).map(|record| Account {
            username: username.to_string(),
            password: record.password,
            user_id: record.user_id,
        })
    }

    pub fn username_of(&self, user_id: u32) -> Option<&str> {
        self.accounts
            .iter()
            .find(|(_, record)| record.user_id == user_id)
            .map(|(username, _)| username.as_str())
    }
}
