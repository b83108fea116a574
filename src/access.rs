//! Access resolution for owners.
//!
//! The worker asks the [`AccessProvider`] for an [`AccessContext`] right
//! before every execution, never earlier, so credentials refreshed while a
//! request sat in the queue are the ones used.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::Deserialize;
use tracing::debug;

use crate::config::secrets::{ExposeSecret, SecretString};
use crate::error::{Error, Result, SyncError};

/// Everything a synchronization needs to talk to the owner's server.
#[derive(Debug)]
pub struct AccessContext {
    pub owner: String,
    pub server_url: String,
    pub token: SecretString,
}

/// Resolves an [`AccessContext`] for an owner at execution time.
pub trait AccessProvider: Send + Sync {
    fn resolve(&self, owner: &str) -> std::result::Result<AccessContext, SyncError>;
}

/// Top-level TOML wrapper.
#[derive(Debug, Deserialize)]
struct AccountsFile {
    #[serde(default, rename = "account")]
    accounts: Vec<AccountEntry>,
}

/// One configured account.
#[derive(Debug, Deserialize)]
pub struct AccountEntry {
    pub name: String,
    pub server_url: String,
    pub token: SecretString,
}

/// In-memory account registry, usable as an [`AccessProvider`].
///
/// Accounts can be added, refreshed or removed while the scheduler runs.
#[derive(Default)]
pub struct AccountRegistry {
    accounts: RwLock<HashMap<String, AccountEntry>>,
}

impl AccountRegistry {
    /// Create an empty registry with no accounts.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load accounts from a TOML file of `[[account]]` tables.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read accounts file {}: {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("bad accounts file {}: {e}", path.display())))
    }

    /// Parse accounts from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Self::parse(content).map_err(|e| Error::Config(format!("bad accounts: {e}")))
    }

    fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        let file: AccountsFile = toml::from_str(content)?;
        let registry = Self::empty();
        for account in file.accounts {
            registry.upsert(account);
        }
        Ok(registry)
    }

    /// Add an account or replace its credentials.
    pub fn upsert(&self, account: AccountEntry) {
        debug!(owner = %account.name, "account registered");
        self.write().insert(account.name.clone(), account);
    }

    /// Forget an account. Later executions for it fail access resolution.
    pub fn remove(&self, owner: &str) -> bool {
        self.write().remove(owner).is_some()
    }

    /// Configured account names, sorted.
    pub fn owners(&self) -> Vec<String> {
        let mut owners: Vec<String> = self.read().keys().cloned().collect();
        owners.sort();
        owners
    }

    pub fn contains(&self, owner: &str) -> bool {
        self.read().contains_key(owner)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, AccountEntry>> {
        self.accounts.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, AccountEntry>> {
        self.accounts.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl AccessProvider for AccountRegistry {
    fn resolve(&self, owner: &str) -> std::result::Result<AccessContext, SyncError> {
        let accounts = self.read();
        let account = accounts
            .get(owner)
            .ok_or_else(|| SyncError::AccessResolution(format!("unknown account {owner}")))?;
        Ok(AccessContext {
            owner: account.name.clone(),
            server_url: account.server_url.clone(),
            token: SecretString::from(account.token.expose_secret()),
        })
    }
}
