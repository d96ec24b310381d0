//! Platform keychain credential store
//!
//! Stores the access and refresh tokens as two secrets under one service,
//! keyed by account:
//!
//! - `access.<account>`: current access token
//! - `refresh.<account>`: current refresh token
//!
//! Backed by the `keyring` crate (macOS Keychain, Windows Credential Manager,
//! Linux Secret Service).

use async_trait::async_trait;
use carelink_domain::CredentialPair;
use keyring::Entry;
use tracing::debug;

use super::traits::CredentialStore;
use super::types::StorageError;

const ACCESS_PREFIX: &str = "access.";
const REFRESH_PREFIX: &str = "refresh.";

/// Credential store persisted in the platform keychain
pub struct KeychainCredentialStore {
    service_name: String,
    account: String,
}

impl KeychainCredentialStore {
    /// Create a store for `account` under the keychain service `service_name`
    /// (e.g. `"CareLink.session"`, `"main"`).
    pub fn new(service_name: impl Into<String>, account: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), account: account.into() }
    }

    fn access_key(&self) -> String {
        format!("{ACCESS_PREFIX}{}", self.account)
    }

    fn refresh_key(&self) -> String {
        format!("{REFRESH_PREFIX}{}", self.account)
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            StorageError::Unavailable(format!("Failed to open keychain entry {key}: {e}"))
        })
    }

    fn get_secret(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::Io(format!("Failed to retrieve secret for {key}: {e}"))),
        }
    }

    fn set_secret(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| StorageError::Io(format!("Failed to store secret for {key}: {e}")))
    }

    fn delete_secret(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StorageError::Io(format!("Failed to delete secret for {key}: {e}"))),
        }
    }
}

#[async_trait]
impl CredentialStore for KeychainCredentialStore {
    async fn load(&self) -> Result<Option<CredentialPair>, StorageError> {
        debug!(service = %self.service_name, account = %self.account, "Retrieving credentials");

        let access = self.get_secret(&self.access_key())?;
        let refresh = self.get_secret(&self.refresh_key())?;

        match (access, refresh) {
            (Some(access), Some(refresh)) => Ok(Some(CredentialPair::new(access, refresh))),
            (None, None) => Ok(None),
            _ => Err(StorageError::Corrupt(format!(
                "keychain holds half a credential pair for account {}",
                self.account
            ))),
        }
    }

    async fn save(&self, pair: &CredentialPair) -> Result<(), StorageError> {
        debug!(service = %self.service_name, account = %self.account, "Storing credentials");

        self.set_secret(&self.refresh_key(), &pair.refresh_token)?;
        self.set_secret(&self.access_key(), &pair.access_token)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        debug!(service = %self.service_name, account = %self.account, "Deleting credentials");

        self.delete_secret(&self.access_key())?;
        self.delete_secret(&self.refresh_key())?;
        Ok(())
    }
}
