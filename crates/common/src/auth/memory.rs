//! In-process credential store

use async_trait::async_trait;
use carelink_domain::CredentialPair;
use parking_lot::RwLock;

use super::traits::CredentialStore;
use super::types::StorageError;

/// Credential store backed by process memory.
///
/// The session does not survive a restart. Suitable for tests, CLIs that
/// log in on every run, and hosts that persist credentials themselves.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    pair: RwLock<Option<CredentialPair>>,
}

impl MemoryCredentialStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `pair`.
    #[must_use]
    pub fn with_pair(pair: CredentialPair) -> Self {
        Self { pair: RwLock::new(Some(pair)) }
    }

    /// Synchronous read for assertions and diagnostics.
    #[must_use]
    pub fn snapshot(&self) -> Option<CredentialPair> {
        self.pair.read().clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<CredentialPair>, StorageError> {
        Ok(self.pair.read().clone())
    }

    async fn save(&self, pair: &CredentialPair) -> Result<(), StorageError> {
        *self.pair.write() = Some(pair.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.pair.write() = None;
        Ok(())
    }
}
