//! Credential store construction from configuration

use std::sync::Arc;

use carelink_common::auth::{
    CredentialStore, FileCredentialStore, KeychainCredentialStore, MemoryCredentialStore,
};
use carelink_domain::CredentialStoreConfig;
use tracing::debug;

/// Build the credential store described by `config`.
pub fn build_store(config: &CredentialStoreConfig) -> Arc<dyn CredentialStore> {
    debug!(kind = %config.kind(), "creating credential store");
    match config {
        CredentialStoreConfig::Memory => Arc::new(MemoryCredentialStore::new()),
        CredentialStoreConfig::File { path } => Arc::new(FileCredentialStore::new(path.clone())),
        CredentialStoreConfig::Keychain { service, account } => {
            Arc::new(KeychainCredentialStore::new(service.clone(), account.clone()))
        }
    }
}
