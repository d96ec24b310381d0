//! Traits for credential storage and renewal exchange
//!
//! These traits enable dependency injection and testing by abstracting
//! external dependencies (storage medium, renewal endpoint).

use async_trait::async_trait;
use carelink_domain::CredentialPair;

use super::types::{RenewalError, RenewedCredential, StorageError};

/// Durable key-value persistence of the current credential pair
///
/// Pure storage: implementations hold no session logic. A missing pair is
/// `Ok(None)`, never an error.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the current pair
    ///
    /// # Errors
    /// Returns error if the storage medium fails or holds unreadable data
    async fn load(&self) -> Result<Option<CredentialPair>, StorageError>;

    /// Replace the stored pair
    ///
    /// # Errors
    /// Returns error if the write fails
    async fn save(&self, pair: &CredentialPair) -> Result<(), StorageError>;

    /// Remove the stored pair (idempotent)
    ///
    /// # Errors
    /// Returns error if the storage medium fails
    async fn clear(&self) -> Result<(), StorageError>;
}

/// The network call trading a refresh token for a new access token
#[async_trait]
pub trait RenewalExchange: Send + Sync {
    /// Exchange `refresh_token` at the renewal endpoint
    ///
    /// # Errors
    /// Returns error on transport failure, non-success status or an unusable
    /// response body. Implementations must not retry.
    async fn exchange(&self, refresh_token: &str) -> Result<RenewedCredential, RenewalError>;
}
