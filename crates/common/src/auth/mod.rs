//! Credential lifecycle for bearer-authenticated API clients
//!
//! This module owns everything about the credential pair that does not touch
//! HTTP directly: where it is stored, how a renewal is coordinated, and how
//! the session is ended.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │ RefreshCoordinator │  single-flight renewal
//! └─────────┬──────────┘
//!           │
//!           ├──► RenewalExchange    (renewal endpoint, implemented in infra)
//!           ├──► CredentialStore    (memory / file / keychain)
//!           └──► SessionTerminator  (clear store + broadcast SessionEvent)
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: `StorageError`, `RenewalError`, `RenewedCredential`, `SessionEvent`
//! - **[`traits`]**: `CredentialStore`, `RenewalExchange`
//! - **[`coordinator`]**: `RefreshCoordinator`
//! - **[`session`]**: `SessionTerminator`
//! - **[`claims`]**: unverified JWT payload decoding

pub mod claims;
pub mod coordinator;
mod file_store;
#[cfg(feature = "platform")]
mod keychain;
mod memory;
pub mod session;
pub mod traits;
pub mod types;

pub use claims::decode_claims;
pub use coordinator::RefreshCoordinator;
pub use file_store::FileCredentialStore;
#[cfg(feature = "platform")]
pub use keychain::KeychainCredentialStore;
pub use memory::MemoryCredentialStore;
pub use session::SessionTerminator;
pub use traits::{CredentialStore, RenewalExchange};
pub use types::{RenewalError, RenewedCredential, SessionEvent, StorageError};
