//! Shared session machinery for CareLink clients.
//!
//! # Feature Tiers
//!
//! - default: credential stores (memory, file), renewal coordination,
//!   session termination
//! - `platform`: platform keychain credential store
//! - `test-utils`: scripted mocks for downstream test suites

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use auth::{
    CredentialStore, RefreshCoordinator, RenewalError, RenewalExchange, SessionEvent,
    SessionTerminator, StorageError,
};
