//! Testing utilities and helpers
//!
//! - **[`mocks`]**: Scripted credential store and renewal exchange
//! - **[`async_utils`]**: Polling helpers for asynchronous assertions
//!
//! Available to this crate's tests and, with the `test-utils` feature, to
//! downstream test suites.

pub mod async_utils;
pub mod mocks;

pub use async_utils::poll_until;
pub use mocks::{MockCredentialStore, MockRenewalExchange};
