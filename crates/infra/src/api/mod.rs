//! Session-aware API client for the CareLink backend
//!
//! This module attaches bearer credentials to outgoing requests and recovers
//! from expired access tokens without involving the caller.
//!
//! # Architecture
//!
//! - [`RequestEnvelope`] describes a request independently of credentials
//! - [`ApiClient`] decorates, sends, classifies 401s and replays once after
//!   renewal through the shared `RefreshCoordinator`
//! - [`HttpRenewalClient`] performs the refresh exchange on the bare
//!   transport
//! - [`AuthApi`] signs in and out
//!
//! Access and refresh tokens never appear in log output.

pub mod auth;
pub mod client;
pub mod errors;
pub mod request;

pub use auth::{AuthApi, HttpRenewalClient, LoginOutcome};
pub use client::{ApiClient, ApiClientBuilder};
pub use errors::{ApiError, ApiErrorCategory};
pub use request::RequestEnvelope;
