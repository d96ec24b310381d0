//! # CareLink Infrastructure
//!
//! I/O-facing implementations for the CareLink session client.
//!
//! This crate contains:
//! - The reqwest-backed HTTP transport
//! - The API client that decorates requests with bearer credentials and
//!   recovers from expired access tokens
//! - The renewal and login endpoints
//! - Configuration loading and credential store construction
//!
//! ## Architecture
//! - Implements the traits defined in `carelink-common::auth`
//! - Depends on `carelink-domain` and `carelink-common`
//! - Contains all network and filesystem code

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod store;

// Re-export commonly used items
pub use api::{
    ApiClient, ApiClientBuilder, ApiError, ApiErrorCategory, AuthApi, HttpRenewalClient,
    LoginOutcome, RequestEnvelope,
};
pub use http::HttpClient;
pub use store::build_store;
