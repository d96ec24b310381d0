//! # CareLink Domain
//!
//! Domain types shared by the CareLink session client.
//!
//! This crate contains:
//! - The credential pair and decoded token claims
//! - Client and credential store configuration structures
//! - Domain error types and Result definitions
//! - Protocol constants (endpoint paths, header values)
//!
//! ## Architecture
//! - No dependencies on other CareLink crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
