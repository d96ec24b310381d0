//! Protocol constants
//!
//! Centralized location for endpoint paths, header values and defaults shared
//! by the client crates.

// Endpoints
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const LOGIN_PATH: &str = "/token/";
pub const REFRESH_PATH: &str = "/token/refresh/";

// Headers
pub const BEARER_PREFIX: &str = "Bearer ";
pub const JSON_CONTENT_TYPE: &str = "application/json";

// Timeouts
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RENEWAL_TIMEOUT_SECS: u64 = 15;

// Credential storage
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "CareLink.session";
pub const DEFAULT_KEYCHAIN_ACCOUNT: &str = "main";
pub const DEFAULT_CREDENTIALS_FILE: &str = "carelink-credentials.json";
