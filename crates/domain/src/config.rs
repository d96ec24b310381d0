//! Configuration structures
//!
//! Loading lives in `carelink-infra::config`; this module only defines the
//! shapes and their defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_CREDENTIALS_FILE, DEFAULT_KEYCHAIN_ACCOUNT,
    DEFAULT_KEYCHAIN_SERVICE, DEFAULT_RENEWAL_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    LOGIN_PATH, REFRESH_PATH,
};
use crate::impl_domain_status_conversions;

/// Top-level configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Endpoints, timeouts and retry policy
    #[serde(default)]
    pub client: ClientConfig,
    /// Where the credential pair is kept
    #[serde(default)]
    pub store: CredentialStoreConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every relative request path is joined onto
    pub base_url: String,
    /// Authentication endpoint path
    pub login_path: String,
    /// Renewal endpoint path
    pub refresh_path: String,
    /// Per-request transport timeout
    pub request_timeout_secs: u64,
    /// Upper bound a request waits on an in-flight renewal; `None` waits for
    /// the transport to settle
    pub renewal_timeout_secs: Option<u64>,
    /// Transport attempts per send (1 = no transport-level retry)
    pub max_attempts: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_path: LOGIN_PATH.to_string(),
            refresh_path: REFRESH_PATH.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            renewal_timeout_secs: Some(DEFAULT_RENEWAL_TIMEOUT_SECS),
            max_attempts: 1,
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at `base_url` with every other field defaulted.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Resolve a request path against the base URL.
    ///
    /// Absolute `http(s)://` URLs are returned unchanged.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Absolute login endpoint.
    #[must_use]
    pub fn login_url(&self) -> String {
        self.endpoint(&self.login_path)
    }

    /// Absolute refresh endpoint.
    #[must_use]
    pub fn refresh_url(&self) -> String {
        self.endpoint(&self.refresh_path)
    }

    /// Timeout for a single resource request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Bound on how long one request waits for a renewal; `None` waits indefinitely.
    #[must_use]
    pub fn renewal_timeout(&self) -> Option<Duration> {
        self.renewal_timeout_secs.map(Duration::from_secs)
    }
}

/// Where the credential pair is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialStoreConfig {
    /// Process memory only; the session does not survive a restart
    Memory,
    /// JSON document on disk
    File { path: PathBuf },
    /// Platform keychain entry
    Keychain { service: String, account: String },
}

impl Default for CredentialStoreConfig {
    fn default() -> Self {
        Self::File { path: PathBuf::from(DEFAULT_CREDENTIALS_FILE) }
    }
}

impl CredentialStoreConfig {
    /// Keychain store under the default service and account names.
    #[must_use]
    pub fn default_keychain() -> Self {
        Self::Keychain {
            service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
            account: DEFAULT_KEYCHAIN_ACCOUNT.to_string(),
        }
    }

    /// Backend selected by this configuration.
    #[must_use]
    pub const fn kind(&self) -> StoreKind {
        match self {
            Self::Memory => StoreKind::Memory,
            Self::File { .. } => StoreKind::File,
            Self::Keychain { .. } => StoreKind::Keychain,
        }
    }
}

/// Discriminant of [`CredentialStoreConfig`], used for env-based selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    File,
    Keychain,
}

impl_domain_status_conversions!(StoreKind {
    Memory => "memory",
    File => "file",
    Keychain => "keychain",
});
