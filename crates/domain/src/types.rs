//! Session data types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CareLinkError, Result};
use crate::impl_domain_status_conversions;

/// Access token plus its renewal partner.
///
/// A bearer never exists without its refresh token: callers hold an
/// `Option<CredentialPair>` and "absent" means both are gone.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    /// Short-lived token sent as `Authorization: Bearer <access_token>`
    pub access_token: String,

    /// Longer-lived token exchanged for a new access token
    pub refresh_token: String,
}

impl CredentialPair {
    /// Create a pair without validation.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
    }

    /// Create a pair, rejecting empty or whitespace-only tokens.
    ///
    /// # Errors
    /// Returns `CareLinkError::InvalidInput` if either token is blank.
    pub fn try_new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Result<Self> {
        let pair = Self::new(access_token, refresh_token);
        if pair.access_token.trim().is_empty() {
            return Err(CareLinkError::InvalidInput("access token is empty".into()));
        }
        if pair.refresh_token.trim().is_empty() {
            return Err(CareLinkError::InvalidInput("refresh token is empty".into()));
        }
        Ok(pair)
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("{}{}", crate::constants::BEARER_PREFIX, self.access_token)
    }

    /// Replace the access token in place, keeping the refresh token.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = access_token.into();
        self
    }
}

// Tokens never reach logs through Debug formatting.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Unverified claims read from the payload segment of a JWT access token.
///
/// Only used to identify the signed-in user and report expiry; the client
/// never makes trust decisions from these values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Backend user identifier
    #[serde(default)]
    pub user_id: Option<i64>,

    /// Expiry as seconds since the Unix epoch
    #[serde(default)]
    pub exp: Option<i64>,

    /// Token kind ("access" or "refresh")
    #[serde(default)]
    pub token_type: Option<String>,

    /// Token identifier
    #[serde(default)]
    pub jti: Option<String>,
}

impl TokenClaims {
    /// Absolute expiry, if the token carries one.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }

    /// Whether the token has expired relative to `now`.
    ///
    /// Tokens without an `exp` claim are treated as not expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expiry| expiry <= now)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    /// The host asked to log out
    Logout,
    /// The renewal exchange failed
    RenewalFailed,
    /// An authorization failure could not be recovered by renewal
    Unauthorized,
}

impl_domain_status_conversions!(SessionEndReason {
    Logout => "logout",
    RenewalFailed => "renewal_failed",
    Unauthorized => "unauthorized",
});
