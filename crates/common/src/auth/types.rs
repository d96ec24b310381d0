//! Session lifecycle types
//!
//! Error enums for the storage and renewal boundaries plus the event the
//! session terminator broadcasts to the host.

use std::time::Duration;

use carelink_domain::SessionEndReason;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Credential store failure.
///
/// Fatal to the operation that hit it; callers propagate it rather than
/// retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The storage medium could not be reached (keychain locked, no backend)
    #[error("Credential storage unavailable: {0}")]
    Unavailable(String),

    /// Stored data exists but cannot be turned back into a credential pair
    #[error("Stored credentials are corrupt: {0}")]
    Corrupt(String),

    /// Read or write failed
    #[error("Credential storage I/O failed: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// The renewal exchange failed or could not be awaited.
///
/// `Clone` because one outcome is fanned out to every request waiting on the
/// same exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenewalError {
    /// The renewal endpoint answered with a non-success status
    #[error("Renewal rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status of the refusal
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The renewal endpoint could not be reached
    #[error("Renewal request failed: {0}")]
    Network(String),

    /// The renewal endpoint answered 2xx with an unusable body
    #[error("Malformed renewal response: {0}")]
    Malformed(String),

    /// Persisting or clearing credentials failed while settling the exchange
    #[error("Renewal could not update credentials: {0}")]
    Storage(#[from] StorageError),

    /// This caller stopped waiting; the exchange may still settle for others
    #[error("Renewal did not settle within {0:?}")]
    TimedOut(Duration),

    /// The session ended while the exchange was in flight; its result was
    /// discarded
    #[error("Session ended during renewal")]
    Superseded,

    /// The task running the exchange panicked or was aborted
    #[error("Renewal task interrupted: {0}")]
    Interrupted(String),
}

impl RenewalError {
    /// Whether this outcome ended the session.
    ///
    /// A timed-out wait says nothing about the exchange itself, so it leaves
    /// the session alone.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::TimedOut(_))
    }
}

/// Tokens returned by a successful renewal exchange
#[derive(Clone, PartialEq, Eq)]
pub struct RenewedCredential {
    /// Fresh access token
    pub access_token: String,

    /// Present only when the server rotates refresh tokens
    pub refresh_token: Option<String>,
}

impl RenewedCredential {
    /// Renewal that keeps the current refresh token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: None }
    }

    /// Renewal that also rotated the refresh token.
    #[must_use]
    pub fn rotated(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: Some(refresh_token.into()) }
    }
}

impl std::fmt::Debug for RenewedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenewedCredential")
            .field("access_token", &"<redacted>")
            .field("rotated", &self.refresh_token.is_some())
            .finish()
    }
}

/// Notification sent to the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Credentials were cleared; the host should return to its signed-out
    /// state
    Ended { reason: SessionEndReason },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_out_is_not_terminal() {
        assert!(!RenewalError::TimedOut(Duration::from_secs(1)).is_terminal());
        assert!(RenewalError::Rejected { status: 401, body: String::new() }.is_terminal());
        assert!(RenewalError::Network("refused".into()).is_terminal());
    }

    #[test]
    fn storage_error_converts_into_renewal_error() {
        let err: RenewalError = StorageError::Io("disk full".into()).into();
        assert_eq!(err, RenewalError::Storage(StorageError::Io("disk full".into())));
    }

    #[test]
    fn renewed_credential_debug_is_redacted() {
        let renewed = RenewedCredential::rotated("A2", "R2");
        let rendered = format!("{renewed:?}");
        assert!(!rendered.contains("A2"));
        assert!(rendered.contains("rotated: true"));
    }

    #[test]
    fn session_event_serializes_with_reason() {
        let event = SessionEvent::Ended { reason: SessionEndReason::RenewalFailed };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"ended","reason":"renewal_failed"}"#);
    }
}
