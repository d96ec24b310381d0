//! Session termination and host notification

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use carelink_domain::SessionEndReason;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::traits::CredentialStore;
use super::types::{SessionEvent, StorageError};

const EVENT_CAPACITY: usize = 16;

/// Ends the session: clears the credential store and tells the host.
///
/// The host subscribes with [`SessionTerminator::subscribe`] and decides what
/// "signed out" means for it (redirect, reset state, prompt for login).
/// Exactly one [`SessionEvent::Ended`] is broadcast per termination; further
/// calls still clear the store but stay silent until
/// [`SessionTerminator::arm`] is called for a new session.
///
/// Every termination and every `arm` advances the session epoch. Work that
/// started under one epoch (a renewal exchange) must not write credentials
/// once the epoch has moved on.
pub struct SessionTerminator {
    store: Arc<dyn CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
    ended: AtomicBool,
    epoch: AtomicU64,
}

impl SessionTerminator {
    /// Create a terminator that clears `store`.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { store, events, ended: AtomicBool::new(false), epoch: AtomicU64::new(0) }
    }

    /// Current session epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Receive session events from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Clear credentials and broadcast the end of the session.
    ///
    /// # Errors
    /// Returns error if the credential store cannot be cleared; the event is
    /// not sent in that case.
    pub async fn terminate(&self, reason: SessionEndReason) -> Result<(), StorageError> {
        // Advance before clearing so a racing renewal sees the change.
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.store.clear().await?;

        if self.ended.swap(true, Ordering::AcqRel) {
            debug!(%reason, "session already ended");
            return Ok(());
        }

        info!(%reason, "session ended");
        // Nobody listening is fine.
        let _ = self.events.send(SessionEvent::Ended { reason });
        Ok(())
    }

    /// Re-enable notification after a new session was established.
    ///
    /// `carelink_infra::AuthApi::login` does this itself. A host that
    /// restores credentials by writing to the store directly must call it
    /// too, or the next end of session goes unreported.
    pub fn arm(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.ended.store(false, Ordering::Release);
    }

    /// Whether the session has ended and no new one was armed since.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }
}
