//! Mock implementations of the auth traits
//!
//! Provides mock objects for testing purposes.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use carelink_domain::CredentialPair;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::auth::{
    CredentialStore, MemoryCredentialStore, RenewalError, RenewalExchange, RenewedCredential,
    StorageError,
};

type Outcome = Result<RenewedCredential, RenewalError>;

/// Scripted renewal exchange
///
/// Answers from a queue of outcomes; the last outcome repeats once the queue
/// is down to one. A gated mock holds every exchange until
/// [`MockRenewalExchange::release`] is called, which lets tests pile up
/// concurrent callers behind a single in-flight exchange.
#[derive(Debug)]
pub struct MockRenewalExchange {
    outcomes: Mutex<VecDeque<Outcome>>,
    received: Mutex<Vec<String>>,
    calls: AtomicUsize,
    gate: Option<watch::Sender<bool>>,
}

impl MockRenewalExchange {
    /// Answer with the given outcomes in order.
    pub fn with_outcomes(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            received: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Always renew to `access_token`, keeping the refresh token.
    pub fn succeeding(access_token: &str) -> Self {
        Self::with_outcomes(vec![Ok(RenewedCredential::new(access_token))])
    }

    /// Always renew to `access_token` and rotate the refresh token.
    pub fn rotating(access_token: &str, refresh_token: &str) -> Self {
        Self::with_outcomes(vec![Ok(RenewedCredential::rotated(access_token, refresh_token))])
    }

    /// Always fail with `error`.
    pub fn failing(error: RenewalError) -> Self {
        Self::with_outcomes(vec![Err(error)])
    }

    /// Hold every exchange until [`Self::release`].
    #[must_use]
    pub fn gated(mut self) -> Self {
        let (gate, _) = watch::channel(false);
        self.gate = Some(gate);
        self
    }

    /// Open the gate for current and future exchanges.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.send_replace(true);
        }
    }

    /// Number of exchanges performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Refresh tokens received, in call order.
    pub fn received_tokens(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    fn next_outcome(&self) -> Outcome {
        let mut outcomes = self.outcomes.lock();
        if outcomes.len() > 1 {
            if let Some(outcome) = outcomes.pop_front() {
                return outcome;
            }
        }
        outcomes
            .front()
            .cloned()
            .unwrap_or_else(|| Err(RenewalError::Malformed("no scripted outcome".into())))
    }
}

#[async_trait]
impl RenewalExchange for MockRenewalExchange {
    async fn exchange(&self, refresh_token: &str) -> Result<RenewedCredential, RenewalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(refresh_token.to_string());

        if let Some(gate) = &self.gate {
            let mut open = gate.subscribe();
            // The sender lives as long as the mock, so this only ends once open.
            let _ = open.wait_for(|released| *released).await;
        }

        self.next_outcome()
    }
}

/// In-memory credential store with switchable failures
#[derive(Debug, Default)]
pub struct MockCredentialStore {
    inner: MemoryCredentialStore,
    fail_load: AtomicBool,
    fail_save: AtomicBool,
    fail_clear: AtomicBool,
    saves: AtomicUsize,
    clears: AtomicUsize,
}

impl MockCredentialStore {
    /// Empty store that never fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `pair`.
    pub fn with_pair(pair: CredentialPair) -> Self {
        Self { inner: MemoryCredentialStore::with_pair(pair), ..Self::default() }
    }

    /// Make `load` fail while set.
    pub fn fail_loads(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    /// Make `save` fail while set.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    /// Make `clear` fail while set.
    pub fn fail_clears(&self, fail: bool) {
        self.fail_clear.store(fail, Ordering::SeqCst);
    }

    /// Successful saves so far.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Successful clears so far.
    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    /// Currently stored pair.
    pub fn snapshot(&self) -> Option<CredentialPair> {
        self.inner.snapshot()
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn load(&self) -> Result<Option<CredentialPair>, StorageError> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("mock load failure".into()));
        }
        self.inner.load().await
    }

    async fn save(&self, pair: &CredentialPair) -> Result<(), StorageError> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(StorageError::Io("mock save failure".into()));
        }
        self.inner.save(pair).await?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(StorageError::Io("mock clear failure".into()));
        }
        self.inner.clear().await?;
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
