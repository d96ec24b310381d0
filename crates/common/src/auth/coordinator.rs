//! Single-flight credential renewal
//!
//! The coordinator owns the only shared renewal state in the process. A
//! renewal request either starts the exchange or attaches to the one already
//! running; the check and the transition to in-progress happen under one
//! synchronous lock with no `.await` in between.
//!
//! The exchange itself runs on a spawned task. Callers only hold a shared
//! handle to its outcome, so a caller that is cancelled (or stops waiting
//! after the configured bound) never cancels the exchange for the others.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use carelink_domain::{CredentialPair, SessionEndReason};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::session::SessionTerminator;
use super::traits::{CredentialStore, RenewalExchange};
use super::types::{RenewalError, RenewedCredential};

type SharedRenewal = Shared<BoxFuture<'static, Result<String, RenewalError>>>;

enum RenewalState {
    Idle,
    InProgress { id: u64, outcome: SharedRenewal },
}

/// Returns the state to idle when the exchange task finishes, including when
/// it panics.
struct SettleGuard {
    state: Arc<Mutex<RenewalState>>,
    id: u64,
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if matches!(&*state, RenewalState::InProgress { id, .. } if *id == self.id) {
            *state = RenewalState::Idle;
        }
    }
}

/// Exchanges refresh tokens for access tokens, at most one exchange at a time
///
/// On success the new access token (and a rotated refresh token, if the
/// server sent one) is persisted before any waiter sees the result. On any
/// failure the session is terminated, which clears the credential store.
///
/// A session that ends while the exchange is in flight stays ended: the
/// result is discarded and waiters get [`RenewalError::Superseded`].
pub struct RefreshCoordinator {
    exchange: Arc<dyn RenewalExchange>,
    store: Arc<dyn CredentialStore>,
    terminator: Arc<SessionTerminator>,
    state: Arc<Mutex<RenewalState>>,
    started: AtomicU64,
    wait_timeout: Option<Duration>,
}

impl RefreshCoordinator {
    /// Create an idle coordinator with no wait bound.
    pub fn new(
        exchange: Arc<dyn RenewalExchange>,
        store: Arc<dyn CredentialStore>,
        terminator: Arc<SessionTerminator>,
    ) -> Self {
        Self {
            exchange,
            store,
            terminator,
            state: Arc::new(Mutex::new(RenewalState::Idle)),
            started: AtomicU64::new(0),
            wait_timeout: None,
        }
    }

    /// Bound how long a single caller waits on the exchange.
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Number of exchanges started since construction.
    #[must_use]
    pub fn exchanges_started(&self) -> u64 {
        self.started.load(Ordering::Acquire)
    }

    /// Whether an exchange is currently in flight.
    #[must_use]
    pub fn is_renewing(&self) -> bool {
        matches!(&*self.state.lock(), RenewalState::InProgress { .. })
    }

    /// Obtain a new access token for `refresh_token`.
    ///
    /// If an exchange is already running, waits for it instead of starting
    /// another and receives the same outcome.
    ///
    /// # Errors
    /// Returns the exchange's `RenewalError` (shared by every waiter), or
    /// `RenewalError::TimedOut` if this caller's wait bound elapsed first.
    #[instrument(skip_all)]
    pub async fn renew(&self, refresh_token: &str) -> Result<String, RenewalError> {
        let outcome = self.join_or_start(refresh_token);

        match self.wait_timeout {
            Some(limit) => tokio::time::timeout(limit, outcome).await.map_err(|_| {
                warn!(timeout = ?limit, "gave up waiting on renewal");
                RenewalError::TimedOut(limit)
            })?,
            None => outcome.await,
        }
    }

    fn join_or_start(&self, refresh_token: &str) -> SharedRenewal {
        let mut state = self.state.lock();

        if let RenewalState::InProgress { id, outcome } = &*state {
            debug!(renewal_id = id, "joining in-flight renewal");
            return outcome.clone();
        }

        let id = self.started.fetch_add(1, Ordering::AcqRel) + 1;
        info!(renewal_id = id, "starting renewal exchange");

        let guard = SettleGuard { state: Arc::clone(&self.state), id };
        let exchange = Arc::clone(&self.exchange);
        let store = Arc::clone(&self.store);
        let terminator = Arc::clone(&self.terminator);
        let refresh_token = refresh_token.to_owned();
        let epoch = terminator.epoch();

        let task = tokio::spawn(async move {
            let _guard = guard;
            let session = Session { store: store.as_ref(), terminator: &terminator, epoch };
            run_exchange(exchange.as_ref(), &session, refresh_token).await
        });

        let outcome = async move {
            task.await.unwrap_or_else(|e| Err(RenewalError::Interrupted(e.to_string())))
        }
        .boxed()
        .shared();

        *state = RenewalState::InProgress { id, outcome: outcome.clone() };
        outcome
    }
}

/// The session a renewal was started for.
struct Session<'a> {
    store: &'a dyn CredentialStore,
    terminator: &'a SessionTerminator,
    epoch: u64,
}

impl Session<'_> {
    fn is_current(&self) -> bool {
        self.terminator.epoch() == self.epoch
    }
}

async fn run_exchange(
    exchange: &dyn RenewalExchange,
    session: &Session<'_>,
    refresh_token: String,
) -> Result<String, RenewalError> {
    let result = match exchange.exchange(&refresh_token).await {
        Ok(renewed) => persist(session, renewed, refresh_token).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(access_token) => Ok(access_token),
        Err(RenewalError::Superseded) => {
            info!("session changed during renewal; result discarded");
            Err(RenewalError::Superseded)
        }
        Err(err) if !session.is_current() => {
            // The session this exchange served is already gone.
            warn!(error = %err, "renewal failed after session changed");
            Err(err)
        }
        Err(err) => {
            warn!(error = %err, "renewal failed; ending session");
            let ended = session.terminator.terminate(SessionEndReason::RenewalFailed).await;
            if let Err(clear_err) = ended {
                error!(error = %clear_err, "could not clear credentials after failed renewal");
                return Err(RenewalError::Storage(clear_err));
            }
            Err(err)
        }
    }
}

async fn persist(
    session: &Session<'_>,
    renewed: RenewedCredential,
    refresh_token: String,
) -> Result<String, RenewalError> {
    if renewed.access_token.trim().is_empty() {
        return Err(RenewalError::Malformed("renewal returned an empty access token".into()));
    }

    let rotated = renewed.refresh_token.is_some();
    let pair = CredentialPair::new(
        renewed.access_token,
        renewed.refresh_token.filter(|r| !r.trim().is_empty()).unwrap_or(refresh_token),
    );

    if !session.is_current() {
        return Err(RenewalError::Superseded);
    }
    session.store.save(&pair).await?;

    // A termination that landed during the save may have cleared the store
    // before this pair was written.
    if !session.is_current() {
        if session.store.load().await?.as_ref() == Some(&pair) {
            session.store.clear().await?;
        }
        return Err(RenewalError::Superseded);
    }

    info!(rotated, "renewal succeeded");
    Ok(pair.access_token)
}
