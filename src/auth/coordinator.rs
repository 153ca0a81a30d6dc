//! Single-flight access-credential refresh.
//!
//! The first caller that needs a fresh credential starts one refresh round;
//! callers arriving while it runs queue behind it and receive the same
//! outcome. The flag check/enqueue and the flag reset/drain happen under the
//! same mutex, so no caller can join a round once its drain has begun.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::invalidator::SessionInvalidator;
use super::refresh::{RefreshOperation, RotationPolicy};
use super::store::CredentialStore;

type Outcome = Result<String, AuthError>;

/// Coordinates refreshes of the access credential.
///
/// Cheap to clone; clones share the same state.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use hackportal::auth::{
///     ClearSession, HttpRefreshOperation, MemoryCredentialStore, RefreshCoordinator,
/// };
///
/// # async fn example() -> Result<(), hackportal::auth::AuthError> {
/// let store = Arc::new(MemoryCredentialStore::new());
/// let coordinator = RefreshCoordinator::new(
///     store.clone(),
///     Arc::new(HttpRefreshOperation::new(
///         reqwest::Client::new(),
///         "https://portal.example.org/api/auth/refresh",
///     )),
///     Arc::new(ClearSession::new(store)),
/// );
/// let access = coordinator.obtain_fresh_credential().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
    rotation: RotationPolicy,
    timeout: Option<Duration>,
}

struct Inner {
    store: Arc<dyn CredentialStore>,
    operation: Arc<dyn RefreshOperation>,
    invalidator: Arc<dyn SessionInvalidator>,
    state: Mutex<RefreshState>,
    rounds: AtomicU64,
}

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<Outcome>>,
    settled_rounds: u64,
}

enum Admission {
    Joined(oneshot::Receiver<Outcome>),
    Started {
        receiver: oneshot::Receiver<Outcome>,
        refresh_token: String,
    },
    AlreadyFresh(String),
    Rejected(AuthError),
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        operation: Arc<dyn RefreshOperation>,
        invalidator: Arc<dyn SessionInvalidator>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                operation,
                invalidator,
                state: Mutex::new(RefreshState::default()),
                rounds: AtomicU64::new(0),
            }),
            rotation: RotationPolicy::default(),
            timeout: None,
        }
    }

    pub fn with_rotation(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }

    /// Fail a refresh round that takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Obtain a new access credential, joining an in-flight refresh if one
    /// is running.
    pub async fn obtain_fresh_credential(&self) -> Result<String, AuthError> {
        self.obtain_fresh_credential_for(None).await
    }

    /// Like [`obtain_fresh_credential`](Self::obtain_fresh_credential), for a
    /// caller whose request was rejected while carrying `stale`.
    ///
    /// When no refresh is running and the store already holds a different
    /// access credential, a round finished after the caller's request went
    /// out; that credential is returned without another refresh.
    pub async fn obtain_fresh_credential_for(&self, stale: Option<&str>) -> Result<String, AuthError> {
        let receiver = match self.admit(stale) {
            Admission::Joined(receiver) => {
                debug!("queued behind in-flight refresh");
                receiver
            }
            Admission::Started {
                receiver,
                refresh_token,
            } => {
                let round = RefreshRound {
                    inner: self.inner.clone(),
                    rotation: self.rotation,
                    timeout: self.timeout,
                    settled: false,
                };
                tokio::spawn(round.run(refresh_token));
                receiver
            }
            Admission::AlreadyFresh(access_token) => {
                debug!("credential already refreshed by an earlier round");
                return Ok(access_token);
            }
            Admission::Rejected(error) => {
                warn!(%error, "cannot refresh access credential");
                self.inner.invalidator.invalidate();
                return Err(error);
            }
        };
        receiver.await.unwrap_or(Err(AuthError::RefreshAborted))
    }

    /// Whether a refresh round is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.inner.lock_state().in_flight
    }

    /// Number of callers waiting on the current round.
    pub fn pending_waiters(&self) -> usize {
        self.inner.lock_state().waiters.len()
    }

    /// Number of refresh rounds started so far.
    pub fn rounds_started(&self) -> u64 {
        self.inner.rounds.load(Ordering::SeqCst)
    }

    fn admit(&self, stale: Option<&str>) -> Admission {
        // The store is read outside the state lock. A round settling in
        // between bumps `settled_rounds` and the read is redone.
        loop {
            let seen = {
                let mut state = self.inner.lock_state();
                if state.in_flight {
                    return state.join();
                }
                state.settled_rounds
            };
            let loaded = self.inner.store.load();
            let mut state = self.inner.lock_state();
            if state.in_flight {
                return state.join();
            }
            if state.settled_rounds != seen {
                continue;
            }
            let pair = match loaded {
                Ok(Some(pair)) => pair,
                Ok(None) => return Admission::Rejected(AuthError::RefreshCredentialMissing),
                Err(error) => return Admission::Rejected(error),
            };
            if stale.is_some_and(|stale| stale != pair.access_token) {
                return Admission::AlreadyFresh(pair.access_token);
            }
            let (sender, receiver) = oneshot::channel();
            state.in_flight = true;
            state.waiters.push(sender);
            let round = self.inner.rounds.fetch_add(1, Ordering::SeqCst) + 1;
            info!(round, "starting access credential refresh");
            return Admission::Started {
                receiver,
                refresh_token: pair.refresh_token,
            };
        }
    }
}

impl RefreshState {
    fn join(&mut self) -> Admission {
        let (sender, receiver) = oneshot::channel();
        self.waiters.push(sender);
        Admission::Joined(receiver)
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        rotation: RotationPolicy,
        timeout: Option<Duration>,
    ) -> Outcome {
        let grant = match timeout {
            Some(limit) => {
                let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                tokio::time::timeout(limit, self.operation.refresh(refresh_token))
                    .await
                    .unwrap_or_else(|_| Err(AuthError::Timeout(millis)))?
            }
            None => self.operation.refresh(refresh_token).await?,
        };
        let credentials = grant.into_credentials(refresh_token, rotation)?;
        self.store.save(&credentials)?;
        Ok(credentials.access_token)
    }

    fn settle(&self, outcome: Outcome) {
        match &outcome {
            Ok(_) => info!("access credential refreshed"),
            Err(error) => {
                warn!(%error, "access credential refresh failed");
                self.invalidator.invalidate();
            }
        }
        let waiters = {
            let mut state = self.lock_state();
            state.in_flight = false;
            state.settled_rounds += 1;
            std::mem::take(&mut state.waiters)
        };
        debug!(waiters = waiters.len(), "settling refresh waiters");
        for waiter in waiters {
            // A dropped receiver means the caller gave up waiting.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// One refresh round. Settles the queue exactly once, even if the round is
/// dropped or panics before finishing.
struct RefreshRound {
    inner: Arc<Inner>,
    rotation: RotationPolicy,
    timeout: Option<Duration>,
    settled: bool,
}

impl RefreshRound {
    async fn run(mut self, refresh_token: String) {
        let outcome = self
            .inner
            .refresh(&refresh_token, self.rotation, self.timeout)
            .await;
        self.settled = true;
        self.inner.settle(outcome);
    }
}

impl Drop for RefreshRound {
    fn drop(&mut self) {
        if !self.settled {
            self.inner.settle(Err(AuthError::RefreshAborted));
        }
    }
}
