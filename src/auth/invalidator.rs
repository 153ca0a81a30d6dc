use std::sync::{Arc, Mutex};

use super::store::CredentialStore;

/// Hook run when the session ends, e.g. resetting cached state and returning
/// the UI to the sign-in page.
pub type ResetHook = Box<dyn Fn() + Send + Sync>;

/// Ends the current session.
///
/// Called by the refresh coordinator when no refresh credential exists or the
/// refresh fails. Implementations must tolerate repeated and concurrent calls.
pub trait SessionInvalidator: Send + Sync {
    fn invalidate(&self);
}

/// Default invalidator: clears the credential store and runs an optional
/// reset hook.
///
/// The hook fires once per transition to the signed-out state. Further calls
/// while already signed out only clear the (empty) store again.
pub struct ClearSession {
    store: Arc<dyn CredentialStore>,
    on_reset: Option<ResetHook>,
    signed_out: Mutex<bool>,
}

impl ClearSession {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            on_reset: None,
            signed_out: Mutex::new(false),
        }
    }

    pub fn with_reset_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_reset = Some(Box::new(hook));
        self
    }
}

impl SessionInvalidator for ClearSession {
    fn invalidate(&self) {
        let mut signed_out = self
            .signed_out
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let had_credentials = matches!(self.store.load(), Ok(Some(_)));
        if let Err(error) = self.store.clear() {
            tracing::warn!(%error, "failed to clear stored credentials");
        }
        if had_credentials || !*signed_out {
            *signed_out = true;
            tracing::info!("session invalidated");
            if let Some(hook) = &self.on_reset {
                hook();
            }
        } else {
            tracing::debug!("session already invalidated");
        }
    }
}

impl<F> SessionInvalidator for F
where
    F: Fn() + Send + Sync,
{
    fn invalidate(&self) {
        self()
    }
}
