#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hackportal::auth::{CredentialPair, CredentialStore, MemoryCredentialStore, SessionInvalidator};
use hackportal::config::ClientConfig;
use hackportal::http::AuthClient;
use wiremock::MockServer;

/// Invalidator that clears the store and counts its calls.
pub struct RecordingInvalidator {
    store: Arc<dyn CredentialStore>,
    calls: AtomicUsize,
}

impl RecordingInvalidator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SessionInvalidator for RecordingInvalidator {
    fn invalidate(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.store.clear().expect("clear store");
    }
}

pub struct Harness {
    pub client: Arc<AuthClient>,
    pub store: Arc<MemoryCredentialStore>,
    pub invalidator: Arc<RecordingInvalidator>,
}

pub fn harness(server: &MockServer, credentials: Option<CredentialPair>) -> Harness {
    harness_with_config(ClientConfig::new(server.uri()), credentials)
}

pub fn harness_with_config(config: ClientConfig, credentials: Option<CredentialPair>) -> Harness {
    let store = Arc::new(match credentials {
        Some(pair) => MemoryCredentialStore::with_credentials(pair),
        None => MemoryCredentialStore::new(),
    });
    let invalidator = Arc::new(RecordingInvalidator::new(store.clone()));
    let client = AuthClient::new(config, store.clone(), invalidator.clone()).expect("build client");
    Harness {
        client: Arc::new(client),
        store,
        invalidator,
    }
}

pub fn pair(access: &str, refresh: &str) -> CredentialPair {
    CredentialPair::new(access, refresh)
}
