//! Credential storage, refresh coordination and session invalidation.

pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod invalidator;
pub mod refresh;
pub mod store;

pub use coordinator::RefreshCoordinator;
pub use credentials::CredentialPair;
pub use error::AuthError;
pub use invalidator::{ClearSession, ResetHook, SessionInvalidator};
pub use refresh::{HttpRefreshOperation, RefreshGrant, RefreshOperation, RotationPolicy};
pub use store::{CredentialStore, CredentialStoreConfig, FileCredentialStore, MemoryCredentialStore};
