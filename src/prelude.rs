//! Convenience re-exports for common use.

pub use crate::auth::{AuthError, CredentialPair, CredentialStore, SessionInvalidator};
pub use crate::config::ClientConfig;
pub use crate::error::{PortalError, Result};
pub use crate::http::{AuthClient, RequestDescriptor, SessionStatus};
