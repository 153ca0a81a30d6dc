//! Sign-in, sign-out and session status.

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, warn};

use super::client::AuthClient;
use super::request::RequestDescriptor;
use crate::auth::{AuthError, CredentialPair};
use crate::error::{PortalError, Result};

/// Whether the store currently holds a usable credential pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SessionStatus {
    SignedIn,
    SignedOut,
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignOutRequest<'a> {
    refresh_token: &'a str,
}

impl AuthClient {
    /// Exchange email and password for a credential pair and persist it.
    ///
    /// The login endpoint is exempt from refresh handling, so a 401 here is
    /// reported as [`AuthError::InvalidCredentials`].
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CredentialPair> {
        let request = RequestDescriptor::post(self.config.primary_login_path())
            .with_json(&SignInRequest { email, password })?;
        let response = match self.send(request).await {
            Ok(response) => response,
            Err(PortalError::Api { status: 400 | 401 | 403, .. }) => {
                return Err(AuthError::InvalidCredentials.into())
            }
            Err(other) => return Err(other),
        };
        let payload: SignInResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let credentials = CredentialPair::from_parts(payload.access_token, payload.refresh_token)
            .ok_or_else(|| {
                AuthError::InvalidResponse("login response missing credentials".to_string())
            })?;
        self.store.save(&credentials)?;
        info!("signed in");
        Ok(credentials)
    }

    /// Revoke the refresh credential on the backend (best effort) and end the
    /// local session.
    ///
    /// The local session is ended even when the stored credentials cannot be
    /// read.
    pub async fn sign_out(&self) -> Result<()> {
        let stored = self.store.load().unwrap_or_else(|error| {
            warn!(%error, "cannot read stored credentials; skipping logout request");
            None
        });
        if let Some(credentials) = stored {
            let request = RequestDescriptor::post(self.config.logout_path.clone()).with_json(
                &SignOutRequest {
                    refresh_token: &credentials.refresh_token,
                },
            )?;
            match self.dispatch(&request, Some(&credentials.access_token)).await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    warn!(status = response.status().as_u16(), "logout request rejected")
                }
                Err(error) => warn!(%error, "logout request failed"),
            }
        }
        self.invalidator.invalidate();
        info!("signed out");
        Ok(())
    }

    pub fn session_status(&self) -> Result<SessionStatus> {
        Ok(match self.store.load()? {
            Some(_) => SessionStatus::SignedIn,
            None => SessionStatus::SignedOut,
        })
    }
}
