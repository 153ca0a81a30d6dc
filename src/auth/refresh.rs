use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::credentials::CredentialPair;
use super::error::AuthError;

/// How to treat a refresh response that carries no new refresh credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RotationPolicy {
    /// Keep using the previous refresh credential.
    #[default]
    Optional,
    /// The response is malformed and the refresh fails.
    Required,
}

/// Credentials returned by a successful refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl RefreshGrant {
    /// Merge the grant with the refresh credential it was minted from.
    pub fn into_credentials(
        self,
        previous_refresh: &str,
        rotation: RotationPolicy,
    ) -> Result<CredentialPair, AuthError> {
        let rotated = self.refresh_token.filter(|t| !t.trim().is_empty());
        let refresh_token = match (rotated, rotation) {
            (Some(token), _) => token,
            (None, RotationPolicy::Optional) => previous_refresh.to_string(),
            (None, RotationPolicy::Required) => {
                return Err(AuthError::InvalidResponse(
                    "refresh response missing refreshToken".to_string(),
                ))
            }
        };
        CredentialPair::from_parts(Some(self.access_token), Some(refresh_token)).ok_or_else(|| {
            AuthError::InvalidResponse("refresh response carried an empty credential".to_string())
        })
    }
}

impl std::fmt::Debug for RefreshGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshGrant")
            .field("rotated", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Exchanges a refresh credential for a new access credential.
#[async_trait]
pub trait RefreshOperation: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant, AuthError>;
}

/// Refresh over HTTP: `POST {url}` with `{"refreshToken": ...}`.
///
/// # Example
/// ```no_run
/// use hackportal::auth::HttpRefreshOperation;
///
/// let op = HttpRefreshOperation::new(
///     reqwest::Client::new(),
///     "https://portal.example.org/api/auth/refresh",
/// );
/// ```
pub struct HttpRefreshOperation {
    client: reqwest::Client,
    url: String,
}

impl HttpRefreshOperation {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RefreshOperation for HttpRefreshOperation {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant, AuthError> {
        let resp = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
            });
        }
        let payload: RefreshResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let access_token = payload
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                AuthError::InvalidResponse("refresh response missing accessToken".to_string())
            })?;
        Ok(RefreshGrant {
            access_token,
            refresh_token: payload.refresh_token,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(refresh: Option<&str>) -> RefreshGrant {
        RefreshGrant {
            access_token: "new-access".to_string(),
            refresh_token: refresh.map(ToString::to_string),
        }
    }

    #[test]
    fn rotated_refresh_credential_replaces_old() {
        let pair = grant(Some("new-refresh"))
            .into_credentials("old-refresh", RotationPolicy::Required)
            .unwrap();
        assert_eq!(pair, CredentialPair::new("new-access", "new-refresh"));
    }

    #[test]
    fn optional_rotation_reuses_old_refresh_credential() {
        let pair = grant(None)
            .into_credentials("old-refresh", RotationPolicy::Optional)
            .unwrap();
        assert_eq!(pair, CredentialPair::new("new-access", "old-refresh"));
    }

    #[test]
    fn required_rotation_rejects_missing_refresh_credential() {
        let err = grant(Some(""))
            .into_credentials("old-refresh", RotationPolicy::Required)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse(_)));
    }

    #[test]
    fn rotation_policy_parses_case_insensitively() {
        assert_eq!("Required".parse::<RotationPolicy>().unwrap(), RotationPolicy::Required);
        assert_eq!("optional".parse::<RotationPolicy>().unwrap(), RotationPolicy::Optional);
        assert_eq!(RotationPolicy::Required.to_string(), "required");
    }
}
