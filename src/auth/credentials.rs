use serde::{Deserialize, Serialize};

/// Access and refresh credential issued by the portal backend.
///
/// Both halves are always present. Partial state read from storage or the
/// network is rejected by [`CredentialPair::from_parts`].
///
/// # Example
/// ```
/// use hackportal::auth::CredentialPair;
///
/// let pair = CredentialPair::new("access", "refresh");
/// assert_eq!(pair.bearer(), "Bearer access");
/// assert!(CredentialPair::from_parts(Some("access".into()), None).is_none());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Build a pair only when both halves are present and non-empty.
    pub fn from_parts(access_token: Option<String>, refresh_token: Option<String>) -> Option<Self> {
        let access_token = access_token.filter(|t| !t.trim().is_empty())?;
        let refresh_token = refresh_token.filter(|t| !t.trim().is_empty())?;
        Some(Self {
            access_token,
            refresh_token,
        })
    }

    /// `Authorization` header value for the access credential.
    pub fn bearer(&self) -> String {
        bearer(&self.access_token)
    }
}

// Tokens never reach logs.
impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

pub(crate) fn bearer(access_token: &str) -> String {
    format!("Bearer {access_token}")
}
