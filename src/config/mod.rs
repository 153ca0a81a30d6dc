//! Client configuration (layered: code > env > defaults).

use std::path::PathBuf;
use std::time::Duration;

use crate::auth::store::CredentialStoreConfig;
use crate::auth::RotationPolicy;
use crate::error::PortalError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_LOGOUT_PATH: &str = "/auth/logout";

/// Settings for [`AuthClient`](crate::http::AuthClient).
///
/// # Example
/// ```
/// use hackportal::config::ClientConfig;
///
/// let config = ClientConfig::new("https://portal.example.org/api")
///     .with_login_path("/auth/admin/login");
/// assert!(config.is_exempt("/auth/refresh"));
/// assert!(config.is_exempt("/auth/admin/login"));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub refresh_path: String,
    /// Sign-in endpoints. The first one is used by `sign_in`.
    pub login_paths: Vec<String>,
    pub logout_path: String,
    pub rotation: RotationPolicy,
    pub refresh_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub credentials_dir: PathBuf,
    pub profile: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            login_paths: vec![DEFAULT_LOGIN_PATH.to_string()],
            logout_path: DEFAULT_LOGOUT_PATH.to_string(),
            rotation: RotationPolicy::default(),
            refresh_timeout: None,
            request_timeout: None,
            credentials_dir: CredentialStoreConfig::default_dir(),
            profile: "default".to_string(),
        }
    }

    /// Load from environment variables (`HACKPORTAL_*`), reading `.env` if present.
    pub fn from_env() -> Result<Self, PortalError> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Ok(url) = std::env::var("HACKPORTAL_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(path) = std::env::var("HACKPORTAL_REFRESH_PATH") {
            config.refresh_path = path;
        }
        if let Ok(paths) = std::env::var("HACKPORTAL_LOGIN_PATH") {
            config.login_paths = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Ok(path) = std::env::var("HACKPORTAL_LOGOUT_PATH") {
            config.logout_path = path;
        }
        if let Ok(value) = std::env::var("HACKPORTAL_REQUIRE_ROTATION") {
            config.rotation = if parse_flag("HACKPORTAL_REQUIRE_ROTATION", &value)? {
                RotationPolicy::Required
            } else {
                RotationPolicy::Optional
            };
        }
        if let Ok(value) = std::env::var("HACKPORTAL_REFRESH_TIMEOUT_MS") {
            config.refresh_timeout = Some(parse_millis("HACKPORTAL_REFRESH_TIMEOUT_MS", &value)?);
        }
        if let Ok(value) = std::env::var("HACKPORTAL_REQUEST_TIMEOUT_MS") {
            config.request_timeout = Some(parse_millis("HACKPORTAL_REQUEST_TIMEOUT_MS", &value)?);
        }
        if let Ok(dir) = std::env::var("HACKPORTAL_HOME") {
            config.credentials_dir = PathBuf::from(dir);
        }
        if let Ok(profile) = std::env::var("HACKPORTAL_PROFILE") {
            config.profile = profile;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Add another sign-in endpoint exempt from refresh handling.
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_paths.push(path.into());
        self
    }

    pub fn with_logout_path(mut self, path: impl Into<String>) -> Self {
        self.logout_path = path.into();
        self
    }

    pub fn with_rotation(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_credentials_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.credentials_dir = dir.into();
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Check that the base URL is absolute and every endpoint path is rooted.
    pub fn validate(&self) -> Result<(), PortalError> {
        let base = self.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(PortalError::Configuration(format!(
                "base URL must be http(s): {base}"
            )));
        }
        if self.login_paths.is_empty() {
            return Err(PortalError::Configuration(
                "at least one login path is required".to_string(),
            ));
        }
        let paths = std::iter::once(&self.refresh_path)
            .chain(&self.login_paths)
            .chain(std::iter::once(&self.logout_path));
        for path in paths {
            if !path.starts_with('/') {
                return Err(PortalError::Configuration(format!(
                    "endpoint path must start with '/': {path}"
                )));
            }
        }
        Ok(())
    }

    /// Absolute URL for a path relative to the base URL.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Whether a 401 on `path` must never trigger a refresh.
    ///
    /// Exact match on the path component; the query string is ignored.
    /// Paths are compared in the same rooted form [`url_for`](Self::url_for)
    /// sends, so `auth/refresh` and `/auth/refresh` are the same endpoint.
    pub fn is_exempt(&self, path: &str) -> bool {
        let path = rooted(path.split('?').next().unwrap_or(path));
        path == rooted(&self.refresh_path) || self.login_paths.iter().any(|p| rooted(p) == path)
    }

    pub fn primary_login_path(&self) -> &str {
        self.login_paths
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_LOGIN_PATH)
    }

    pub fn store_config(&self) -> CredentialStoreConfig {
        CredentialStoreConfig::new(self.credentials_dir.clone()).with_profile(self.profile.clone())
    }
}

fn rooted(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

fn parse_flag(var: &str, value: &str) -> Result<bool, PortalError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(PortalError::Configuration(format!(
            "{var} must be a boolean, got {other}"
        ))),
    }
}

fn parse_millis(var: &str, value: &str) -> Result<Duration, PortalError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| PortalError::Configuration(format!("{var} must be milliseconds, got {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_exempt_refresh_and_login() {
        let config = ClientConfig::default();
        assert!(config.is_exempt("/auth/refresh"));
        assert!(config.is_exempt("/auth/login"));
        assert!(!config.is_exempt("/auth/logout"));
        assert!(!config.is_exempt("/teams"));
    }

    #[test]
    fn exemption_is_exact_and_ignores_query() {
        let config = ClientConfig::default();
        assert!(config.is_exempt("/auth/refresh?source=web"));
        assert!(!config.is_exempt("/auth/refresh/extra"));
        assert!(!config.is_exempt("/v2/auth/login"));
    }

    #[test]
    fn exemption_matches_the_url_that_is_sent() {
        let config = ClientConfig::default();
        assert!(config.is_exempt("auth/refresh"));
        assert!(config.is_exempt("//auth/login?next=/teams"));
        assert_eq!(config.url_for("auth/refresh"), config.url_for("/auth/refresh"));
        assert!(!config.is_exempt("auth/refresh/extra"));
    }

    #[test]
    fn url_for_joins_without_double_slashes() {
        let config = ClientConfig::new("https://portal.example.org/api/");
        assert_eq!(
            config.url_for("/teams/7"),
            "https://portal.example.org/api/teams/7"
        );
        assert_eq!(
            config.url_for("scores"),
            "https://portal.example.org/api/scores"
        );
    }

    #[test]
    fn validate_rejects_relative_base_url() {
        let config = ClientConfig::new("portal.example.org");
        assert!(matches!(
            config.validate(),
            Err(PortalError::Configuration(_))
        ));
    }

    #[test]
    fn validate_rejects_unrooted_paths() {
        let config = ClientConfig::default().with_refresh_path("auth/refresh");
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_flag_accepts_common_spellings() {
        assert!(parse_flag("X", "TRUE").unwrap());
        assert!(!parse_flag("X", "off").unwrap());
        assert!(parse_flag("X", "maybe").is_err());
    }

    #[test]
    fn parse_millis_rejects_garbage() {
        assert_eq!(parse_millis("X", "1500").unwrap(), Duration::from_millis(1500));
        assert!(parse_millis("X", "soon").is_err());
    }
}
