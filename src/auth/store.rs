use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::credentials::CredentialPair;
use super::error::AuthError;

/// Storage abstraction for the persisted credential pair.
///
/// Implementations must never hand out half a pair: a stored state with only
/// one credential loads as `None`.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<CredentialPair>, AuthError>;
    fn save(&self, credentials: &CredentialPair) -> Result<(), AuthError>;
    fn clear(&self) -> Result<(), AuthError>;
}

/// Configuration for file-backed credential storage.
#[derive(Debug, Clone)]
pub struct CredentialStoreConfig {
    pub base_dir: PathBuf,
    pub profile: String,
}

impl CredentialStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            profile: "default".to_string(),
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn default_dir() -> PathBuf {
        default_portal_dir()
    }
}

/// File-backed credential store using TOML files.
///
/// The file survives restarts and is removed on logout or invalidation.
///
/// # Example
/// ```no_run
/// use hackportal::auth::{CredentialPair, CredentialStore, FileCredentialStore};
///
/// let store = FileCredentialStore::new_default();
/// store.save(&CredentialPair::new("access", "refresh"))?;
/// # Ok::<(), hackportal::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    profile: String,
}

impl FileCredentialStore {
    pub fn new(config: CredentialStoreConfig) -> Self {
        let profile = normalize_label(&config.profile);
        let name = if profile == "default" {
            "credentials.toml".to_string()
        } else {
            format!("credentials.{profile}.toml")
        };
        Self {
            path: config.base_dir.join(name),
            profile,
        }
    }

    pub fn new_default() -> Self {
        Self::new(CredentialStoreConfig::new(default_portal_dir()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<CredentialPair>, AuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        let file: CredentialFile = match toml::from_str(&raw) {
            Ok(file) => file,
            Err(error) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %error,
                    "stored credentials are unreadable; treating as signed out"
                );
                return Ok(None);
            }
        };
        let pair = CredentialPair::from_parts(file.access_token, file.refresh_token);
        if pair.is_none() {
            tracing::warn!(
                path = %self.path.display(),
                "stored credentials are incomplete; treating as signed out"
            );
        }
        Ok(pair)
    }

    fn save(&self, credentials: &CredentialPair) -> Result<(), AuthError> {
        Self::ensure_parent(&self.path)?;
        let file = CredentialFile {
            version: 1,
            profile: self.profile.clone(),
            access_token: Some(credentials.access_token.clone()),
            refresh_token: Some(credentials.refresh_token.clone()),
            saved_at: Utc::now(),
        };
        let serialized = toml::to_string(&file)?;
        fs::write(&self.path, serialized)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Io(err.to_string())),
        }
    }
}

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<Option<CredentialPair>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: CredentialPair) -> Self {
        Self {
            credentials: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<CredentialPair>, AuthError> {
        Ok(self
            .credentials
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, credentials: &CredentialPair) -> Result<(), AuthError> {
        *self
            .credentials
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self
            .credentials
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialFile {
    version: u32,
    profile: String,
    access_token: Option<String>,
    refresh_token: Option<String>,
    saved_at: DateTime<Utc>,
}

fn default_portal_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".hackportal"))
        .unwrap_or_else(|| PathBuf::from(".hackportal"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}
