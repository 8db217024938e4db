//! Credential storage for the generative-model API key.
//!
//! The pipeline never reads settings files itself; it receives an
//! `Arc<dyn CredentialStore>` through [`crate::ConversionConfig`]. The CLI
//! opens a [`FileCredentialStore`] once at start-up, and the store writes
//! back to disk only when the key is set or deleted.
//!
//! ## File format
//!
//! ```json
//! { "apiKey": "AIza..." }
//! ```
//!
//! The file lives at `<config dir>/pdf2md-cli/config.json` (see
//! [`FileCredentialStore::default_path`]). `PDF2MD_CONFIG_FILE` overrides the
//! location. A missing file is treated as an empty store.

use crate::error::Pdf2MdError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Application identifier used for the settings directory.
pub const APP_DIR_NAME: &str = "pdf2md-cli";

/// Settings file name inside [`APP_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.json";

/// A single persisted secret.
///
/// `get` is infallible because implementations load their state up front;
/// only mutations touch persistent storage.
pub trait CredentialStore: Send + Sync {
    /// The stored key, or `None` when nothing (or an empty string) is stored.
    fn get(&self) -> Option<String>;

    /// Store `key`, replacing any previous value.
    fn set(&self, key: &str) -> Result<(), Pdf2MdError>;

    /// Remove the stored key.
    fn delete(&self) -> Result<(), Pdf2MdError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Settings {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    api_key: String,

    /// Keys written by other versions are carried through unchanged.
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

/// JSON-file backed credential store.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    settings: Mutex<Settings>,
}

impl FileCredentialStore {
    /// Resolve the settings file location.
    ///
    /// `PDF2MD_CONFIG_FILE` wins; otherwise the platform configuration
    /// directory (`~/.config` on Linux, `~/Library/Application Support` on
    /// macOS, `%APPDATA%` on Windows) is used.
    pub fn default_path() -> Result<PathBuf, Pdf2MdError> {
        if let Ok(p) = std::env::var("PDF2MD_CONFIG_FILE") {
            if !p.is_empty() {
                return Ok(PathBuf::from(p));
            }
        }
        dirs::config_dir()
            .map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(Pdf2MdError::ConfigDirUnavailable)
    }

    /// Open the store at [`Self::default_path`].
    pub fn open_default() -> Result<Self, Pdf2MdError> {
        Self::open(Self::default_path()?)
    }

    /// Load the store from `path`. A missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Pdf2MdError> {
        let path = path.into();
        let settings = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Settings::default(),
            Ok(raw) => {
                serde_json::from_str(&raw).map_err(|e| Pdf2MdError::CredentialParse {
                    path: path.clone(),
                    detail: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
            Err(e) => return Err(Pdf2MdError::CredentialRead { path, source: e }),
        };
        debug!("Loaded settings from {}", path.display());

        Ok(Self {
            path,
            settings: Mutex::new(settings),
        })
    }

    /// Like [`Self::open`], but a malformed file is replaced by an empty
    /// store instead of failing. The file is rewritten on the next `set` or
    /// `delete`.
    pub fn open_or_reset(path: impl Into<PathBuf>) -> Result<Self, Pdf2MdError> {
        let path = path.into();
        match Self::open(&path) {
            Err(Pdf2MdError::CredentialParse { detail, .. }) => {
                warn!("Discarding malformed settings {}: {}", path.display(), detail);
                Ok(Self {
                    path,
                    settings: Mutex::new(Settings::default()),
                })
            }
            other => other,
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, settings: &Settings) -> Result<(), Pdf2MdError> {
        let write_err = |source| Pdf2MdError::CredentialWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| Pdf2MdError::Internal(format!("serialise settings: {e}")))?;
        std::fs::write(&self.path, json).map_err(write_err)?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<String> {
        let settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        Some(settings.api_key.clone()).filter(|k| !k.is_empty())
    }

    fn set(&self, key: &str) -> Result<(), Pdf2MdError> {
        let key = validate_key(key)?;
        let mut settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        settings.api_key = key.to_string();
        self.save(&settings)
    }

    fn delete(&self) -> Result<(), Pdf2MdError> {
        let mut settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        settings.api_key.clear();
        self.save(&settings)
    }
}

/// In-memory store for tests and embedding applications that manage
/// secrets themselves.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    key: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Mutex::new(Some(key.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.key
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .filter(|k| !k.is_empty())
    }

    fn set(&self, key: &str) -> Result<(), Pdf2MdError> {
        let key = validate_key(key)?;
        *self.key.lock().unwrap_or_else(|e| e.into_inner()) = Some(key.to_string());
        Ok(())
    }

    fn delete(&self) -> Result<(), Pdf2MdError> {
        *self.key.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Trim surrounding whitespace; a blank key is rejected.
fn validate_key(key: &str) -> Result<&str, Pdf2MdError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(Pdf2MdError::InvalidConfig("API key must not be empty".into()));
    }
    Ok(key)
}

/// Mask a secret for display.
///
/// Keys of 8 or more characters keep their first and last four characters
/// and replace the rest with `*`. Shorter keys are masked completely.
/// Works on characters, so multi-byte input never splits a code point.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let len = chars.len();
    if len < 8 {
        return "*".repeat(len);
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[len - 4..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(len - 8))
}
