//! Configuration types for PDF-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The config also carries the injectable
//! collaborators (text extractor, Markdown formatter, credential store and
//! progress callback) so tests and library users can swap any of them.

use crate::credentials::CredentialStore;
use crate::error::Pdf2MdError;
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::format::MarkdownFormatter;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Default generative model used in AI mode.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Default Generative Language API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// How each file is turned into Markdown.
///
/// Chosen once per invocation and applied to every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    /// Local text extraction only; no network access.
    #[default]
    Standalone,
    /// Extraction followed by reformatting through the generative model.
    Ai,
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionMode::Standalone => f.write_str("standalone"),
            ConversionMode::Ai => f.write_str("ai"),
        }
    }
}

impl FromStr for ConversionMode {
    type Err = Pdf2MdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standalone" => Ok(ConversionMode::Standalone),
            "ai" => Ok(ConversionMode::Ai),
            other => Err(Pdf2MdError::InvalidConfig(format!(
                "unknown mode '{other}', expected 'standalone' or 'ai'"
            ))),
        }
    }
}

/// Configuration for a conversion invocation.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2md_cli::{ConversionConfig, ConversionMode};
///
/// let config = ConversionConfig::builder()
///     .mode(ConversionMode::Ai)
///     .api_key("AIza-example-key")
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.mode, ConversionMode::Ai);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Conversion mode applied to every file. Default: [`ConversionMode::Standalone`].
    pub mode: ConversionMode,

    /// Explicit output path. Honoured only when the input is a single file;
    /// ignored (with a warning) for directory input.
    pub output: Option<PathBuf>,

    /// API key supplied for this invocation. Wins over the stored credential.
    pub api_key: Option<String>,

    /// Persistent credential consulted when `api_key` is absent.
    pub credentials: Option<Arc<dyn CredentialStore>>,

    /// Generative model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// API base URL for the default Gemini formatter. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Timeout applied to each formatting call, in seconds. Default: 120.
    ///
    /// A hung request would otherwise stall the whole batch, since files are
    /// processed one after another.
    pub api_timeout_secs: u64,

    /// Sampling temperature sent to the model. `None` keeps the model default.
    pub temperature: Option<f32>,

    /// Text extractor. If None, PDFium is used.
    pub extractor: Option<Arc<dyn TextExtractor>>,

    /// Markdown formatter. If None, a Gemini REST formatter is built from
    /// `model`, `base_url`, `temperature` and `api_timeout_secs`.
    pub formatter: Option<Arc<dyn MarkdownFormatter>>,

    /// Optional progress callback for per-file events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            mode: ConversionMode::default(),
            output: None,
            api_key: None,
            credentials: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_timeout_secs: 120,
            temperature: None,
            extractor: None,
            formatter: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("mode", &self.mode)
            .field("output", &self.output)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("credentials", &self.credentials.as_ref().map(|_| "<dyn CredentialStore>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("temperature", &self.temperature)
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn TextExtractor>"))
            .field("formatter", &self.formatter.as_ref().map(|_| "<dyn MarkdownFormatter>"))
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The credential to use for AI mode.
    ///
    /// An explicit, non-blank `api_key` wins; otherwise the stored credential
    /// is used. Blank values count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_deref() {
            if !key.trim().is_empty() {
                return Some(key.to_string());
            }
        }
        self.credentials
            .as_ref()
            .and_then(|store| store.get())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn mode(mut self, mode: ConversionMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = Some(path.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.config.credentials = Some(store);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn formatter(mut self, formatter: Arc<dyn MarkdownFormatter>) -> Self {
        self.config.formatter = Some(formatter);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2MdError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(Pdf2MdError::InvalidConfig("model must not be empty".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(Pdf2MdError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;

    #[test]
    fn defaults() {
        let config = ConversionConfig::default();
        assert_eq!(config.mode, ConversionMode::Standalone);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_timeout_secs, 120);
        assert!(config.output.is_none());
        assert!(config.resolve_api_key().is_none());
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("AI".parse::<ConversionMode>().unwrap(), ConversionMode::Ai);
        assert_eq!(
            " standalone ".parse::<ConversionMode>().unwrap(),
            ConversionMode::Standalone
        );
        assert!("vision".parse::<ConversionMode>().is_err());
        assert_eq!(ConversionMode::Ai.to_string(), "ai");
    }

    #[test]
    fn explicit_key_wins_over_stored() {
        let store = Arc::new(MemoryCredentialStore::with_key("stored-key-123"));
        let config = ConversionConfig::builder()
            .credentials(store)
            .api_key("explicit-key-456")
            .build()
            .unwrap();
        assert_eq!(config.resolve_api_key().as_deref(), Some("explicit-key-456"));
    }

    #[test]
    fn blank_explicit_key_falls_back_to_stored() {
        let store = Arc::new(MemoryCredentialStore::with_key("stored-key-123"));
        let config = ConversionConfig::builder()
            .credentials(store)
            .api_key("   ")
            .build()
            .unwrap();
        assert_eq!(config.resolve_api_key().as_deref(), Some("stored-key-123"));
    }

    #[test]
    fn empty_stored_key_is_absent() {
        let store = Arc::new(MemoryCredentialStore::with_key(""));
        let config = ConversionConfig::builder().credentials(store).build().unwrap();
        assert!(config.resolve_api_key().is_none());
    }

    #[test]
    fn build_rejects_zero_timeout() {
        let err = ConversionConfig::builder()
            .api_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn build_rejects_non_http_base_url() {
        assert!(ConversionConfig::builder()
            .base_url("ftp://example.com")
            .build()
            .is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ConversionConfig::builder()
            .api_key("super-secret-value")
            .build()
            .unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("super-secret-value"));
        assert!(dbg.contains("<redacted>"));
    }
}
