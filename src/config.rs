//! Configuration for the OCR request client.
//!
//! All request behaviour is controlled through [`OcrConfig`], built via its
//! [`OcrConfigBuilder`] or read from the environment with
//! [`OcrConfig::from_env`]. A config is built once at startup and shared
//! read-only (behind an `Arc`) by every request, so concurrent chat sessions
//! never see each other's settings change.
//!
//! The instruction prompt is not configurable: it is the constant
//! [`crate::prompts::FREE_OCR_PROMPT`] and cannot be overridden.

use crate::error::OcrError;
use std::fmt;
use std::path::PathBuf;

/// Default OpenAI-compatible base URL of a local Nexa inference server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:18181/v1";

/// Credential the local Nexa server accepts.
pub const DEFAULT_API_KEY: &str = "nexa";

/// Model identifier selecting the OCR-capable model on the server.
pub const DEFAULT_MODEL: &str = "NexaAI/DeepSeek-OCR-GGUF";

/// Environment variable names read by [`OcrConfig::from_env`].
pub mod env {
    pub const BASE_URL: &str = "NEXA_OCR_BASE_URL";
    pub const API_KEY: &str = "NEXA_OCR_API_KEY";
    pub const MODEL: &str = "NEXA_OCR_MODEL";
    pub const MAX_TOKENS: &str = "NEXA_OCR_MAX_TOKENS";
    pub const TIMEOUT: &str = "NEXA_OCR_TIMEOUT";
    pub const CONNECT_TIMEOUT: &str = "NEXA_OCR_CONNECT_TIMEOUT";
    pub const UPLOAD_DIR: &str = "NEXA_OCR_UPLOAD_DIR";
    pub const EMBED_LOCAL_IMAGES: &str = "NEXA_OCR_EMBED_LOCAL_IMAGES";
}

/// Configuration for OCR requests.
///
/// # Example
/// ```rust
/// use nexa_ocr::OcrConfig;
///
/// let config = OcrConfig::builder()
///     .base_url("http://127.0.0.1:18181/v1")
///     .model("NexaAI/DeepSeek-OCR-GGUF")
///     .max_tokens(2048)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 2048);
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Base URL of the OpenAI-compatible API, e.g. `http://127.0.0.1:18181/v1`.
    /// `/chat/completions` is appended per request.
    pub base_url: String,

    /// Bearer credential sent with every request. Default: `nexa`.
    pub api_key: String,

    /// Model identifier. Default: `NexaAI/DeepSeek-OCR-GGUF`.
    pub model: String,

    /// Maximum tokens the model may generate. Default: 4096.
    ///
    /// A dense table or receipt can run past 2 000 tokens; too low a cap
    /// silently truncates the extracted text.
    pub max_tokens: u32,

    /// Whole-request timeout in seconds. Default: 600.
    ///
    /// A local GGUF model on CPU can take minutes on a large scan, so the
    /// default is generous; it exists so a wedged server cannot hang a chat
    /// session forever.
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// Directory in which uploaded attachments are materialised.
    /// If None, uses the system temp directory.
    pub upload_dir: Option<PathBuf>,

    /// Inline `file://` references as base64 `data:` URLs. Default: false.
    ///
    /// The local Nexa server reads `file://` URLs from the shared filesystem.
    /// Remote endpoints cannot, so enable this when the server runs on
    /// another host.
    pub embed_local_images: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            request_timeout_secs: 600,
            connect_timeout_secs: 10,
            upload_dir: None,
            embed_local_images: false,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("upload_dir", &self.upload_dir)
            .field("embed_local_images", &self.embed_local_images)
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a config from `NEXA_OCR_*` environment variables.
    ///
    /// Unset or empty variables keep their defaults. Unparseable numbers and
    /// booleans are reported as [`OcrError::InvalidConfig`].
    pub fn from_env() -> Result<Self, OcrError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`OcrConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, OcrError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(v) = get(env::BASE_URL) {
            builder = builder.base_url(v);
        }
        if let Some(v) = get(env::API_KEY) {
            builder = builder.api_key(v);
        }
        if let Some(v) = get(env::MODEL) {
            builder = builder.model(v);
        }
        if let Some(v) = get(env::MAX_TOKENS) {
            builder = builder.max_tokens(parse_number(env::MAX_TOKENS, &v)?);
        }
        if let Some(v) = get(env::TIMEOUT) {
            builder = builder.request_timeout_secs(parse_number(env::TIMEOUT, &v)?);
        }
        if let Some(v) = get(env::CONNECT_TIMEOUT) {
            builder = builder.connect_timeout_secs(parse_number(env::CONNECT_TIMEOUT, &v)?);
        }
        if let Some(v) = get(env::UPLOAD_DIR) {
            builder = builder.upload_dir(v);
        }
        if let Some(v) = get(env::EMBED_LOCAL_IMAGES) {
            builder = builder.embed_local_images(parse_bool(env::EMBED_LOCAL_IMAGES, &v)?);
        }

        builder.build()
    }

    /// Full URL of the chat-completion route.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, OcrError> {
    value
        .trim()
        .parse()
        .map_err(|_| OcrError::InvalidConfig(format!("{key} must be a number, got '{value}'")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, OcrError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(OcrError::InvalidConfig(format!(
            "{key} must be true or false, got '{value}'"
        ))),
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = Some(dir.into());
        self
    }

    pub fn embed_local_images(mut self, v: bool) -> Self {
        self.config.embed_local_images = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrError> {
        let c = &self.config;
        let base = c.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(OcrError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.model.trim().is_empty() {
            return Err(OcrError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(OcrError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.request_timeout_secs == 0 || c.connect_timeout_secs == 0 {
            return Err(OcrError::InvalidConfig("timeouts must be ≥ 1 second".into()));
        }
        Ok(self.config)
    }
}
