//! Configuration for a document conversion.
//!
//! Every knob lives in [`ConversionConfig`], built once at startup via
//! [`ConversionConfigBuilder`] and passed by reference into the `convert*`
//! functions. The credential is part of this object; nothing in the library
//! reads it from the process environment.

use crate::error::DocuError;
use crate::pipeline::gemini::InferenceBackend;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Default Gemini REST endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default multimodal model.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Configuration for a PDF-to-structured-document conversion.
///
/// # Example
/// ```rust
/// use docustructure::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .api_key("AIza...")
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_retries, 3);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Credential for the inference endpoint. Checked at conversion time so
    /// a missing key surfaces as [`DocuError::MissingCredential`].
    pub api_key: Option<String>,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Base URL of the REST API. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Pre-constructed backend. Takes precedence over `api_key`/`endpoint`.
    pub backend: Option<Arc<dyn InferenceBackend>>,

    /// Sampling temperature. `None` leaves the provider default.
    pub temperature: Option<f32>,

    /// Retries after the first attempt when the endpoint reports overload. Default: 3.
    pub max_retries: u32,

    /// Delay before the first retry; doubles each time. Default: 1000 ms,
    /// giving waits of 1 s, 2 s and 4 s.
    pub retry_base_delay_ms: u64,

    /// Ceiling for a single inference attempt in seconds. `0` disables it. Default: 300.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Replacement for the built-in extraction instruction.
    pub instruction: Option<String>,

    /// Receives conversion lifecycle events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            backend: None,
            temperature: None,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            api_timeout_secs: 300,
            download_timeout_secs: 120,
            instruction: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn InferenceBackend>"))
            .field("temperature", &self.temperature)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("instruction", &self.instruction.as_ref().map(|s| s.len()))
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

    /// Wait before retry number `attempt` (0-based): `base * 2^attempt`.
    pub fn backoff_delay_ms(&self, attempt: u32) -> u64 {
        self.retry_base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt))
    }

    /// The credential, if present and non-blank.
    pub(crate) fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn backend(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_base_delay_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// A missing API key is *not* rejected here; it is reported when a
    /// conversion is attempted.
    pub fn build(self) -> Result<ConversionConfig, DocuError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(DocuError::InvalidConfig("model must not be empty".into()));
        }
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(DocuError::InvalidConfig(format!(
                "endpoint must be an HTTP(S) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.max_retries > 10 {
            return Err(DocuError::InvalidConfig(format!(
                "max_retries must be ≤ 10, got {}",
                c.max_retries
            )));
        }
        Ok(self.config)
    }
}
