//! Error types for the docustructure library.
//!
//! Two layers reflect two places where failures are observed:
//!
//! * [`InferenceError`]: produced by an [`crate::pipeline::gemini::InferenceBackend`]
//!   at the HTTP boundary. Each variant is assigned there, from the status
//!   code and the structured error body, so the retry loop can decide what
//!   to do with a plain `match`.
//!
//! * [`DocuError`]: everything a caller of the `convert*` functions can
//!   receive. [`DocuError::kind`] collapses it into the four-way
//!   [`ErrorKind`] taxonomy that decides how the failure is presented.

use std::path::PathBuf;
use thiserror::Error;

/// User-facing message for an overload that outlived every retry.
pub const SERVER_BUSY_MESSAGE: &str =
    "The AI service is currently overloaded with requests. Please try again in a few moments.";

/// Failure reported by an inference backend for a single attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    /// The endpoint is temporarily unable to serve the request (HTTP 503 / `UNAVAILABLE`).
    #[error("inference endpoint overloaded: {detail}")]
    Overloaded { detail: String },

    /// The credential was rejected.
    #[error("authentication rejected (HTTP {status}): {detail}")]
    AuthRejected { status: u16, detail: String },

    /// Any other non-success HTTP response.
    #[error("inference API error (HTTP {status}): {detail}")]
    Api { status: u16, detail: String },

    /// Transport-level failure unrelated to overload.
    #[error("network error: {0}")]
    Network(String),

    /// The attempt did not complete within the configured ceiling.
    #[error("inference call timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl InferenceError {
    /// Overload is the only failure class that is retried.
    pub fn is_overload(&self) -> bool {
        matches!(self, InferenceError::Overloaded { .. })
    }
}

/// How a failure is treated and presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credential missing or configuration invalid. Not retried.
    Configuration,
    /// Overload persisted past the retry limit.
    Overload,
    /// The endpoint answered without a text payload.
    EmptyResponse,
    /// Everything else: network faults, auth rejection, malformed payloads.
    Unclassified,
}

/// All fatal errors returned by the docustructure library.
#[derive(Debug, Error)]
pub enum DocuError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease the download timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// No API credential was supplied, or it was empty.
    #[error("No API key is configured for the inference endpoint.")]
    MissingCredential,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Conversion errors ─────────────────────────────────────────────────
    /// Every attempt hit an overloaded endpoint.
    #[error("{}", SERVER_BUSY_MESSAGE)]
    ServerBusy { attempts: u32 },

    /// The endpoint returned a body without any text payload.
    #[error("No response was received from the AI service.")]
    EmptyResponse,

    /// The text payload was not JSON of the expected shape.
    #[error("The AI service returned a malformed document: {detail}")]
    MalformedPayload { detail: String },

    /// Non-retried failure from the inference backend.
    #[error(transparent)]
    Inference(#[from] InferenceError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocuError {
    /// Classify this error into the presentation taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocuError::MissingCredential | DocuError::InvalidConfig(_) => ErrorKind::Configuration,
            DocuError::ServerBusy { .. } => ErrorKind::Overload,
            DocuError::EmptyResponse => ErrorKind::EmptyResponse,
            _ => ErrorKind::Unclassified,
        }
    }
}
