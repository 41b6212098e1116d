//! Progress-callback trait for conversion lifecycle events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to observe
//! a conversion while it runs: when each attempt starts, when the endpoint
//! is overloaded and a retry is scheduled, and how the conversion ended.
//!
//! # Example
//!
//! ```rust
//! use docustructure::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//! use std::time::Duration;
//!
//! struct RetryCounter(AtomicU32);
//!
//! impl ConversionProgressCallback for RetryCounter {
//!     fn on_retry_scheduled(&self, attempt: u32, max_retries: u32, delay: Duration) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("busy, retry {attempt}/{max_retries} in {delay:?}");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(RetryCounter(AtomicU32::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::StructuredDocument;
use std::sync::Arc;
use std::time::Duration;

/// Called by the conversion service as it works through one document.
///
/// All methods default to no-ops so implementors only override what they
/// need. Events for one conversion arrive sequentially from one task.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the attachment is encoded.
    fn on_conversion_start(&self, filename: &str, size_bytes: usize) {
        let _ = (filename, size_bytes);
    }

    /// Called before each request is submitted.
    ///
    /// `attempt` is 0 for the first submission and at most `max_retries`.
    fn on_attempt_start(&self, attempt: u32, max_retries: u32) {
        let _ = (attempt, max_retries);
    }

    /// Called when an overloaded endpoint causes a wait before the next attempt.
    ///
    /// `attempt` is the 1-based number of the retry about to happen.
    fn on_retry_scheduled(&self, attempt: u32, max_retries: u32, delay: Duration) {
        let _ = (attempt, max_retries, delay);
    }

    /// Called once with the normalised document.
    fn on_conversion_complete(&self, document: &StructuredDocument) {
        let _ = document;
    }

    /// Called once when the conversion fails for good.
    fn on_conversion_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
