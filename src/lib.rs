//! # docustructure
//!
//! Turn a PDF into a structured, AI-ready JSON document using a multimodal
//! model.
//!
//! ## Why this crate?
//!
//! Text extraction alone loses the things downstream tools care about: what
//! the document is about, which facts matter, and which grids of numbers are
//! tables. Instead this crate sends the whole PDF to a multimodal model
//! together with an instruction and a response schema, and gets back a
//! [`StructuredDocument`]: metadata, an analysis (title, summary, key
//! points) and the content as Markdown plus every table as headers and rows.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Encode     bytes → base64 inline attachment
//!  ├─ 3. Inference  one schema-constrained call, retried on overload (1s, 2s, 4s)
//!  ├─ 4. Parse      reply text → document, malformed payloads rejected
//!  └─ 5. Normalise  filename + processedAt overwritten locally
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docustructure::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let doc = convert("report.pdf", &config).await?;
//!     println!("{}", doc.document_analysis.title);
//!     for table in &doc.structured_content.tables {
//!         println!("{} columns, {} rows", table.headers.len(), table.rows.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Progress
//!
//! ```rust,no_run
//! use docustructure::{ConversionConfig, ConversionProgressCallback};
//! use std::{sync::Arc, time::Duration};
//!
//! struct Log;
//! impl ConversionProgressCallback for Log {
//!     fn on_retry_scheduled(&self, attempt: u32, max: u32, delay: Duration) {
//!         eprintln!("Server busy, retrying ({attempt}/{max}) in {delay:?}");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .api_key("AIza...")
//!     .progress_callback(Arc::new(Log))
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docustructure` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docustructure = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod schema;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_bytes, convert_file, convert_sync, convert_to_file, save_document};
pub use error::{DocuError, ErrorKind, InferenceError};
pub use output::{DocumentAnalysis, DocumentMetadata, StructuredContent, StructuredDocument, Table};
pub use pipeline::gemini::{GeminiBackend, InferenceBackend, InferenceReply, InferenceRequest};
pub use pipeline::input::UploadedFile;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use render::View;
pub use session::{Selection, Session, SessionState};
