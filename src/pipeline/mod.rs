//! Pipeline stages for document conversion.
//!
//! Each submodule implements one step, so each is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──────────▶ postprocess
//! (file)    (base64)   (retry loop)    (parse + validate)
//!                        │
//!                        └─▶ gemini (HTTP, typed errors)
//! ```
//!
//! 1. [`input`]: load a local path or URL into an in-memory `UploadedFile`
//! 2. [`encode`]: base64-wrap the bytes as an inline attachment; runs in
//!    `spawn_blocking`
//! 3. [`llm`]: build the request and apply the overload retry policy;
//!    the only stage that waits on the network
//! 4. [`gemini`]: the backend trait and the Gemini REST client
//! 5. [`postprocess`]: unwrap and deserialise the reply text

pub mod encode;
pub mod gemini;
pub mod input;
pub mod llm;
pub mod postprocess;
