//! Conversion entry points.
//!
//! [`convert_file`] is the core: one in-memory file in, one normalised
//! [`StructuredDocument`] out. The other functions resolve their input into
//! an [`UploadedFile`] first, or persist the result.

use crate::config::ConversionConfig;
use crate::error::DocuError;
use crate::output::StructuredDocument;
use crate::pipeline::gemini::{GeminiBackend, InferenceBackend};
use crate::pipeline::input::{self, UploadedFile};
use crate::pipeline::{encode, llm, postprocess};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a local file path or HTTP(S) URL.
///
/// # Errors
/// Input errors from resolving the path/URL, plus everything
/// [`convert_file`] can return.
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<StructuredDocument, DocuError> {
    let file = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    convert_file(&file, config).await
}

/// Convert a document already held in memory.
///
/// The MIME type is trusted as declared; checking that the file is a
/// non-empty PDF is the caller's job.
///
/// # Steps
/// 1. Resolve the inference backend (fails with `MissingCredential` if none)
/// 2. Base64-encode the bytes as an inline attachment
/// 3. Submit with instruction and response schema, retrying on overload
/// 4. Reject replies without text (`EmptyResponse`), parse the rest
/// 5. Overwrite `metadata.filename` and `metadata.processedAt`
///
/// # Example
/// ```rust,no_run
/// use docustructure::{convert_file, ConversionConfig, UploadedFile};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("report.pdf")?;
/// let file = UploadedFile::new("report.pdf", "application/pdf", bytes);
/// let config = ConversionConfig::builder().api_key("AIza...").build()?;
/// let doc = convert_file(&file, &config).await?;
/// println!("{}", doc.document_analysis.summary);
/// # Ok(())
/// # }
/// ```
pub async fn convert_file(
    file: &UploadedFile,
    config: &ConversionConfig,
) -> Result<StructuredDocument, DocuError> {
    let result = run_conversion(file, config).await;

    if let Some(ref cb) = config.progress_callback {
        match &result {
            Ok(doc) => cb.on_conversion_complete(doc),
            Err(e) => cb.on_conversion_error(&e.to_string()),
        }
    }
    result
}

async fn run_conversion(
    file: &UploadedFile,
    config: &ConversionConfig,
) -> Result<StructuredDocument, DocuError> {
    let total_start = Instant::now();
    let started_at = Utc::now();
    info!(
        "Starting conversion: {} ({}, {} bytes)",
        file.name,
        file.mime_type,
        file.bytes.len()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(&file.name, file.bytes.len());
    }

    // ── Step 1: Get/create backend ───────────────────────────────────────
    let backend = resolve_backend(config)?;

    // ── Step 2: Encode attachment ────────────────────────────────────────
    let attachment =
        encode::encode_attachment_async(file.bytes.clone(), file.mime_type.clone()).await?;

    // ── Step 3: Submit with retry ────────────────────────────────────────
    let request = llm::build_request(attachment, config);
    let reply = llm::generate_with_retry(&backend, &request, config).await?;

    // ── Step 4: Validate ─────────────────────────────────────────────────
    let finish_reason = reply.finish_reason;
    if let Some(ref reason) = finish_reason {
        debug!("Finish reason: {}", reason);
    }
    let text = reply.text.ok_or(DocuError::EmptyResponse)?;
    let parsed = postprocess::parse_reply(&text)
        .map_err(|e| with_finish_reason(e, finish_reason.as_deref()))?;

    // ── Step 5: Normalise ────────────────────────────────────────────────
    let processed_at = Utc::now().max(started_at);
    let document = parsed.normalize(&file.name, processed_at);

    info!(
        "Conversion complete: {}: {} table(s), {} key point(s), {}ms",
        document.metadata.filename,
        document.structured_content.tables.len(),
        document.document_analysis.key_points.len(),
        total_start.elapsed().as_millis()
    );

    Ok(document)
}

/// Convert raw bytes with a declared name and MIME type.
pub async fn convert_bytes(
    name: impl Into<String>,
    mime_type: impl Into<String>,
    bytes: Vec<u8>,
    config: &ConversionConfig,
) -> Result<StructuredDocument, DocuError> {
    let file = UploadedFile::new(name, mime_type, bytes);
    convert_file(&file, config).await
}

/// Convert and write the document as pretty-printed JSON.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<StructuredDocument, DocuError> {
    let document = convert(input_str, config).await?;
    save_document(&document, output_path.as_ref()).await?;
    Ok(document)
}

/// Write `document` as pretty JSON to `path`, atomically.
pub async fn save_document(document: &StructuredDocument, path: &Path) -> Result<(), DocuError> {
    let json = document
        .to_pretty_json()
        .map_err(|e| DocuError::Internal(format!("failed to serialise document: {e}")))?;

    let write_err = |e| DocuError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Saved {}", path.display());
    Ok(())
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<StructuredDocument, DocuError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocuError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the inference backend.
///
/// 1. **Pre-built backend** (`config.backend`): used as-is. Useful in
///    tests or when the caller wraps the client in extra middleware.
/// 2. **Credential** (`config.api_key`): build a [`GeminiBackend`] for
///    `config.model` at `config.endpoint`. A missing or blank key is a
///    configuration error, not a panic.
fn resolve_backend(config: &ConversionConfig) -> Result<Arc<dyn InferenceBackend>, DocuError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let key = config.credential().ok_or(DocuError::MissingCredential)?;
    let backend = GeminiBackend::new(key, config.model.as_str(), config.endpoint.as_str())?;
    Ok(Arc::new(backend))
}

/// A reply cut short (e.g. `MAX_TOKENS`) usually fails to parse; say so.
fn with_finish_reason(err: DocuError, finish_reason: Option<&str>) -> DocuError {
    match (err, finish_reason) {
        (DocuError::MalformedPayload { detail }, Some(reason)) if reason != "STOP" => {
            DocuError::MalformedPayload {
                detail: format!("{detail} (finish reason: {reason})"),
            }
        }
        (err, _) => err,
    }
}
