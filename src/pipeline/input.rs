//! Input resolution: turn a user-supplied path or URL into an [`UploadedFile`].
//!
//! An `UploadedFile` is what a file picker hands over: a display name, a
//! declared MIME type and the raw bytes. The MIME type is *declared*, not
//! sniffed (from the extension for local files, from `Content-Type` for
//! downloads), and nothing here rejects non-PDF input. That decision
//! belongs to [`crate::session::Session`].

use crate::error::DocuError;
use std::path::Path;
use tracing::{debug, info};

/// MIME type accepted by the session.
pub const PDF_MIME: &str = "application/pdf";

/// A single selected file held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Name shown to the user and written into the document metadata.
    pub name: String,
    /// Declared MIME type.
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Build from a name alone, declaring the MIME type from its extension.
    pub fn from_name(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = guess_mime_type(&name).to_string();
        Self::new(name, mime_type, bytes)
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case(PDF_MIME)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Declared MIME type for a file name, as a browser file picker reports it.
pub fn guess_mime_type(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "pdf" => PDF_MIME,
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a local path or HTTP(S) URL to an in-memory file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<UploadedFile, DocuError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

async fn read_local(path: &Path) -> Result<UploadedFile, DocuError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => DocuError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => DocuError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read local file {} ({} bytes)", path.display(), bytes.len());
    Ok(UploadedFile::from_name(name, bytes))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedFile, DocuError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DocuError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            DocuError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            DocuError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(DocuError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let name = filename_from_url(url);
    let declared = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty() && v != "application/octet-stream");

    let bytes = response
        .bytes()
        .await
        .map_err(|e| DocuError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    info!("Downloaded {} ({} bytes)", name, bytes.len());

    Ok(match declared {
        Some(mime) => UploadedFile::new(name, mime, bytes),
        None => UploadedFile::from_name(name, bytes),
    })
}

/// Last non-empty path segment of the URL, or `downloaded.pdf`.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded.pdf".to_string()
}
