//! Attachment encoding: raw bytes → base64 inline attachment.
//!
//! The Gemini API accepts small documents inline in the JSON body as
//! `inlineData { mimeType, data }`. Encoding a multi-megabyte PDF is CPU
//! work, so it runs on the blocking pool and the caller simply awaits it.

use crate::error::DocuError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A binary payload embedded in the request as base64 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineAttachment {
    pub mime_type: String,
    /// Standard (padded) base64.
    pub data: String,
}

/// Encode `bytes` synchronously.
pub fn encode_attachment(bytes: &[u8], mime_type: &str) -> InlineAttachment {
    let data = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64", bytes.len(), data.len());
    InlineAttachment {
        mime_type: mime_type.to_string(),
        data,
    }
}

/// Encode on the blocking pool.
pub async fn encode_attachment_async(
    bytes: Vec<u8>,
    mime_type: String,
) -> Result<InlineAttachment, DocuError> {
    tokio::task::spawn_blocking(move || encode_attachment(&bytes, &mime_type))
        .await
        .map_err(|e| DocuError::Internal(format!("encode task failed: {e}")))
}
