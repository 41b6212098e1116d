//! Response schema contract with the inference endpoint.
//!
//! [`response_schema`] is sent with every request so the model is
//! constrained to the Structured Document shape. [`ModelDocument`] is the
//! matching wire type the reply is parsed into; it differs from
//! [`StructuredDocument`] only in metadata, where `filename` and
//! `processedAt` are accepted in any form and then discarded by
//! [`ModelDocument::normalize`].

use crate::output::{DocumentAnalysis, DocumentMetadata, StructuredContent, StructuredDocument};
use chrono::{DateTime, Timelike, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

/// OpenAPI-subset schema describing a Structured Document.
///
/// Uses only OBJECT, ARRAY and STRING so no free-form field can appear.
pub fn response_schema() -> Value {
    let string = json!({ "type": "STRING" });
    let string_array = json!({ "type": "ARRAY", "items": string });

    json!({
        "type": "OBJECT",
        "properties": {
            "metadata": {
                "type": "OBJECT",
                "properties": {
                    "filename": string,
                    "processedAt": string,
                    "language": string,
                },
                "required": ["filename", "processedAt", "language"],
            },
            "documentAnalysis": {
                "type": "OBJECT",
                "properties": {
                    "title": string,
                    "summary": string,
                    "keyPoints": string_array,
                },
                "required": ["title", "summary", "keyPoints"],
            },
            "structuredContent": {
                "type": "OBJECT",
                "properties": {
                    "markdown": string,
                    "tables": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "title": string,
                                "description": string,
                                "headers": string_array,
                                "rows": { "type": "ARRAY", "items": string_array },
                            },
                            "required": ["headers", "rows"],
                        },
                    },
                },
                "required": ["markdown", "tables"],
            },
        },
        "required": ["metadata", "documentAnalysis", "structuredContent"],
    })
}

/// Structured Document as the model emits it, before normalisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDocument {
    pub metadata: ModelMetadata,
    pub document_analysis: DocumentAnalysis,
    pub structured_content: StructuredContent,
}

/// Model-supplied metadata. Only `language` survives normalisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    #[serde(default)]
    pub filename: Option<Value>,
    #[serde(default)]
    pub processed_at: Option<Value>,
    pub language: String,
}

impl ModelDocument {
    /// Replace provenance with trusted values.
    ///
    /// `processed_at` is truncated to whole milliseconds, the precision it
    /// is saved with.
    pub fn normalize(self, filename: &str, processed_at: DateTime<Utc>) -> StructuredDocument {
        StructuredDocument {
            metadata: DocumentMetadata {
                filename: filename.to_string(),
                processed_at: truncate_to_millis(processed_at),
                language: self.metadata.language,
            },
            document_analysis: self.document_analysis,
            structured_content: self.structured_content,
        }
    }
}

fn truncate_to_millis(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(dt.nanosecond() / 1_000_000 * 1_000_000)
        .unwrap_or(dt)
}
