//! The Structured Document produced by a successful conversion.
//!
//! Field names serialise in camelCase so the saved JSON matches what
//! downstream LLM pipelines expect (`documentAnalysis.keyPoints`, …).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Suffix appended to the upload's stem when saving the document.
pub const SAVE_SUFFIX: &str = "_ai_ready.json";

/// Normalised result of converting one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredDocument {
    pub metadata: DocumentMetadata,
    pub document_analysis: DocumentAnalysis,
    pub structured_content: StructuredContent,
}

/// Provenance of the document.
///
/// `filename` and `processed_at` are always set by the library, never
/// taken from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub filename: String,
    #[serde(with = "iso8601_millis")]
    pub processed_at: DateTime<Utc>,
    /// Best-effort language tag reported by the model.
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub title: String,
    pub summary: String,
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredContent {
    /// Full document text; tables appear as GFM tables.
    pub markdown: String,
    pub tables: Vec<Table>,
}

/// A table extracted from the document.
///
/// Rows are kept exactly as the model produced them, so a row may be
/// shorter or longer than `headers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// True when every row has exactly one cell per header.
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|r| r.len() == self.headers.len())
    }

    /// Widest of the header row and every data row.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }
}

impl StructuredDocument {
    /// Pretty-printed JSON, two-space indented.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// File name under which the document is saved, e.g. `report_ai_ready.json`.
    pub fn save_file_name(&self) -> String {
        save_file_name(&self.metadata.filename)
    }
}

/// Strip the last extension from `filename` and append [`SAVE_SUFFIX`].
///
/// A leading dot is part of the stem (`.hidden` stays `.hidden`).
pub fn save_file_name(filename: &str) -> String {
    let stem = match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    };
    format!("{stem}{SAVE_SUFFIX}")
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
mod iso8601_millis {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> StructuredDocument {
        StructuredDocument {
            metadata: DocumentMetadata {
                filename: "report.pdf".into(),
                processed_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
                language: "ko".into(),
            },
            document_analysis: DocumentAnalysis {
                title: "분기 보고서".into(),
                summary: "Quarterly numbers.".into(),
                key_points: vec!["Revenue up".into()],
            },
            structured_content: StructuredContent {
                markdown: "# 분기 보고서".into(),
                tables: vec![],
            },
        }
    }

    #[test]
    fn serialises_with_camel_case_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["metadata"]["processedAt"], "2026-03-01T12:00:00.000Z");
        assert_eq!(json["documentAnalysis"]["keyPoints"][0], "Revenue up");
        assert!(json["structuredContent"]["tables"].is_array());
    }

    #[test]
    fn optional_table_fields_are_omitted() {
        let t = Table {
            headers: vec!["a".into()],
            rows: vec![vec!["1".into()]],
            ..Default::default()
        };
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.get("title").is_none());
        assert!(json.get("description").is_none());
    }

    #[test]
    fn save_name_replaces_extension() {
        assert_eq!(save_file_name("report.pdf"), "report_ai_ready.json");
        assert_eq!(save_file_name("a.b.pdf"), "a.b_ai_ready.json");
        assert_eq!(save_file_name("noext"), "noext_ai_ready.json");
        assert_eq!(save_file_name(".hidden"), ".hidden_ai_ready.json");
        assert_eq!(sample().save_file_name(), "report_ai_ready.json");
    }

    #[test]
    fn ragged_rows_are_detected() {
        let mut t = Table {
            headers: vec!["a".into(), "b".into()],
            rows: vec![vec!["1".into(), "2".into()]],
            ..Default::default()
        };
        assert!(t.is_rectangular());
        assert_eq!(t.column_count(), 2);

        t.rows.push(vec!["x".into(), "y".into(), "z".into()]);
        assert!(!t.is_rectangular());
        assert_eq!(t.column_count(), 3);
    }

    #[test]
    fn pretty_json_round_trips_timestamp() {
        let doc = sample();
        let text = doc.to_pretty_json().unwrap();
        assert!(text.contains("\n  \"metadata\""));
        let back: StructuredDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(back, doc);
    }
}
