//! Post-processing: turn the reply text into a validated [`ModelDocument`].
//!
//! Even with `responseMimeType: application/json`, some models wrap the
//! JSON in a ```` ```json ```` fence or prefix it with a BOM. Those two
//! artefacts are removed deterministically; anything else that fails to
//! parse against the schema becomes [`DocuError::MalformedPayload`].
//!
//! Tables are *not* repaired. Ragged rows are logged and passed through.

use crate::error::DocuError;
use crate::schema::ModelDocument;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Parse the reply text into the wire document.
///
/// Rules (applied in order):
/// 1. Strip a leading byte-order mark
/// 2. Strip one outer code fence (` ```json ` or bare ` ``` `)
/// 3. Deserialise against the schema
/// 4. Log tables whose rows do not match their header count
pub fn parse_reply(text: &str) -> Result<ModelDocument, DocuError> {
    let s = strip_bom(text);
    let s = strip_json_fence(s);

    let doc: ModelDocument =
        serde_json::from_str(s).map_err(|e| DocuError::MalformedPayload {
            detail: e.to_string(),
        })?;

    report_ragged_tables(&doc);
    Ok(doc)
}

// ── Rule 1: Strip BOM ────────────────────────────────────────────────────────

fn strip_bom(input: &str) -> &str {
    input.trim_start_matches('\u{FEFF}')
}

// ── Rule 2: Strip outer code fence ───────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\r?\n(.*?)\r?\n?```$").expect("valid fence regex")
});

fn strip_json_fence(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => trimmed,
    }
}

// ── Rule 4: Ragged tables ────────────────────────────────────────────────────

fn report_ragged_tables(doc: &ModelDocument) {
    for (idx, table) in doc.structured_content.tables.iter().enumerate() {
        if !table.is_rectangular() {
            warn!(
                table = idx,
                headers = table.headers.len(),
                widest = table.column_count(),
                "Table rows do not match header count; passing through unchanged"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "metadata": { "filename": "x", "processedAt": "x", "language": "ko" },
        "documentAnalysis": { "title": "보고서", "summary": "요약", "keyPoints": ["a", "b"] },
        "structuredContent": {
            "markdown": "| A | B |\n|---|---|\n| 1 | 2 |",
            "tables": [{ "headers": ["A", "B"], "rows": [["1", "2"], ["3"]] }]
        }
    }"#;

    #[test]
    fn parses_plain_json() {
        let doc = parse_reply(VALID).unwrap();
        assert_eq!(doc.document_analysis.key_points, vec!["a", "b"]);
        assert_eq!(doc.metadata.language, "ko");
    }

    #[test]
    fn ragged_rows_pass_through() {
        let doc = parse_reply(VALID).unwrap();
        let t = &doc.structured_content.tables[0];
        assert_eq!(t.rows[1], vec!["3"]);
        assert!(!t.is_rectangular());
    }

    #[test]
    fn strips_json_fence() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_reply(&fenced).is_ok());
        let bare = format!("```\n{VALID}\n```\n");
        assert!(parse_reply(&bare).is_ok());
    }

    #[test]
    fn strips_bom() {
        let with_bom = format!("\u{FEFF}{VALID}");
        assert!(parse_reply(&with_bom).is_ok());
    }

    #[test]
    fn no_fence_passthrough() {
        assert_eq!(strip_json_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn truncated_json_is_malformed() {
        let err = parse_reply(&VALID[..40]).unwrap_err();
        assert!(matches!(err, DocuError::MalformedPayload { .. }), "got {err:?}");
    }

    #[test]
    fn schema_mismatch_is_malformed() {
        let err = parse_reply(r#"{"metadata":{"language":"en"}}"#).unwrap_err();
        assert!(matches!(err, DocuError::MalformedPayload { .. }));
    }
}
