//! Text views of a [`StructuredDocument`] for terminal output.
//!
//! Three views: `Summary` (title, summary, key points and every table),
//! `Markdown` (the full text as extracted) and `Json` (the pretty-printed
//! document, identical to the saved file). Rendering never alters the
//! document; ragged tables are padded only in the printed grid.

use crate::output::{StructuredDocument, Table};
use std::fmt::Write as _;

/// Which view to print.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Summary,
    Markdown,
    Json,
}

/// Render `doc` in the requested view.
pub fn render(doc: &StructuredDocument, view: View) -> Result<String, serde_json::Error> {
    Ok(match view {
        View::Summary => render_summary(doc),
        View::Markdown => doc.structured_content.markdown.clone(),
        View::Json => doc.to_pretty_json()?,
    })
}

/// Summary, key points and tables as Markdown.
pub fn render_summary(doc: &StructuredDocument) -> String {
    let analysis = &doc.document_analysis;
    let tables = &doc.structured_content.tables;
    let mut out = String::new();

    let _ = writeln!(out, "# {}\n", analysis.title);
    let _ = writeln!(out, "_{}_\n", doc.metadata.filename);
    let _ = writeln!(out, "## Document Summary\n\n{}\n", analysis.summary);

    out.push_str("## Key Points\n\n");
    for point in &analysis.key_points {
        let _ = writeln!(out, "- {point}");
    }

    let _ = writeln!(out, "\n## Extracted Tables ({})\n", tables.len());
    if tables.is_empty() {
        out.push_str("No tables detected.\n");
    }
    for (idx, table) in tables.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(&render_table(table));
    }
    out
}

/// One table as a GFM pipe table, preceded by its title/description.
///
/// Blank headers become `Col N`; short rows are padded with empty cells.
pub fn render_table(table: &Table) -> String {
    let mut out = String::new();
    if let Some(title) = table.title.as_deref().filter(|t| !t.is_empty()) {
        let _ = writeln!(out, "**{}**", escape_cell(title));
    }
    if let Some(desc) = table.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(out, "{}", escape_cell(desc));
    }
    if table.title.is_some() || table.description.is_some() {
        out.push('\n');
    }

    let width = table.column_count().max(1);
    let headers: Vec<String> = (0..width)
        .map(|i| match table.headers.get(i).map(|h| h.trim()) {
            Some(h) if !h.is_empty() => escape_cell(h),
            _ => format!("Col {}", i + 1),
        })
        .collect();

    push_row(&mut out, &headers);
    push_row(&mut out, &vec!["---".to_string(); width]);
    for row in &table.rows {
        let cells: Vec<String> = (0..width)
            .map(|i| row.get(i).map(|c| escape_cell(c)).unwrap_or_default())
            .collect();
        push_row(&mut out, &cells);
    }
    out
}

fn push_row(out: &mut String, cells: &[String]) {
    out.push_str("| ");
    out.push_str(&cells.join(" | "));
    out.push_str(" |\n");
}

/// Keep a cell on one line and stop `|` from splitting it.
fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\r', '\n'], " ")
}
