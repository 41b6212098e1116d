//! Instruction text sent alongside every document.
//!
//! Callers can override it via [`crate::config::ConversionConfig::instruction`];
//! the constant here is used only when no override is provided. The output
//! *shape* is not described here: it is enforced by the response schema in
//! [`crate::schema`].

/// Default extraction instruction.
pub const DEFAULT_INSTRUCTION: &str = r#"Analyze the attached PDF document. Your goal is to extract its content and structure it so that ANOTHER AI model can read it reliably.

1. TITLE AND SUMMARY
   - Identify the document title
   - Write a concise summary of the whole document

2. KEY POINTS
   - List the most important points, in document order

3. TABLES
   - Extract EVERY table accurately
   - Put column headers in "headers" only; never repeat them as a data row
   - Each entry of "rows" is one data row, one string per cell

4. FULL CONTENT
   - Provide the complete document text as Markdown in "markdown"
   - Render tables inside the Markdown as GFM tables

5. LANGUAGE
   - Keep the original language of the document (Korean stays Korean); do not translate
   - Report the document language as a short tag in "metadata.language""#;

/// The instruction to send: the caller's override or [`DEFAULT_INSTRUCTION`].
pub fn instruction(custom: Option<&str>) -> &str {
    match custom {
        Some(text) if !text.trim().is_empty() => text,
        _ => DEFAULT_INSTRUCTION,
    }
}
