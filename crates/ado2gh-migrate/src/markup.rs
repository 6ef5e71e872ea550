//! Rich-text conversion for work item fields.
//!
//! Azure DevOps stores descriptions, acceptance criteria and repro steps as
//! HTML fragments; GitHub issue bodies want Markdown-ish plain markup.

/// Convert an HTML fragment into plain markup suitable for an issue body.
///
/// Empty input yields an empty string.
pub fn html_to_markup(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    // Wide enough to avoid re-wrapping prose the author never wrapped.
    let rendered = html2text::from_read(html.as_bytes(), 10_000);
    rendered.trim_end().to_string()
}
