//! Plain-text artifact written when the PDF cannot be produced.

/// Deterministic fallback text
///
/// All inputs are written verbatim, without glyph substitution.
#[must_use]
pub fn fallback_text(title: &str, image_url: Option<&str>, summary: &str, body: &str) -> String {
    format!(
        "PDF generation error\n\nTitle: {title}\n\nImage URL: {}\n\nSummary:\n{summary}\n\nContent:\n{body}",
        image_url.unwrap_or_default()
    )
}
