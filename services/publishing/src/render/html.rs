//! HTML rendition served at `/books/{id}`.

use crate::error::RenderError;
use askama::Template;

/// Standalone page with title, cover, summary and body
///
/// Every field is escaped by the template.
#[derive(Template)]
#[template(path = "book.html")]
pub struct BookPage<'a> {
    title: &'a str,
    image_url: Option<&'a str>,
    summary: Vec<&'a str>,
    body: Vec<&'a str>,
}

impl<'a> BookPage<'a> {
    /// Page for one book; a blank image URL shows the placeholder
    #[must_use]
    pub fn new(title: &'a str, image_url: Option<&'a str>, summary: &'a str, body: &'a str) -> Self {
        Self {
            title,
            image_url: image_url.filter(|url| !url.trim().is_empty()),
            summary: paragraphs(summary),
            body: paragraphs(body),
        }
    }
}

fn paragraphs(text: &str) -> Vec<&str> {
    text.split('\n').map(str::trim).filter(|p| !p.is_empty()).collect()
}

/// Render the HTML page of a book
///
/// # Errors
///
/// Returns [`RenderError::Template`] if the template fails to render.
pub fn render_html(
    title: &str,
    image_url: Option<&str>,
    summary: &str,
    body: &str,
) -> Result<String, RenderError> {
    BookPage::new(title, image_url, summary, body)
        .render()
        .map_err(|error| RenderError::Template(error.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn page_contains_escaped_sections() {
        let html = render_html(
            "<Tides>",
            Some("https://img.example.com/c.png"),
            "Short.",
            "One\n\nTwo & three",
        )
        .unwrap();

        assert!(html.contains("<h1>&lt;Tides&gt;</h1>"));
        assert!(html.contains("<img src=\""));
        assert!(html.contains("c.png"));
        assert!(html.contains("<h2>&lt;Tides&gt; - Summary</h2>"));
        assert!(html.contains("<p>One</p>"));
        assert!(html.contains("<p>Two &amp; three</p>"));
        assert!(!html.contains("No image available"));
    }

    #[test]
    fn markup_in_the_body_is_not_interpreted() {
        let html = render_html("T", None, "", "<script>alert(1)</script>").unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn empty_sections_get_placeholders() {
        let html = render_html("T", Some("  "), " ", "").unwrap();
        assert!(html.contains("No image available"));
        assert!(html.contains("No summary available"));
        assert!(html.contains("No content available"));
    }
}
