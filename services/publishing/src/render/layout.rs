//! Page geometry, line wrapping and pagination.
//!
//! Layout is computed as a [`DocumentPlan`] before anything is drawn, so page
//! numbers can run over the whole document and pagination is testable without
//! parsing PDF output. Coordinates are millimetres from the bottom-left corner
//! of an A4 page, as in PDF.

// ============================================================================
// Geometry
// ============================================================================

/// A4 width
pub const PAGE_WIDTH_MM: f32 = 210.0;
/// A4 height
pub const PAGE_HEIGHT_MM: f32 = 297.0;
/// Left and right margin
pub const SIDE_MARGIN_MM: f32 = 20.0;
/// Top margin
pub const TOP_MARGIN_MM: f32 = 20.0;
/// Bottom margin, includes the footer band
pub const BOTTOM_MARGIN_MM: f32 = 25.0;
/// Baseline of the page number
pub const FOOTER_BASELINE_MM: f32 = 12.0;
/// Distance between body baselines
pub const LEADING_MM: f32 = 6.0;
/// Distance between title baselines
pub const TITLE_LEADING_MM: f32 = 10.0;
/// Distance between heading baselines
pub const HEADING_LEADING_MM: f32 = 8.0;

/// Highest baseline inside the printable band
pub const TOP_BASELINE_MM: f32 = PAGE_HEIGHT_MM - TOP_MARGIN_MM;

/// Approximate characters per body line
pub const BODY_LINE_CHARS: usize = 85;
/// Approximate characters per title line
pub const TITLE_LINE_CHARS: usize = 32;
/// Approximate characters per heading line
pub const HEADING_LINE_CHARS: usize = 58;

/// Cover image width limit as a share of the page width
pub const IMAGE_MAX_WIDTH_RATIO: f32 = 0.8;
/// Cover image height limit as a share of the page height
pub const IMAGE_MAX_HEIGHT_RATIO: f32 = 0.7;

const MM_PER_PT: f32 = 25.4 / 72.0;
// Helvetica averages a little over half an em per glyph.
const AVERAGE_GLYPH_EM: f32 = 0.55;

/// Placeholder for a cover without image URL
pub const NO_IMAGE_TEXT: &str = "No image available";
/// Placeholder for a cover whose image could not be loaded
pub const IMAGE_UNAVAILABLE_TEXT: &str = "Image not available";
/// Placeholder for an empty summary
pub const NO_SUMMARY_TEXT: &str = "No summary available";
/// Placeholder for an empty body
pub const NO_CONTENT_TEXT: &str = "No content available";
/// Heading of the first content page
pub const CONTENT_HEADING: &str = "Book Content";

// ============================================================================
// Wrapping
// ============================================================================

/// Greedy word wrap
///
/// Paragraphs are separated by `\n`; blank paragraphs are skipped and
/// consecutive paragraphs are separated by one empty line. Words longer than
/// `max_chars` are split.
#[must_use]
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n').filter(|p| !p.trim().is_empty()) {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        wrap_paragraph(paragraph, max_chars, &mut lines);
    }

    lines
}

fn wrap_paragraph(paragraph: &str, max_chars: usize, lines: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_len = 0;

    for word in paragraph.split_whitespace() {
        let mut word_len = word.chars().count();

        if current_len > 0 && current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
            continue;
        }

        if current_len > 0 {
            lines.push(std::mem::take(&mut current));
        }

        let mut rest = word;
        while word_len > max_chars {
            let split = rest
                .char_indices()
                .nth(max_chars)
                .map_or(rest.len(), |(index, _)| index);
            let (head, tail) = rest.split_at(split);
            lines.push(head.to_string());
            rest = tail;
            word_len -= max_chars;
        }

        current.push_str(rest);
        current_len = word_len;
    }

    if current_len > 0 {
        lines.push(current);
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Where a line lands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePosition {
    /// Zero-based page within the flow
    pub page_index: usize,
    /// Baseline
    pub y_mm: f32,
}

/// Vertical position tracker for a flow of lines
///
/// The position always lies in `[BOTTOM_MARGIN_MM, TOP_BASELINE_MM]`. Moving
/// below the band breaks to the top of the next page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutCursor {
    vertical_position: f32,
    page_index: usize,
}

impl Default for LayoutCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutCursor {
    /// Cursor at the top of the first page
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertical_position: TOP_BASELINE_MM,
            page_index: 0,
        }
    }

    /// Current baseline
    #[must_use]
    pub const fn vertical_position(&self) -> f32 {
        self.vertical_position
    }

    /// Current page
    #[must_use]
    pub const fn page_index(&self) -> usize {
        self.page_index
    }

    /// Move down by `space`, breaking the page when leaving the band
    pub fn advance(&mut self, space: f32) {
        self.vertical_position -= space;
        if self.vertical_position < BOTTOM_MARGIN_MM {
            self.page_index += 1;
            self.vertical_position = TOP_BASELINE_MM;
        }
    }

    /// Claim the current baseline for one line, then advance by `leading`
    pub fn next_line(&mut self, leading: f32) -> LinePosition {
        let position = LinePosition {
            page_index: self.page_index,
            y_mm: self.vertical_position,
        };
        self.advance(leading);
        position
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Role of a text run; decides font and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    /// Cover title
    Title,
    /// Page heading
    Heading,
    /// Running text
    Body,
    /// Stand-in for missing image, summary or body
    Placeholder,
    /// Page number
    Footer,
}

impl TextRole {
    /// Font size in points
    #[must_use]
    pub const fn size_pt(self) -> f32 {
        match self {
            Self::Title => 24.0,
            Self::Heading => 16.0,
            Self::Body | Self::Placeholder => 11.0,
            Self::Footer => 9.0,
        }
    }

    /// Whether the bold font is used
    #[must_use]
    pub const fn is_bold(self) -> bool {
        matches!(self, Self::Title | Self::Heading)
    }
}

/// One drawable item
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Text run starting at `(x_mm, y_mm)` on its baseline
    Text {
        /// Font and size
        role: TextRole,
        /// Sanitised text
        text: String,
        /// Left edge
        x_mm: f32,
        /// Baseline
        y_mm: f32,
    },
    /// The cover image, bottom-left corner at `(x_mm, y_mm)`
    Image {
        /// Left edge
        x_mm: f32,
        /// Bottom edge
        y_mm: f32,
        /// Drawn width
        width_mm: f32,
        /// Drawn height
        height_mm: f32,
    },
}

/// Section a page belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Title and cover image
    Cover,
    /// Summary
    Summary,
    /// Running text
    Content,
}

/// Layout of one page
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    /// Section
    pub kind: PageKind,
    /// Items in drawing order
    pub elements: Vec<Element>,
}

impl PagePlan {
    const fn new(kind: PageKind) -> Self {
        Self {
            kind,
            elements: Vec::new(),
        }
    }

    fn text(&mut self, role: TextRole, text: impl Into<String>, x_mm: f32, y_mm: f32) {
        self.elements.push(Element::Text {
            role,
            text: text.into(),
            x_mm,
            y_mm,
        });
    }

    /// Text runs of one role, in drawing order
    pub fn texts(&self, wanted: TextRole) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(move |element| match element {
            Element::Text { role, text, .. } if *role == wanted => Some(text.as_str()),
            _ => None,
        })
    }

    /// Page number text
    #[must_use]
    pub fn footer(&self) -> Option<&str> {
        self.texts(TextRole::Footer).next()
    }

    /// Whether the page draws the cover image
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.elements
            .iter()
            .any(|element| matches!(element, Element::Image { .. }))
    }
}

/// Layout of a whole document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPlan {
    /// Pages in order: cover, summary, content
    pub pages: Vec<PagePlan>,
}

impl DocumentPlan {
    /// Total pages
    #[must_use]
    pub fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    /// Pages of one section
    pub fn pages_of(&self, kind: PageKind) -> impl Iterator<Item = &PagePlan> {
        self.pages.iter().filter(move |page| page.kind == kind)
    }

    /// Body lines of the content pages, concatenated in order
    #[must_use]
    pub fn content_lines(&self) -> Vec<&str> {
        self.pages_of(PageKind::Content)
            .flat_map(|page| page.texts(TextRole::Body))
            .collect()
    }
}

/// What the cover page shows under the title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverArt {
    /// No image URL was given
    Missing,
    /// The image could not be fetched or decoded
    Unavailable,
    /// A decoded image of this pixel size
    Image {
        /// Width in pixels
        width_px: u32,
        /// Height in pixels
        height_px: u32,
    },
}

/// Sanitised inputs of a layout
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    /// Book title
    pub title: &'a str,
    /// Summary text
    pub summary: &'a str,
    /// Full body
    pub body: &'a str,
    /// Cover image state
    pub cover: CoverArt,
}

/// Lay out cover, summary and content pages, then number every page
#[must_use]
pub fn plan_document(input: &PlanInput<'_>) -> DocumentPlan {
    let mut pages = vec![
        cover_page(input.title, input.cover),
        summary_page(input.title, input.summary),
    ];
    pages.extend(content_pages(input.body));

    for (index, page) in pages.iter_mut().enumerate() {
        let number = (index + 1).to_string();
        let x = centered_x(&number, TextRole::Footer);
        page.text(TextRole::Footer, number, x, FOOTER_BASELINE_MM);
    }

    DocumentPlan { pages }
}

fn cover_page(title: &str, cover: CoverArt) -> PagePlan {
    let mut page = PagePlan::new(PageKind::Cover);
    let mut y = TOP_BASELINE_MM - TITLE_LEADING_MM;

    for line in wrap(title, TITLE_LINE_CHARS) {
        if y < BOTTOM_MARGIN_MM {
            tracing::warn!("Title does not fit on the cover, lines clipped");
            break;
        }
        let x = centered_x(&line, TextRole::Title);
        page.text(TextRole::Title, line, x, y);
        y -= TITLE_LEADING_MM;
    }

    let top = y;
    let max_width = PAGE_WIDTH_MM * IMAGE_MAX_WIDTH_RATIO;
    let max_height = (PAGE_HEIGHT_MM * IMAGE_MAX_HEIGHT_RATIO).min(top - BOTTOM_MARGIN_MM);

    let placeholder = match cover {
        CoverArt::Image {
            width_px,
            height_px,
        } => match fit_image(width_px, height_px, max_width, max_height) {
            Some((width_mm, height_mm)) => {
                page.elements.push(Element::Image {
                    x_mm: (PAGE_WIDTH_MM - width_mm) / 2.0,
                    y_mm: top - height_mm,
                    width_mm,
                    height_mm,
                });
                None
            },
            None => Some(IMAGE_UNAVAILABLE_TEXT),
        },
        CoverArt::Unavailable => Some(IMAGE_UNAVAILABLE_TEXT),
        CoverArt::Missing => Some(NO_IMAGE_TEXT),
    };

    if let Some(text) = placeholder {
        let y = (top - LEADING_MM).max(BOTTOM_MARGIN_MM);
        let x = centered_x(text, TextRole::Placeholder);
        page.text(TextRole::Placeholder, text, x, y);
    }

    page
}

fn summary_page(title: &str, summary: &str) -> PagePlan {
    let mut page = PagePlan::new(PageKind::Summary);
    let mut y = TOP_BASELINE_MM;

    for line in wrap(&format!("{title} - Summary"), HEADING_LINE_CHARS) {
        page.text(TextRole::Heading, line, SIDE_MARGIN_MM, y);
        y -= HEADING_LEADING_MM;
    }
    y -= LEADING_MM;

    let lines = wrap(summary, BODY_LINE_CHARS);
    if lines.is_empty() {
        page.text(TextRole::Placeholder, NO_SUMMARY_TEXT, SIDE_MARGIN_MM, y);
        return page;
    }

    let mut clipped = 0usize;
    for line in lines {
        if y < BOTTOM_MARGIN_MM {
            clipped += 1;
            continue;
        }
        page.text(TextRole::Body, line, SIDE_MARGIN_MM, y);
        y -= LEADING_MM;
    }

    if clipped > 0 {
        tracing::warn!(clipped_lines = clipped, "Summary does not fit on one page, lines clipped");
    }

    page
}

fn content_pages(body: &str) -> Vec<PagePlan> {
    let mut pages = vec![PagePlan::new(PageKind::Content)];
    let mut cursor = LayoutCursor::new();

    let heading = cursor.next_line(HEADING_LEADING_MM);
    pages[0].text(TextRole::Heading, CONTENT_HEADING, SIDE_MARGIN_MM, heading.y_mm);
    cursor.advance(LEADING_MM);

    let lines = wrap(body, BODY_LINE_CHARS);
    let (role, lines) = if lines.is_empty() {
        (TextRole::Placeholder, vec![NO_CONTENT_TEXT.to_string()])
    } else {
        (TextRole::Body, lines)
    };

    for line in lines {
        let position = cursor.next_line(LEADING_MM);
        while pages.len() <= position.page_index {
            pages.push(PagePlan::new(PageKind::Content));
        }
        pages[position.page_index].text(role, line, SIDE_MARGIN_MM, position.y_mm);
    }

    pages
}

/// Estimated left edge that centres `text` on the page
#[must_use]
#[allow(clippy::cast_precision_loss)] // Character counts are small
pub fn centered_x(text: &str, role: TextRole) -> f32 {
    let width = text.chars().count() as f32 * role.size_pt() * MM_PER_PT * AVERAGE_GLYPH_EM;
    ((PAGE_WIDTH_MM - width) / 2.0).max(SIDE_MARGIN_MM)
}

/// Size that fits a `width_px` × `height_px` image into the given box,
/// keeping its aspect ratio
///
/// Returns `None` for degenerate images or boxes.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Pixel sizes are far below f32 precision limits
pub fn fit_image(width_px: u32, height_px: u32, max_width_mm: f32, max_height_mm: f32) -> Option<(f32, f32)> {
    if width_px == 0 || height_px == 0 || max_width_mm <= 0.0 || max_height_mm <= 0.0 {
        return None;
    }

    let aspect = height_px as f32 / width_px as f32;
    let mut width = max_width_mm;
    let mut height = width * aspect;
    if height > max_height_mm {
        height = max_height_mm;
        width = height / aspect;
    }

    Some((width, height))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn plan(title: &str, summary: &str, body: &str, cover: CoverArt) -> DocumentPlan {
        plan_document(&PlanInput {
            title,
            summary,
            body,
            cover,
        })
    }

    #[test]
    fn wrap_breaks_on_whitespace() {
        let lines = wrap("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn wrap_separates_paragraphs_and_skips_blank_ones() {
        let lines = wrap("first\n\n   \nsecond", 20);
        assert_eq!(lines, vec!["first", "", "second"]);
    }

    #[test]
    fn wrap_hard_splits_long_words() {
        let lines = wrap(&"a".repeat(25), 10);
        assert_eq!(lines, vec!["a".repeat(10), "a".repeat(10), "a".repeat(5)]);
    }

    #[test]
    fn wrap_of_nothing_is_empty() {
        assert!(wrap("", 10).is_empty());
        assert!(wrap(" \n\t\n", 10).is_empty());
    }

    #[test]
    fn cursor_breaks_before_leaving_the_band() {
        let mut cursor = LayoutCursor::new();
        let mut last = None;
        while cursor.page_index() == 0 {
            last = Some(cursor.next_line(LEADING_MM));
        }
        let last = last.unwrap();
        assert_eq!(last.page_index, 0);
        assert!(last.y_mm >= BOTTOM_MARGIN_MM);
        assert!((cursor.vertical_position() - TOP_BASELINE_MM).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_inputs_still_produce_three_numbered_pages() {
        let plan = plan("", "", "", CoverArt::Missing);

        assert_eq!(plan.page_count(), 3);
        let footers: Vec<_> = plan.pages.iter().map(|p| p.footer().unwrap()).collect();
        assert_eq!(footers, vec!["1", "2", "3"]);
        assert_eq!(plan.pages[0].texts(TextRole::Placeholder).next(), Some(NO_IMAGE_TEXT));
        assert_eq!(plan.pages[1].texts(TextRole::Placeholder).next(), Some(NO_SUMMARY_TEXT));
        assert_eq!(plan.pages[2].texts(TextRole::Placeholder).next(), Some(NO_CONTENT_TEXT));
    }

    #[test]
    fn long_body_spans_pages_and_last_footer_is_total() {
        let plan = plan("Tides", "", &"a".repeat(5000), CoverArt::Missing);

        assert!(plan.pages_of(PageKind::Content).count() > 1);
        let last = plan.pages.last().unwrap();
        assert_eq!(last.footer().unwrap(), plan.page_count().to_string());
    }

    #[test]
    fn unavailable_image_uses_placeholder() {
        let plan = plan("Tides", "s", "b", CoverArt::Unavailable);
        let cover = &plan.pages[0];
        assert!(!cover.has_image());
        assert_eq!(cover.texts(TextRole::Placeholder).next(), Some(IMAGE_UNAVAILABLE_TEXT));
    }

    #[test]
    fn cover_image_is_centred_within_limits() {
        let plan = plan(
            "Tides",
            "s",
            "b",
            CoverArt::Image {
                width_px: 1024,
                height_px: 1024,
            },
        );
        let image = plan.pages[0]
            .elements
            .iter()
            .find_map(|element| match element {
                Element::Image {
                    x_mm,
                    y_mm,
                    width_mm,
                    height_mm,
                } => Some((*x_mm, *y_mm, *width_mm, *height_mm)),
                Element::Text { .. } => None,
            })
            .unwrap();

        let (x, y, width, height) = image;
        assert!(width <= PAGE_WIDTH_MM * IMAGE_MAX_WIDTH_RATIO + 0.01);
        assert!(height <= PAGE_HEIGHT_MM * IMAGE_MAX_HEIGHT_RATIO + 0.01);
        assert!((x + width / 2.0 - PAGE_WIDTH_MM / 2.0).abs() < 0.01);
        assert!(y >= BOTTOM_MARGIN_MM);
    }

    #[test]
    fn oversized_summary_is_clipped_to_one_page() {
        let summary = "word ".repeat(2000);
        let plan = plan("Tides", &summary, "b", CoverArt::Missing);

        assert_eq!(plan.pages_of(PageKind::Summary).count(), 1);
        let summary_page = &plan.pages[1];
        assert!(summary_page.elements.iter().all(|element| match element {
            Element::Text { role: TextRole::Footer, .. } => true,
            Element::Text { y_mm, .. } => *y_mm >= BOTTOM_MARGIN_MM,
            Element::Image { .. } => false,
        }));
    }

    #[test]
    fn fit_image_keeps_aspect_ratio() {
        let (width, height) = fit_image(2000, 1000, 168.0, 200.0).unwrap();
        assert!((width - 168.0).abs() < 0.01);
        assert!((height - 84.0).abs() < 0.01);

        let (width, height) = fit_image(500, 2000, 168.0, 200.0).unwrap();
        assert!((height - 200.0).abs() < 0.01);
        assert!((width - 50.0).abs() < 0.01);

        assert!(fit_image(0, 10, 168.0, 200.0).is_none());
    }

    proptest! {
        #[test]
        fn wrapped_lines_respect_the_budget(text in "[a-z \\n]{0,400}", max in 1usize..40) {
            for line in wrap(&text, max) {
                prop_assert!(line.chars().count() <= max);
            }
        }

        #[test]
        fn content_pages_preserve_wrapped_lines(body in "[a-zA-Z .,\\n]{1,6000}") {
            let plan = plan("T", "S", &body, CoverArt::Missing);
            let expected = wrap(&body, BODY_LINE_CHARS);
            prop_assume!(!expected.is_empty());

            prop_assert_eq!(plan.content_lines(), expected.iter().map(String::as_str).collect::<Vec<_>>());
            prop_assert_eq!(
                plan.pages.last().unwrap().footer().unwrap(),
                plan.page_count().to_string()
            );
        }

        #[test]
        fn every_line_sits_inside_the_band(body in "[a-z \\n]{0,8000}") {
            let plan = plan("T", "S", &body, CoverArt::Missing);
            for page in &plan.pages {
                for element in &page.elements {
                    if let Element::Text { role, y_mm, .. } = element {
                        if *role != TextRole::Footer {
                            prop_assert!(*y_mm >= BOTTOM_MARGIN_MM && *y_mm <= TOP_BASELINE_MM);
                        }
                    }
                }
            }
        }
    }
}
