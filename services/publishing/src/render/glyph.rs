//! Glyph substitution for the built-in PDF fonts.
//!
//! Helvetica and Helvetica-Bold are WinAnsi fonts. Every string drawn in a
//! document goes through [`GlyphPolicy::sanitize`] before it is measured or
//! wrapped:
//!
//! - printable ASCII (`' '..='~'`) is kept
//! - `\t` becomes a space, `\n` is kept as the paragraph separator
//! - other control characters are dropped
//! - everything else becomes the replacement character

/// Replacement used when none is configured
pub const DEFAULT_REPLACEMENT: char = '?';

/// Substitution policy for characters the built-in fonts cannot draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphPolicy {
    replacement: char,
}

impl Default for GlyphPolicy {
    fn default() -> Self {
        Self {
            replacement: DEFAULT_REPLACEMENT,
        }
    }
}

impl GlyphPolicy {
    /// Policy substituting `replacement`
    ///
    /// A replacement that is not itself printable ASCII falls back to
    /// [`DEFAULT_REPLACEMENT`].
    #[must_use]
    pub const fn new(replacement: char) -> Self {
        let replacement = if is_printable_ascii(replacement) {
            replacement
        } else {
            DEFAULT_REPLACEMENT
        };
        Self { replacement }
    }

    /// Character substituted for unsupported glyphs
    #[must_use]
    pub const fn replacement(&self) -> char {
        self.replacement
    }

    /// Apply the policy to `text`
    #[must_use]
    pub fn sanitize(&self, text: &str) -> String {
        text.chars()
            .filter_map(|c| match c {
                '\n' => Some('\n'),
                '\t' => Some(' '),
                c if is_printable_ascii(c) => Some(c),
                c if c.is_control() => None,
                _ => Some(self.replacement),
            })
            .collect()
    }
}

const fn is_printable_ascii(c: char) -> bool {
    matches!(c, ' '..='~')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ascii_passes_through() {
        let policy = GlyphPolicy::default();
        assert_eq!(policy.sanitize("Hello, World! 42"), "Hello, World! 42");
    }

    #[test]
    fn non_latin_scripts_are_replaced() {
        let policy = GlyphPolicy::default();
        assert_eq!(policy.sanitize("책 title"), "? title");
        assert_eq!(policy.sanitize("café"), "caf?");
    }

    #[test]
    fn controls_are_dropped_and_tabs_become_spaces() {
        let policy = GlyphPolicy::default();
        assert_eq!(policy.sanitize("a\tb\u{7}c\r\nd"), "a bc\nd");
    }

    #[test]
    fn replacement_is_configurable_but_must_be_drawable() {
        assert_eq!(GlyphPolicy::new('*').sanitize("東京"), "**");
        assert_eq!(GlyphPolicy::new('■').replacement(), DEFAULT_REPLACEMENT);
    }

    proptest! {
        #[test]
        fn output_is_always_drawable(text in any::<String>()) {
            let sanitized = GlyphPolicy::default().sanitize(&text);
            prop_assert!(sanitized.chars().all(|c| c == '\n' || is_printable_ascii(c)));
        }

        #[test]
        fn sanitize_is_idempotent(text in any::<String>()) {
            let policy = GlyphPolicy::default();
            let once = policy.sanitize(&text);
            prop_assert_eq!(policy.sanitize(&once), once);
        }
    }
}
