//! Closed set of book categories and normalisation of model answers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Genre assigned to a published book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Fiction, the fallback for anything unrecognised
    #[default]
    Novel,
    /// Poems and verse
    Poetry,
    /// Essays
    Essay,
    /// Self-improvement
    SelfHelp,
    /// History
    History,
    /// Science
    Science,
    /// Economics
    Economics,
    /// Philosophy
    Philosophy,
}

impl Category {
    /// Every category, in prompt order
    pub const ALL: [Self; 8] = [
        Self::Novel,
        Self::Poetry,
        Self::Essay,
        Self::SelfHelp,
        Self::History,
        Self::Science,
        Self::Economics,
        Self::Philosophy,
    ];

    /// Canonical label, as sent in prompts and events
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Novel => "novel",
            Self::Poetry => "poetry",
            Self::Essay => "essay",
            Self::SelfHelp => "self-help",
            Self::History => "history",
            Self::Science => "science",
            Self::Economics => "economics",
            Self::Philosophy => "philosophy",
        }
    }

    const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Novel => &["novel", "novels", "fiction", "소설"],
            Self::Poetry => &["poetry", "poem", "poems", "시"],
            Self::Essay => &["essay", "essays", "에세이"],
            Self::SelfHelp => &["self-help", "self help", "selfhelp", "자기계발"],
            Self::History => &["history", "역사"],
            Self::Science => &["science", "과학"],
            Self::Economics => &["economics", "economy", "경제"],
            Self::Philosophy => &["philosophy", "철학"],
        }
    }

    /// Exact, case-insensitive match against labels and aliases
    #[must_use]
    pub fn parse_label(candidate: &str) -> Option<Self> {
        let candidate = candidate.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.aliases().contains(&candidate.as_str()))
    }

    /// Map a free-form model answer onto the closed set
    ///
    /// Takes the first non-empty line and strips surrounding punctuation,
    /// then matches the whole line or its first word. If neither matches, the
    /// text before and after a `:` are tried in turn, so both `Poetry: verse`
    /// and `Category: Poetry` resolve. Anything else is [`Category::Novel`].
    #[must_use]
    pub fn from_response(raw: &str) -> Self {
        let Some(line) = raw.lines().map(str::trim).find(|line| !line.is_empty()) else {
            return Self::default();
        };

        Self::match_fragment(line)
            .or_else(|| {
                line.split_once(':').and_then(|(head, rest)| {
                    Self::match_fragment(head).or_else(|| Self::match_fragment(rest))
                })
            })
            .unwrap_or_default()
    }

    fn match_fragment(text: &str) -> Option<Self> {
        let text = strip_decoration(text);
        Self::parse_label(text).or_else(|| {
            text.split_whitespace()
                .next()
                .map(strip_decoration)
                .and_then(Self::parse_label)
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn strip_decoration(text: &str) -> &str {
    text.trim_matches(|c: char| {
        c.is_whitespace()
            || c.is_ascii_punctuation()
            || matches!(c, '“' | '”' | '‘' | '’' | '「' | '」' | '『' | '』' | '·')
    })
}
