/*!
 * Character name canonicalization.
 *
 * Screenplays annotate character cues in several ways: an age in parentheses
 * (`田中(25)`, `田中（２５歳）`), a delivery note (`田中（声）`, `JOHN (V.O.)`),
 * or stray spacing. A canonical key keeps the age, since the same person at
 * different ages is cast separately, and drops everything else.
 */

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use super::model::fold_digits;

/// Any parenthetical annotation, ASCII or full-width
static PARENTHETICAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[(（]([^()（）]*)[)）]").expect("Invalid parenthetical regex")
});

/// An age annotation: digits, optionally followed by 歳 or 才
static AGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,3})\s*(?:歳|才)?\s*$").expect("Invalid age regex")
});

/// Canonical identity of a character
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharacterKey {
    /// Name without annotations
    pub base: String,

    /// Age annotation, if one was given
    pub age: Option<u32>,
}

impl CharacterKey {
    /// Build a key from a base name and optional age
    pub fn new(base: impl Into<String>, age: Option<u32>) -> Self {
        Self {
            base: base.into(),
            age,
        }
    }

    /// Parse a raw character cue into its canonical key.
    ///
    /// Returns `None` when nothing is left of the name once annotations are removed.
    pub fn parse(raw: &str) -> Option<Self> {
        let folded = fold_digits(raw);

        let mut age = None;
        for captures in PARENTHETICAL_PATTERN.captures_iter(&folded) {
            let inner = captures.get(1).map(|m| m.as_str()).unwrap_or("");
            if age.is_none() {
                age = AGE_PATTERN
                    .captures(inner)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse::<u32>().ok());
            }
        }

        let stripped = PARENTHETICAL_PATTERN.replace_all(&folded, " ");
        let base = collapse_whitespace(&stripped);
        if base.is_empty() {
            return None;
        }

        Some(Self { base, age })
    }

    /// Whether two raw cues name the same identity
    pub fn same_identity(a: &str, b: &str) -> bool {
        match (Self::parse(a), Self::parse(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }
}

impl fmt::Display for CharacterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.age {
            Some(age) => write!(f, "{}({})", self.base, age),
            None => f.write_str(&self.base),
        }
    }
}

/// Trim and collapse runs of whitespace, including full-width spaces
fn collapse_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{3000}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
